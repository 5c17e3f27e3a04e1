//! HTTP request handlers.

pub mod billing;
pub mod credits;
pub mod health;
pub mod images;
pub mod webhooks;
