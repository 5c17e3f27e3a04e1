//! Ledgerd HTTP API service.
//!
//! This crate provides the HTTP API for the credit ledger, including:
//!
//! - Billing summary and balance reads (with lazy grant issuance)
//! - Grant and spend history
//! - Credit-charged image edits with compensating refunds
//! - Payment provider webhooks
//!
//! # Authentication
//!
//! The service supports two authentication methods:
//!
//! 1. **Bearer tokens** - For end-user requests; an optional
//!    `x-organization-id` header switches the acting owner to an
//!    organization.
//! 2. **Service API keys** - For service-to-service requests (payment
//!    webhook relay, admin credit adjustments).

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // Some handlers need async for consistency

pub mod auth;
pub mod charge;
pub mod config;
pub mod error;
pub mod generator;
pub mod handlers;
pub mod issuance;
pub mod routes;
pub mod state;

pub use config::ServiceConfig;
pub use error::ApiError;
pub use generator::{GeneratedImage, GeneratorError, HttpImageGenerator, ImageGenerator};
pub use routes::create_router;
pub use state::AppState;
