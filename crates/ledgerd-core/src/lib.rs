//! Core types for the ledgerd credit ledger.
//!
//! This crate defines the domain model shared by the storage and service
//! layers:
//!
//! - Strongly-typed identifiers ([`UserId`], [`OrganizationId`], [`GrantId`],
//!   [`SpendId`]).
//! - The [`Owner`] of a ledger entity (exactly one of user or organization).
//! - [`Grant`] (a credit lot with its own expiry and remaining balance) and
//!   [`Spend`] (an immutable debit record against one grant).
//! - The pure grant-ordering policy in [`policy`] that decides which grants
//!   a spend draws from.
//! - UTC calendar helpers in [`calendar`] used to derive idempotency keys.
//! - The plan and model catalogs in [`plan`] and [`pricing`].
//!
//! Nothing in this crate performs I/O.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod calendar;
pub mod grant;
pub mod ids;
pub mod owner;
pub mod plan;
pub mod policy;
pub mod pricing;
pub mod spend;

pub use grant::{Grant, GrantType, NewGrant};
pub use ids::{GrantId, IdError, OrganizationId, SpendId, UserId};
pub use owner::{InvalidOwnerError, Owner};
pub use plan::{PlanCatalog, PlanCredits, PlanId, PlanInterval, Subscription};
pub use policy::{
    plan_spend, sort_grants_for_spend, total_available, PlanLine, PolicyError, SpendPlan,
};
pub use pricing::{ModelPricing, PricingConfig};
pub use spend::Spend;
