//! `RocksDB` storage layer for the ledgerd credit ledger.
//!
//! This crate provides persistent storage for credit grants, spend records
//! and subscription records, plus the idempotent grant issuers built on top
//! of it.
//!
//! # Architecture
//!
//! The storage uses the following column families:
//!
//! - `grants`: credit grants, keyed by `grant_id` (ULID)
//! - `grants_by_owner`: index for listing an owner's grants
//! - `grants_by_source_ref`: index backing idempotent issuance
//! - `spends`: spend records, keyed by `spend_id` (ULID)
//! - `spends_by_owner`: index for listing an owner's spends
//! - `subscriptions`: current subscription record per owner
//!
//! All read-modify-write operations (`spend`, `ensure_grant`,
//! `invalidate_grants_by_source_prefix`) serialize through an internal write
//! lock and commit through a single atomic write batch, so two concurrent
//! spends can never both observe the same headroom, and no partial mutation
//! survives a failure.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod issuers;
pub mod keys;
pub mod rocks;
pub mod schema;

pub use error::{Result, StoreError};
pub use rocks::RocksStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ledgerd_core::{Grant, GrantId, GrantType, NewGrant, Owner, Spend, Subscription};

/// Balance split by grant type, plus the next upcoming expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceBreakdown {
    /// Total usable balance.
    pub total: i64,
    /// Remaining daily free credits.
    pub daily_free: i64,
    /// Remaining subscription-cycle credits.
    pub subscription: i64,
    /// Remaining promotional credits.
    pub promotional: i64,
    /// Remaining purchased credits.
    pub purchased: i64,
    /// Earliest upcoming expiry among usable grants with one.
    pub next_expiry: Option<DateTime<Utc>>,
}

/// One line of a committed spend: how much was taken from which grant.
///
/// Carries the source grant's type and expiry so a compensating refund can
/// re-issue credit on the same terms.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpendAllocation {
    /// The grant debited.
    pub grant_id: GrantId,
    /// Amount taken from it.
    pub amount: i64,
    /// The grant's type.
    pub grant_type: GrantType,
    /// The grant's expiry.
    pub expires_at: Option<DateTime<Utc>>,
}

/// The result of a committed spend.
#[derive(Debug, Clone)]
pub struct SpendReceipt {
    /// The total cost debited.
    pub cost: i64,
    /// The allocation lines, in deduction order.
    pub allocations: Vec<SpendAllocation>,
}

/// Parameters of a spend call.
#[derive(Debug, Clone)]
pub struct SpendRequest {
    /// Credits to debit; must be a positive integer.
    pub cost: i64,
    /// Annotation recorded on every spend row.
    pub reason: Option<String>,
    /// Correlates the rows of this logical charge.
    pub spend_ref: Option<String>,
    /// Metadata recorded on every spend row.
    pub metadata: serde_json::Value,
}

impl SpendRequest {
    /// A spend of `cost` with no annotation.
    #[must_use]
    pub const fn new(cost: i64) -> Self {
        Self {
            cost,
            reason: None,
            spend_ref: None,
            metadata: serde_json::Value::Null,
        }
    }

    /// Set the reason.
    #[must_use]
    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Set the spend reference.
    #[must_use]
    pub fn spend_ref(mut self, spend_ref: impl Into<String>) -> Self {
        self.spend_ref = Some(spend_ref.into());
        self
    }

    /// Set the metadata.
    #[must_use]
    pub fn metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Outcome of an idempotent `ensure_grant` call.
#[derive(Debug, Clone)]
pub struct EnsureOutcome {
    /// The grant for the idempotency key (existing or newly created).
    pub grant: Grant,
    /// Whether this call created it.
    pub is_new: bool,
}

/// Result of zeroing grants by source-ref prefix.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct InvalidationResult {
    /// Number of grants zeroed.
    pub invalidated_count: usize,
    /// Total remaining amount forfeited.
    pub invalidated_amount: i64,
}

/// A spend joined with its grant's type, for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpendHistoryEntry {
    /// The spend record.
    pub spend: Spend,
    /// The type of the grant it debited.
    pub grant_type: GrantType,
}

/// Spend histogram bucket for one UTC calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyUsage {
    /// `YYYY-MM-DD` day key.
    pub date: String,
    /// Credits spent that day.
    pub amount: i64,
}

/// Days-bounded usage aggregation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageSummary {
    /// Total credits spent in the window.
    pub total_spent: i64,
    /// Total credits granted in the window.
    pub total_granted: i64,
    /// Per-day spend histogram, ascending by date.
    pub daily_usage: Vec<DailyUsage>,
    /// Window start.
    pub period_start: DateTime<Utc>,
    /// Window end.
    pub period_end: DateTime<Utc>,
    /// Window length in days.
    pub days: u32,
}

/// The storage trait defining all ledger database operations.
///
/// This trait abstracts the storage layer, allowing for different
/// implementations (e.g. `RocksDB`, in-memory for testing).
pub trait Store: Send + Sync {
    // =========================================================================
    // Grant Operations
    // =========================================================================

    /// Get a grant by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_grant(&self, grant_id: &GrantId) -> Result<Option<Grant>>;

    /// Load the owner's usable grants: non-expired with positive remaining
    /// amount, in creation order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn usable_grants(&self, owner: &Owner, now: DateTime<Utc>) -> Result<Vec<Grant>>;

    /// Insert a new grant with `remaining_amount = amount`.
    ///
    /// Does not deduplicate on `source_ref`; callers needing idempotency use
    /// [`Store::ensure_grant`] or the issuers.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidAmount`] if the amount is not positive.
    fn create_grant(&self, owner: &Owner, new_grant: NewGrant) -> Result<Grant>;

    /// Look up a grant by its idempotency key.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn find_grant_by_source_ref(&self, owner: &Owner, source_ref: &str) -> Result<Option<Grant>>;

    /// Atomic check-then-insert: return the existing grant for
    /// `(owner, source_ref)` or create one from `new_grant`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidAmount`] if a creation would be needed
    /// with a non-positive amount.
    fn ensure_grant(
        &self,
        owner: &Owner,
        source_ref: &str,
        new_grant: NewGrant,
    ) -> Result<EnsureOutcome>;

    /// Zero the remaining amount of all usable grants whose `source_ref`
    /// starts with `prefix`. Rows are kept for audit.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn invalidate_grants_by_source_prefix(
        &self,
        owner: &Owner,
        prefix: &str,
    ) -> Result<InvalidationResult>;

    // =========================================================================
    // Balance Operations
    // =========================================================================

    /// Sum of remaining amounts over the owner's usable grants.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn balance(&self, owner: &Owner) -> Result<i64>;

    /// Balance split by grant type plus the next upcoming expiry.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn balance_breakdown(&self, owner: &Owner) -> Result<BalanceBreakdown>;

    // =========================================================================
    // Spend Operations
    // =========================================================================

    /// Deduct `request.cost` from the owner's usable grants following the
    /// ordering policy, recording one spend row per allocation. Atomic: on
    /// any error nothing is written.
    ///
    /// # Errors
    ///
    /// - [`StoreError::InvalidCost`] if the cost is not positive.
    /// - [`StoreError::InsufficientCredits`] if the usable grants cannot
    ///   cover the cost in full.
    fn spend(&self, owner: &Owner, request: SpendRequest) -> Result<SpendReceipt>;

    // =========================================================================
    // History & Reporting
    // =========================================================================

    /// Page of the owner's grants, newest first, plus the total count.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_grants(&self, owner: &Owner, limit: usize, offset: usize)
        -> Result<(Vec<Grant>, usize)>;

    /// Page of the owner's spends joined with their grant types, newest
    /// first, plus the total count.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_spends(
        &self,
        owner: &Owner,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<SpendHistoryEntry>, usize)>;

    /// Aggregate spend/grant totals and a per-day spend histogram over the
    /// trailing `days`-day window ending at `now`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn usage_summary(&self, owner: &Owner, days: u32, now: DateTime<Utc>) -> Result<UsageSummary>;

    // =========================================================================
    // Subscription Records
    // =========================================================================

    /// Insert or replace the owner's subscription record.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_subscription(&self, subscription: &Subscription) -> Result<()>;

    /// Get the owner's subscription record, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_subscription(&self, owner: &Owner) -> Result<Option<Subscription>>;

    /// Delete the owner's subscription record.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if no record exists.
    fn delete_subscription(&self, owner: &Owner) -> Result<()>;
}
