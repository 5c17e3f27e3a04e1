//! Credit grant types.
//!
//! A grant is a lot of credit issued to an owner. Its `remaining_amount` is
//! only ever decremented by spends or zeroed by invalidation; grants are
//! never deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{GrantId, Owner};

/// The kind of a credit grant.
///
/// The ordering policy prefers exhausting short-lived, renewable credit
/// before durable purchased credit; see [`GrantType::priority`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GrantType {
    /// Daily free allowance, expires at the end of its UTC day.
    DailyFree,

    /// Subscription-cycle grant, expires at the end of the cycle.
    Subscription,

    /// Promotional bonus with a caller-supplied expiry.
    Promotional,

    /// One-time purchased credits, never expire.
    Purchased,
}

impl GrantType {
    /// Spend priority used to break ties between grants with identical
    /// expiry: higher values are drawn from first.
    ///
    /// Kept as an explicit fixed table so the ordering is auditable.
    #[must_use]
    pub const fn priority(&self) -> u8 {
        match self {
            Self::DailyFree => 4,
            Self::Subscription => 3,
            Self::Promotional => 2,
            Self::Purchased => 1,
        }
    }
}

/// A credit grant (lot) issued to an owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grant {
    /// Unique grant ID (ULID for time-ordering).
    pub id: GrantId,

    /// The user or organization this grant belongs to.
    pub owner: Owner,

    /// Original quantity issued. Always positive; never edited.
    pub amount: i64,

    /// Quantity left, `0 <= remaining_amount <= amount`. Decremented by
    /// spends, zeroed by invalidation, never increased.
    pub remaining_amount: i64,

    /// The kind of grant.
    pub grant_type: GrantType,

    /// When the grant expires; `None` means it never expires.
    pub expires_at: Option<DateTime<Utc>>,

    /// Stable dedup key for idempotent issuance. At most one grant per
    /// (owner, `source_ref`) pair.
    pub source_ref: Option<String>,

    /// Free-form annotation; not used in allocation decisions.
    pub reason: Option<String>,

    /// Additional metadata (plan, model, original spend reference, ...).
    pub metadata: serde_json::Value,

    /// When the grant was created.
    pub created_at: DateTime<Utc>,

    /// When the grant was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Grant {
    /// Whether this grant can still be spent from at `now`: positive
    /// remaining amount and not yet expired.
    #[must_use]
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.remaining_amount > 0 && self.expires_at.map_or(true, |expires| expires > now)
    }
}

/// Parameters for creating a new grant.
///
/// The store assigns the id and timestamps and sets
/// `remaining_amount = amount`.
#[derive(Debug, Clone)]
pub struct NewGrant {
    /// Quantity to issue; must be a positive integer.
    pub amount: i64,

    /// The kind of grant.
    pub grant_type: GrantType,

    /// Optional expiry.
    pub expires_at: Option<DateTime<Utc>>,

    /// Optional idempotency key.
    pub source_ref: Option<String>,

    /// Optional annotation.
    pub reason: Option<String>,

    /// Additional metadata.
    pub metadata: serde_json::Value,
}

impl NewGrant {
    /// A new grant of the given type with no expiry, source ref, reason or
    /// metadata.
    #[must_use]
    pub const fn new(amount: i64, grant_type: GrantType) -> Self {
        Self {
            amount,
            grant_type,
            expires_at: None,
            source_ref: None,
            reason: None,
            metadata: serde_json::Value::Null,
        }
    }

    /// Set the expiry.
    #[must_use]
    pub const fn expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Set the idempotency key.
    #[must_use]
    pub fn source_ref(mut self, source_ref: impl Into<String>) -> Self {
        self.source_ref = Some(source_ref.into());
        self
    }

    /// Set the annotation.
    #[must_use]
    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Set the metadata.
    #[must_use]
    pub fn metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}
