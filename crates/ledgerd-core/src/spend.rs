//! Spend (debit) records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{GrantId, Owner, SpendId};

/// A debit against one specific grant.
///
/// One logical charge of cost `C` may produce several spend rows when the
/// allocation is split across grants; the rows share a `spend_ref` so they
/// can be grouped and refunded together. Spends are immutable and never
/// deleted; refunds are new grants, not spend deletions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Spend {
    /// Unique spend ID (ULID for time-ordering).
    pub id: SpendId,

    /// The user or organization charged.
    pub owner: Owner,

    /// The grant this debit was allocated against.
    pub grant_id: GrantId,

    /// Positive quantity debited, at most the grant's remaining amount at
    /// debit time.
    pub amount: i64,

    /// Free-form annotation (e.g. "image_edit").
    pub reason: Option<String>,

    /// Correlates the spend rows of one logical charge; reused by the
    /// refund path.
    pub spend_ref: Option<String>,

    /// Additional metadata.
    pub metadata: serde_json::Value,

    /// When the spend was created.
    pub created_at: DateTime<Utc>,
}
