//! Database schema definitions and column families.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Credit grants, keyed by `grant_id` (ULID).
    pub const GRANTS: &str = "grants";

    /// Index: grants by owner, keyed by `owner_key || grant_id`.
    /// Value is empty (index only). ULID suffixes keep entries time-ordered.
    pub const GRANTS_BY_OWNER: &str = "grants_by_owner";

    /// Index: grants by idempotency key, keyed by
    /// `owner_key || source_ref`. Value is the grant id. This backs the
    /// at-most-one-grant-per-(owner, source_ref) invariant.
    pub const GRANTS_BY_SOURCE_REF: &str = "grants_by_source_ref";

    /// Spend records, keyed by `spend_id` (ULID).
    pub const SPENDS: &str = "spends";

    /// Index: spends by owner, keyed by `owner_key || spend_id`.
    pub const SPENDS_BY_OWNER: &str = "spends_by_owner";

    /// Current subscription record per owner, keyed by `owner_key`.
    pub const SUBSCRIPTIONS: &str = "subscriptions";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        cf::GRANTS,
        cf::GRANTS_BY_OWNER,
        cf::GRANTS_BY_SOURCE_REF,
        cf::SPENDS,
        cf::SPENDS_BY_OWNER,
        cf::SUBSCRIPTIONS,
    ]
}
