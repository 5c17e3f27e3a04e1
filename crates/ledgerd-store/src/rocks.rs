//! `RocksDB` storage implementation.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, IteratorMode, MultiThreaded,
    Options, WriteBatch,
};

use ledgerd_core::{
    calendar, plan_spend, Grant, GrantId, GrantType, NewGrant, Owner, Spend, SpendId, Subscription,
};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf};
use crate::{
    BalanceBreakdown, DailyUsage, EnsureOutcome, InvalidationResult, SpendAllocation,
    SpendHistoryEntry, SpendReceipt, SpendRequest, Store, UsageSummary,
};

/// RocksDB-backed storage implementation.
///
/// Read-modify-write operations take `write_lock` for their whole duration,
/// which serializes them the way a serializable transaction would; the final
/// `WriteBatch` makes each of them atomic.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
    write_lock: Mutex<()>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Mutex::new(()),
        })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn lock_writes(&self) -> Result<MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| StoreError::Database("write lock poisoned".into()))
    }

    /// All grant IDs for an owner, in creation (ULID) order.
    fn owner_grant_ids(&self, owner: &Owner) -> Result<Vec<GrantId>> {
        let cf_by_owner = self.cf(cf::GRANTS_BY_OWNER)?;
        let prefix = keys::owner_key(owner);

        let iter = self.db.iterator_cf(
            &cf_by_owner,
            IteratorMode::From(&prefix, rocksdb::Direction::Forward),
        );

        let mut ids = Vec::new();
        for item in iter {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            if !key.starts_with(&prefix) {
                break;
            }
            ids.push(keys::extract_grant_id_from_owner_key(&key));
        }
        Ok(ids)
    }

    /// All spend IDs for an owner, in creation (ULID) order.
    fn owner_spend_ids(&self, owner: &Owner) -> Result<Vec<SpendId>> {
        let cf_by_owner = self.cf(cf::SPENDS_BY_OWNER)?;
        let prefix = keys::owner_key(owner);

        let iter = self.db.iterator_cf(
            &cf_by_owner,
            IteratorMode::From(&prefix, rocksdb::Direction::Forward),
        );

        let mut ids = Vec::new();
        for item in iter {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            if !key.starts_with(&prefix) {
                break;
            }
            ids.push(keys::extract_spend_id_from_owner_key(&key));
        }
        Ok(ids)
    }

    /// All of an owner's grants, in creation order.
    fn owner_grants(&self, owner: &Owner) -> Result<Vec<Grant>> {
        let mut grants = Vec::new();
        for id in self.owner_grant_ids(owner)? {
            if let Some(grant) = self.get_grant(&id)? {
                grants.push(grant);
            }
        }
        Ok(grants)
    }

    fn get_spend(&self, spend_id: &SpendId) -> Result<Option<Spend>> {
        let cf_spends = self.cf(cf::SPENDS)?;
        self.db
            .get_cf(&cf_spends, keys::spend_key(spend_id))
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    /// Build a grant row and stage it (plus its indexes) into `batch`.
    fn stage_grant(&self, batch: &mut WriteBatch, grant: &Grant) -> Result<()> {
        let cf_grants = self.cf(cf::GRANTS)?;
        let cf_by_owner = self.cf(cf::GRANTS_BY_OWNER)?;

        let value = Self::serialize(grant)?;
        batch.put_cf(&cf_grants, keys::grant_key(&grant.id), &value);
        batch.put_cf(&cf_by_owner, keys::owner_grant_key(&grant.owner, &grant.id), []);

        if let Some(source_ref) = &grant.source_ref {
            let cf_by_ref = self.cf(cf::GRANTS_BY_SOURCE_REF)?;
            batch.put_cf(
                &cf_by_ref,
                keys::owner_source_ref_key(&grant.owner, source_ref),
                grant.id.to_bytes(),
            );
        }

        Ok(())
    }

    fn build_grant(owner: &Owner, new_grant: NewGrant, now: DateTime<Utc>) -> Result<Grant> {
        if new_grant.amount <= 0 {
            return Err(StoreError::InvalidAmount {
                amount: new_grant.amount,
            });
        }

        Ok(Grant {
            id: GrantId::generate(),
            owner: *owner,
            amount: new_grant.amount,
            remaining_amount: new_grant.amount,
            grant_type: new_grant.grant_type,
            expires_at: new_grant.expires_at,
            source_ref: new_grant.source_ref,
            reason: new_grant.reason,
            metadata: new_grant.metadata,
            created_at: now,
            updated_at: now,
        })
    }
}

impl Store for RocksStore {
    // =========================================================================
    // Grant Operations
    // =========================================================================

    fn get_grant(&self, grant_id: &GrantId) -> Result<Option<Grant>> {
        let cf_grants = self.cf(cf::GRANTS)?;
        self.db
            .get_cf(&cf_grants, keys::grant_key(grant_id))
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn usable_grants(&self, owner: &Owner, now: DateTime<Utc>) -> Result<Vec<Grant>> {
        Ok(self
            .owner_grants(owner)?
            .into_iter()
            .filter(|grant| grant.is_usable(now))
            .collect())
    }

    fn create_grant(&self, owner: &Owner, new_grant: NewGrant) -> Result<Grant> {
        let grant = Self::build_grant(owner, new_grant, Utc::now())?;

        let mut batch = WriteBatch::default();
        self.stage_grant(&mut batch, &grant)?;
        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        tracing::debug!(
            owner = %owner,
            grant_id = %grant.id,
            amount = %grant.amount,
            grant_type = ?grant.grant_type,
            "Grant created"
        );

        Ok(grant)
    }

    fn find_grant_by_source_ref(&self, owner: &Owner, source_ref: &str) -> Result<Option<Grant>> {
        let cf_by_ref = self.cf(cf::GRANTS_BY_SOURCE_REF)?;
        let key = keys::owner_source_ref_key(owner, source_ref);

        let Some(id_bytes) = self
            .db
            .get_cf(&cf_by_ref, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
        else {
            return Ok(None);
        };

        let mut bytes = [0u8; 16];
        if id_bytes.len() != 16 {
            return Err(StoreError::Database(
                "corrupt grants_by_source_ref entry".into(),
            ));
        }
        bytes.copy_from_slice(&id_bytes);
        let grant_id =
            GrantId::from_bytes(bytes).map_err(|e| StoreError::Database(e.to_string()))?;

        self.get_grant(&grant_id)
    }

    fn ensure_grant(
        &self,
        owner: &Owner,
        source_ref: &str,
        new_grant: NewGrant,
    ) -> Result<EnsureOutcome> {
        // Check-then-insert must be atomic under concurrent issuance.
        let _guard = self.lock_writes()?;

        if let Some(existing) = self.find_grant_by_source_ref(owner, source_ref)? {
            return Ok(EnsureOutcome {
                grant: existing,
                is_new: false,
            });
        }

        let grant = Self::build_grant(
            owner,
            NewGrant {
                source_ref: Some(source_ref.to_string()),
                ..new_grant
            },
            Utc::now(),
        )?;

        let mut batch = WriteBatch::default();
        self.stage_grant(&mut batch, &grant)?;
        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        tracing::debug!(
            owner = %owner,
            grant_id = %grant.id,
            source_ref = %source_ref,
            amount = %grant.amount,
            "Idempotent grant issued"
        );

        Ok(EnsureOutcome {
            grant,
            is_new: true,
        })
    }

    fn invalidate_grants_by_source_prefix(
        &self,
        owner: &Owner,
        prefix: &str,
    ) -> Result<InvalidationResult> {
        let _guard = self.lock_writes()?;
        let now = Utc::now();

        let cf_grants = self.cf(cf::GRANTS)?;
        let mut batch = WriteBatch::default();
        let mut result = InvalidationResult::default();

        for mut grant in self.owner_grants(owner)? {
            let matches = grant
                .source_ref
                .as_deref()
                .is_some_and(|source_ref| source_ref.starts_with(prefix));
            if !matches || !grant.is_usable(now) {
                continue;
            }

            result.invalidated_count += 1;
            result.invalidated_amount += grant.remaining_amount;

            grant.remaining_amount = 0;
            grant.updated_at = now;
            batch.put_cf(&cf_grants, keys::grant_key(&grant.id), Self::serialize(&grant)?);
        }

        if result.invalidated_count > 0 {
            self.db
                .write(batch)
                .map_err(|e| StoreError::Database(e.to_string()))?;

            tracing::info!(
                owner = %owner,
                prefix = %prefix,
                invalidated_count = %result.invalidated_count,
                invalidated_amount = %result.invalidated_amount,
                "Grants invalidated"
            );
        }

        Ok(result)
    }

    // =========================================================================
    // Balance Operations
    // =========================================================================

    fn balance(&self, owner: &Owner) -> Result<i64> {
        let now = Utc::now();
        Ok(self
            .usable_grants(owner, now)?
            .iter()
            .map(|grant| grant.remaining_amount)
            .sum())
    }

    fn balance_breakdown(&self, owner: &Owner) -> Result<BalanceBreakdown> {
        let now = Utc::now();
        let mut breakdown = BalanceBreakdown {
            total: 0,
            daily_free: 0,
            subscription: 0,
            promotional: 0,
            purchased: 0,
            next_expiry: None,
        };

        for grant in self.usable_grants(owner, now)? {
            breakdown.total += grant.remaining_amount;
            match grant.grant_type {
                GrantType::DailyFree => breakdown.daily_free += grant.remaining_amount,
                GrantType::Subscription => breakdown.subscription += grant.remaining_amount,
                GrantType::Promotional => breakdown.promotional += grant.remaining_amount,
                GrantType::Purchased => breakdown.purchased += grant.remaining_amount,
            }

            if let Some(expires_at) = grant.expires_at {
                let sooner = breakdown.next_expiry.map_or(true, |next| expires_at < next);
                if sooner {
                    breakdown.next_expiry = Some(expires_at);
                }
            }
        }

        Ok(breakdown)
    }

    // =========================================================================
    // Spend Operations
    // =========================================================================

    fn spend(&self, owner: &Owner, request: SpendRequest) -> Result<SpendReceipt> {
        // Serializes concurrent spends so both cannot observe the same
        // headroom.
        let _guard = self.lock_writes()?;
        let now = Utc::now();

        let grants = self.usable_grants(owner, now)?;
        let plan = plan_spend(&grants, request.cost)?;

        let grant_by_id: std::collections::HashMap<GrantId, Grant> =
            grants.into_iter().map(|grant| (grant.id, grant)).collect();

        let cf_grants = self.cf(cf::GRANTS)?;
        let cf_spends = self.cf(cf::SPENDS)?;
        let cf_spends_by_owner = self.cf(cf::SPENDS_BY_OWNER)?;

        let mut batch = WriteBatch::default();
        let mut allocations = Vec::with_capacity(plan.plan.len());

        for line in &plan.plan {
            let Some(grant) = grant_by_id.get(&line.grant_id) else {
                return Err(StoreError::Database(
                    "allocation references unknown grant".into(),
                ));
            };

            let mut updated = grant.clone();
            updated.remaining_amount -= line.amount;
            updated.updated_at = now;
            batch.put_cf(
                &cf_grants,
                keys::grant_key(&updated.id),
                Self::serialize(&updated)?,
            );

            let spend = Spend {
                id: SpendId::generate(),
                owner: *owner,
                grant_id: line.grant_id,
                amount: line.amount,
                reason: request.reason.clone(),
                spend_ref: request.spend_ref.clone(),
                metadata: request.metadata.clone(),
                created_at: now,
            };
            batch.put_cf(&cf_spends, keys::spend_key(&spend.id), Self::serialize(&spend)?);
            batch.put_cf(&cf_spends_by_owner, keys::owner_spend_key(owner, &spend.id), []);

            allocations.push(SpendAllocation {
                grant_id: line.grant_id,
                amount: line.amount,
                grant_type: grant.grant_type,
                expires_at: grant.expires_at,
            });
        }

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        tracing::debug!(
            owner = %owner,
            cost = %request.cost,
            spend_ref = ?request.spend_ref,
            allocations = %allocations.len(),
            "Spend committed"
        );

        Ok(SpendReceipt {
            cost: request.cost,
            allocations,
        })
    }

    // =========================================================================
    // History & Reporting
    // =========================================================================

    fn list_grants(
        &self,
        owner: &Owner,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<Grant>, usize)> {
        let mut ids = self.owner_grant_ids(owner)?;
        let total = ids.len();

        // ULIDs are time-ordered; reverse for newest first.
        ids.reverse();

        let mut grants = Vec::new();
        for id in ids.into_iter().skip(offset).take(limit) {
            if let Some(grant) = self.get_grant(&id)? {
                grants.push(grant);
            }
        }

        Ok((grants, total))
    }

    fn list_spends(
        &self,
        owner: &Owner,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<SpendHistoryEntry>, usize)> {
        let mut ids = self.owner_spend_ids(owner)?;
        let total = ids.len();
        ids.reverse();

        let mut entries = Vec::new();
        for id in ids.into_iter().skip(offset).take(limit) {
            let Some(spend) = self.get_spend(&id)? else {
                continue;
            };
            let grant_type = self
                .get_grant(&spend.grant_id)?
                .map_or(GrantType::Purchased, |grant| grant.grant_type);
            entries.push(SpendHistoryEntry { spend, grant_type });
        }

        Ok((entries, total))
    }

    fn usage_summary(&self, owner: &Owner, days: u32, now: DateTime<Utc>) -> Result<UsageSummary> {
        let period_start = now - Duration::days(i64::from(days));

        let mut total_spent = 0;
        let mut buckets: BTreeMap<String, i64> = BTreeMap::new();

        for id in self.owner_spend_ids(owner)? {
            let Some(spend) = self.get_spend(&id)? else {
                continue;
            };
            if spend.created_at < period_start || spend.created_at > now {
                continue;
            }
            total_spent += spend.amount;
            *buckets.entry(calendar::date_key(spend.created_at)).or_default() += spend.amount;
        }

        let mut total_granted = 0;
        for grant in self.owner_grants(owner)? {
            if grant.created_at >= period_start && grant.created_at <= now {
                total_granted += grant.amount;
            }
        }

        Ok(UsageSummary {
            total_spent,
            total_granted,
            daily_usage: buckets
                .into_iter()
                .map(|(date, amount)| DailyUsage { date, amount })
                .collect(),
            period_start,
            period_end: now,
            days,
        })
    }

    // =========================================================================
    // Subscription Records
    // =========================================================================

    fn put_subscription(&self, subscription: &Subscription) -> Result<()> {
        let cf_subs = self.cf(cf::SUBSCRIPTIONS)?;
        self.db
            .put_cf(
                &cf_subs,
                keys::owner_key(&subscription.owner),
                Self::serialize(subscription)?,
            )
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn get_subscription(&self, owner: &Owner) -> Result<Option<Subscription>> {
        let cf_subs = self.cf(cf::SUBSCRIPTIONS)?;
        self.db
            .get_cf(&cf_subs, keys::owner_key(owner))
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn delete_subscription(&self, owner: &Owner) -> Result<()> {
        if self.get_subscription(owner)?.is_none() {
            return Err(StoreError::NotFound);
        }

        let cf_subs = self.cf(cf::SUBSCRIPTIONS)?;
        self.db
            .delete_cf(&cf_subs, keys::owner_key(owner))
            .map_err(|e| StoreError::Database(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgerd_core::{GrantType, UserId};
    use tempfile::TempDir;

    fn create_test_store() -> (RocksStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = RocksStore::open(dir.path()).unwrap();
        (store, dir)
    }

    fn test_owner() -> Owner {
        Owner::User(UserId::generate())
    }

    #[test]
    fn create_grant_and_balance() {
        let (store, _dir) = create_test_store();
        let owner = test_owner();

        let grant = store
            .create_grant(&owner, NewGrant::new(100, GrantType::Purchased))
            .unwrap();
        assert_eq!(grant.remaining_amount, 100);
        assert_eq!(store.balance(&owner).unwrap(), 100);

        // Another owner sees nothing.
        assert_eq!(store.balance(&test_owner()).unwrap(), 0);
    }

    #[test]
    fn create_grant_rejects_non_positive_amount() {
        let (store, _dir) = create_test_store();
        let owner = test_owner();

        let result = store.create_grant(&owner, NewGrant::new(0, GrantType::Purchased));
        assert!(matches!(result, Err(StoreError::InvalidAmount { amount: 0 })));

        let result = store.create_grant(&owner, NewGrant::new(-5, GrantType::Purchased));
        assert!(matches!(result, Err(StoreError::InvalidAmount { amount: -5 })));
    }

    #[test]
    fn expired_grants_do_not_count_toward_balance() {
        let (store, _dir) = create_test_store();
        let owner = test_owner();

        let past = Utc::now() - Duration::hours(1);
        store
            .create_grant(
                &owner,
                NewGrant::new(50, GrantType::DailyFree).expires_at(past),
            )
            .unwrap();
        store
            .create_grant(&owner, NewGrant::new(20, GrantType::Purchased))
            .unwrap();

        assert_eq!(store.balance(&owner).unwrap(), 20);
    }

    #[test]
    fn balance_breakdown_by_type_with_next_expiry() {
        let (store, _dir) = create_test_store();
        let owner = test_owner();

        let soon = Utc::now() + Duration::hours(2);
        let later = Utc::now() + Duration::days(20);

        store
            .create_grant(
                &owner,
                NewGrant::new(5, GrantType::DailyFree).expires_at(soon),
            )
            .unwrap();
        store
            .create_grant(
                &owner,
                NewGrant::new(300, GrantType::Subscription).expires_at(later),
            )
            .unwrap();
        store
            .create_grant(&owner, NewGrant::new(40, GrantType::Purchased))
            .unwrap();

        let breakdown = store.balance_breakdown(&owner).unwrap();
        assert_eq!(breakdown.total, 345);
        assert_eq!(breakdown.daily_free, 5);
        assert_eq!(breakdown.subscription, 300);
        assert_eq!(breakdown.promotional, 0);
        assert_eq!(breakdown.purchased, 40);
        assert_eq!(breakdown.next_expiry, Some(soon));
    }

    #[test]
    fn spend_splits_across_grants_and_records_rows() {
        let (store, _dir) = create_test_store();
        let owner = test_owner();

        let soon = Utc::now() + Duration::hours(5);
        let later = Utc::now() + Duration::days(3);

        let daily = store
            .create_grant(
                &owner,
                NewGrant::new(5, GrantType::DailyFree).expires_at(soon),
            )
            .unwrap();
        let subscription = store
            .create_grant(
                &owner,
                NewGrant::new(10, GrantType::Subscription).expires_at(later),
            )
            .unwrap();

        let receipt = store
            .spend(
                &owner,
                SpendRequest::new(8).reason("image_edit").spend_ref("charge-1"),
            )
            .unwrap();

        assert_eq!(receipt.cost, 8);
        assert_eq!(receipt.allocations.len(), 2);
        assert_eq!(receipt.allocations[0].grant_id, daily.id);
        assert_eq!(receipt.allocations[0].amount, 5);
        assert_eq!(receipt.allocations[1].grant_id, subscription.id);
        assert_eq!(receipt.allocations[1].amount, 3);

        assert_eq!(store.balance(&owner).unwrap(), 7);
        assert_eq!(store.get_grant(&daily.id).unwrap().unwrap().remaining_amount, 0);
        assert_eq!(
            store
                .get_grant(&subscription.id)
                .unwrap()
                .unwrap()
                .remaining_amount,
            7
        );

        let (spends, total) = store.list_spends(&owner, 10, 0).unwrap();
        assert_eq!(total, 2);
        assert!(spends
            .iter()
            .all(|entry| entry.spend.spend_ref.as_deref() == Some("charge-1")));
    }

    #[test]
    fn insufficient_spend_mutates_nothing() {
        let (store, _dir) = create_test_store();
        let owner = test_owner();

        let grant = store
            .create_grant(&owner, NewGrant::new(3, GrantType::Purchased))
            .unwrap();

        let result = store.spend(&owner, SpendRequest::new(10));
        assert!(matches!(
            result,
            Err(StoreError::InsufficientCredits {
                available: 3,
                required: 10
            })
        ));

        assert_eq!(store.balance(&owner).unwrap(), 3);
        assert_eq!(store.get_grant(&grant.id).unwrap().unwrap().remaining_amount, 3);
        let (_, total) = store.list_spends(&owner, 10, 0).unwrap();
        assert_eq!(total, 0);
    }

    #[test]
    fn spend_rejects_non_positive_cost() {
        let (store, _dir) = create_test_store();
        let owner = test_owner();

        let result = store.spend(&owner, SpendRequest::new(0));
        assert!(matches!(result, Err(StoreError::InvalidCost { cost: 0 })));
    }

    #[test]
    fn ensure_grant_is_idempotent() {
        let (store, _dir) = create_test_store();
        let owner = test_owner();

        let first = store
            .ensure_grant(&owner, "daily-2024-12-09", NewGrant::new(30, GrantType::DailyFree))
            .unwrap();
        assert!(first.is_new);

        let second = store
            .ensure_grant(&owner, "daily-2024-12-09", NewGrant::new(30, GrantType::DailyFree))
            .unwrap();
        assert!(!second.is_new);
        assert_eq!(second.grant.id, first.grant.id);

        assert_eq!(store.balance(&owner).unwrap(), 30);
    }

    #[test]
    fn ensure_grant_scopes_source_ref_per_owner() {
        let (store, _dir) = create_test_store();
        let alice = test_owner();
        let bob = test_owner();

        let a = store
            .ensure_grant(&alice, "daily-2024-12-09", NewGrant::new(30, GrantType::DailyFree))
            .unwrap();
        let b = store
            .ensure_grant(&bob, "daily-2024-12-09", NewGrant::new(30, GrantType::DailyFree))
            .unwrap();

        assert!(a.is_new);
        assert!(b.is_new);
        assert_ne!(a.grant.id, b.grant.id);
    }

    #[test]
    fn invalidate_by_source_prefix_only_hits_matching_grants() {
        let (store, _dir) = create_test_store();
        let owner = test_owner();

        let later = Utc::now() + Duration::days(10);
        store
            .ensure_grant(
                &owner,
                "subscription-pro-2024-12-01",
                NewGrant::new(3000, GrantType::Subscription).expires_at(later),
            )
            .unwrap();
        store
            .ensure_grant(
                &owner,
                "upgrade-pro-to-ultra-2024-12-20",
                NewGrant::new(5000, GrantType::Subscription).expires_at(later),
            )
            .unwrap();
        store
            .create_grant(&owner, NewGrant::new(100, GrantType::Purchased))
            .unwrap();

        let result = store
            .invalidate_grants_by_source_prefix(&owner, "subscription-pro")
            .unwrap();
        assert_eq!(result.invalidated_count, 1);
        assert_eq!(result.invalidated_amount, 3000);

        // Purchased and the upgrade grant are untouched.
        assert_eq!(store.balance(&owner).unwrap(), 5100);
    }

    #[test]
    fn invalidate_skips_already_spent_grants() {
        let (store, _dir) = create_test_store();
        let owner = test_owner();

        let later = Utc::now() + Duration::days(10);
        store
            .ensure_grant(
                &owner,
                "subscription-pro-2024-12-01",
                NewGrant::new(10, GrantType::Subscription).expires_at(later),
            )
            .unwrap();
        store.spend(&owner, SpendRequest::new(10)).unwrap();

        let result = store
            .invalidate_grants_by_source_prefix(&owner, "subscription-pro")
            .unwrap();
        assert_eq!(result.invalidated_count, 0);
        assert_eq!(result.invalidated_amount, 0);
    }

    #[test]
    fn list_grants_newest_first_with_pagination() {
        let (store, _dir) = create_test_store();
        let owner = test_owner();

        store
            .create_grant(&owner, NewGrant::new(1, GrantType::Purchased).reason("first"))
            .unwrap();
        std::thread::sleep(std::time::Duration::from_millis(2)); // Distinct ULID timestamps
        store
            .create_grant(&owner, NewGrant::new(2, GrantType::Purchased).reason("second"))
            .unwrap();

        let (grants, total) = store.list_grants(&owner, 10, 0).unwrap();
        assert_eq!(total, 2);
        assert_eq!(grants[0].reason.as_deref(), Some("second"));
        assert_eq!(grants[1].reason.as_deref(), Some("first"));

        let (page, _) = store.list_grants(&owner, 1, 1).unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].reason.as_deref(), Some("first"));
    }

    #[test]
    fn usage_summary_buckets_spends_by_day() {
        let (store, _dir) = create_test_store();
        let owner = test_owner();

        store
            .create_grant(&owner, NewGrant::new(100, GrantType::Purchased))
            .unwrap();
        store.spend(&owner, SpendRequest::new(7)).unwrap();
        store.spend(&owner, SpendRequest::new(5)).unwrap();

        let now = Utc::now();
        let summary = store.usage_summary(&owner, 30, now).unwrap();
        assert_eq!(summary.total_spent, 12);
        assert_eq!(summary.total_granted, 100);
        assert_eq!(summary.days, 30);
        assert_eq!(summary.daily_usage.len(), 1);
        assert_eq!(summary.daily_usage[0].date, calendar::date_key(now));
        assert_eq!(summary.daily_usage[0].amount, 12);
    }

    #[test]
    fn subscription_record_roundtrip() {
        let (store, _dir) = create_test_store();
        let owner = test_owner();

        assert!(store.get_subscription(&owner).unwrap().is_none());
        assert!(matches!(
            store.delete_subscription(&owner),
            Err(StoreError::NotFound)
        ));

        let now = Utc::now();
        let subscription = Subscription {
            owner,
            plan: ledgerd_core::PlanId::Pro,
            interval: ledgerd_core::PlanInterval::Month,
            cycle_anchor: now,
            current_period_end: now + Duration::days(30),
            created_at: now,
            updated_at: now,
        };
        store.put_subscription(&subscription).unwrap();

        let loaded = store.get_subscription(&owner).unwrap().unwrap();
        assert_eq!(loaded.plan, ledgerd_core::PlanId::Pro);

        store.delete_subscription(&owner).unwrap();
        assert!(store.get_subscription(&owner).unwrap().is_none());
    }
}
