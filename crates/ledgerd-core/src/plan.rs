//! Billing plan catalog and subscription records.
//!
//! Plan resolution itself (mapping payment-provider products to plan ids)
//! happens upstream; the ledger only needs each plan's credit allowances and
//! its level for upgrade detection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Owner;

/// Available billing plans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanId {
    /// Free tier: daily free allowance only.
    Free,

    /// Pro tier: monthly subscription credits.
    Pro,

    /// Ultra tier: larger monthly subscription credits.
    Ultra,
}

impl PlanId {
    /// Plan level for upgrade detection; higher means a bigger plan.
    #[must_use]
    pub const fn level(&self) -> u8 {
        match self {
            Self::Free => 0,
            Self::Pro => 1,
            Self::Ultra => 2,
        }
    }

    /// Stable string form used inside `source_ref` values.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Pro => "pro",
            Self::Ultra => "ultra",
        }
    }
}

/// Billing interval of a subscription price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanInterval {
    /// Billed monthly.
    Month,

    /// Billed yearly; may carry a promotional signup bonus.
    Year,
}

/// Credit allowances for one plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanCredits {
    /// Daily free allowance (free tier).
    pub daily: i64,

    /// Credits granted each subscription cycle (paid tiers).
    pub monthly: i64,

    /// One-off promotional bonus for yearly signups.
    pub yearly_signup_bonus: i64,
}

/// Credit allowances for every plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanCatalog {
    /// Free tier allowances.
    pub free: PlanCredits,

    /// Pro tier allowances.
    pub pro: PlanCredits,

    /// Ultra tier allowances.
    pub ultra: PlanCredits,
}

impl Default for PlanCatalog {
    fn default() -> Self {
        Self {
            free: PlanCredits {
                daily: 30,
                monthly: 0,
                yearly_signup_bonus: 0,
            },
            pro: PlanCredits {
                daily: 0,
                monthly: 3000,
                yearly_signup_bonus: 600,
            },
            ultra: PlanCredits {
                daily: 0,
                monthly: 8000,
                yearly_signup_bonus: 1600,
            },
        }
    }
}

impl PlanCatalog {
    /// Allowances for the given plan.
    #[must_use]
    pub const fn credits(&self, plan: PlanId) -> &PlanCredits {
        match plan {
            PlanId::Free => &self.free,
            PlanId::Pro => &self.pro,
            PlanId::Ultra => &self.ultra,
        }
    }

    /// Monthly cycle credits for the given plan.
    #[must_use]
    pub const fn monthly_credits(&self, plan: PlanId) -> i64 {
        self.credits(plan).monthly
    }

    /// Whether a plan change is an upgrade (strictly higher level).
    #[must_use]
    pub fn is_upgrade(old: PlanId, new: PlanId) -> bool {
        new.level() > old.level()
    }

    /// Credits to grant when upgrading mid-cycle: the positive difference in
    /// monthly allowances, zero for downgrades or same-level changes.
    #[must_use]
    pub fn upgrade_credits_diff(&self, old: PlanId, new: PlanId) -> i64 {
        if !Self::is_upgrade(old, new) {
            return 0;
        }
        (self.monthly_credits(new) - self.monthly_credits(old)).max(0)
    }
}

/// The subscription record the payments webhook maintains for an owner.
///
/// The ledger consumes this for lazy grant issuance; the payment provider
/// remains the source of truth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    /// The owner the subscription belongs to.
    pub owner: Owner,

    /// The resolved plan.
    pub plan: PlanId,

    /// Billing interval.
    pub interval: PlanInterval,

    /// The subscription's original start date; monthly cycle boundaries are
    /// derived from it.
    pub cycle_anchor: DateTime<Utc>,

    /// End of the current billing period, as reported by the provider.
    pub current_period_end: DateTime<Utc>,

    /// When the record was created.
    pub created_at: DateTime<Utc>,

    /// When the record was last updated.
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_levels_are_ordered() {
        assert!(PlanId::Free.level() < PlanId::Pro.level());
        assert!(PlanId::Pro.level() < PlanId::Ultra.level());
    }

    #[test]
    fn upgrade_detection() {
        assert!(PlanCatalog::is_upgrade(PlanId::Free, PlanId::Pro));
        assert!(PlanCatalog::is_upgrade(PlanId::Pro, PlanId::Ultra));
        assert!(!PlanCatalog::is_upgrade(PlanId::Ultra, PlanId::Pro));
        assert!(!PlanCatalog::is_upgrade(PlanId::Pro, PlanId::Pro));
    }

    #[test]
    fn upgrade_diff_is_positive_difference() {
        let catalog = PlanCatalog::default();
        assert_eq!(catalog.upgrade_credits_diff(PlanId::Pro, PlanId::Ultra), 5000);
        assert_eq!(catalog.upgrade_credits_diff(PlanId::Free, PlanId::Pro), 3000);
        // Downgrades and no-ops grant nothing.
        assert_eq!(catalog.upgrade_credits_diff(PlanId::Ultra, PlanId::Pro), 0);
        assert_eq!(catalog.upgrade_credits_diff(PlanId::Pro, PlanId::Pro), 0);
    }

    #[test]
    fn plan_id_serde_format() {
        let json = serde_json::to_string(&PlanId::Ultra).unwrap();
        assert_eq!(json, "\"ultra\"");
    }
}
