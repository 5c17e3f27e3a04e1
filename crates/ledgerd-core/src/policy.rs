//! Grant ordering and spend allocation policy.
//!
//! Pure functions, no I/O. Grants are exhausted first-expiring-first-out,
//! with type priority breaking ties on identical expiry so that renewable
//! credit (daily free, subscription) is spent before durable purchased
//! credit, and earliest creation as the final tie-break.

use chrono::{DateTime, Utc};

use crate::{Grant, GrantId};

/// Errors raised while planning a spend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    /// The owner's usable grants do not cover the requested cost.
    ///
    /// Retryable only after the balance changes (e.g. a new grant lands).
    #[error("insufficient credits: available={available}, required={required}")]
    InsufficientCredits {
        /// Total remaining amount across the candidate grants.
        available: i64,
        /// The requested cost.
        required: i64,
    },

    /// The requested cost is not a positive integer. A caller bug, never a
    /// silent no-op.
    #[error("cost must be a positive integer, got {cost}")]
    InvalidCost {
        /// The offending cost.
        cost: i64,
    },
}

/// One line of an allocation plan: take `amount` from `grant_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanLine {
    /// The grant to draw from.
    pub grant_id: GrantId,
    /// How much to take from it.
    pub amount: i64,
}

/// A complete allocation plan covering a spend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpendPlan {
    /// The allocation lines, in deduction order.
    pub plan: Vec<PlanLine>,
    /// Total available across the candidate grants before the spend.
    pub available: i64,
}

/// Sort key for spend ordering: soonest expiry first (`None` sorts last),
/// then higher type priority, then earliest creation.
fn spend_sort_key(grant: &Grant) -> (DateTime<Utc>, u8, DateTime<Utc>) {
    let expires = grant.expires_at.unwrap_or(DateTime::<Utc>::MAX_UTC);
    (expires, u8::MAX - grant.grant_type.priority(), grant.created_at)
}

/// Return the grants in the order a spend should exhaust them.
#[must_use]
pub fn sort_grants_for_spend(grants: &[Grant]) -> Vec<Grant> {
    let mut sorted = grants.to_vec();
    sorted.sort_by_key(spend_sort_key);
    sorted
}

/// Sum of remaining amounts across the given grants.
#[must_use]
pub fn total_available(grants: &[Grant]) -> i64 {
    grants.iter().map(|grant| grant.remaining_amount).sum()
}

/// Plan how to cover `cost` from the given candidate grants.
///
/// Walks the grants in spend order, taking `min(remaining, still_needed)`
/// from each until the cost is covered.
///
/// # Errors
///
/// - [`PolicyError::InvalidCost`] if `cost` is not positive.
/// - [`PolicyError::InsufficientCredits`] if the grants cannot cover the
///   cost in full; no partial plan is returned.
pub fn plan_spend(grants: &[Grant], cost: i64) -> Result<SpendPlan, PolicyError> {
    if cost <= 0 {
        return Err(PolicyError::InvalidCost { cost });
    }

    let sorted = sort_grants_for_spend(grants);
    let available = total_available(&sorted);

    if available < cost {
        return Err(PolicyError::InsufficientCredits {
            available,
            required: cost,
        });
    }

    let mut plan = Vec::new();
    let mut remaining = cost;

    for grant in &sorted {
        if remaining <= 0 {
            break;
        }
        let deduction = grant.remaining_amount.min(remaining);
        plan.push(PlanLine {
            grant_id: grant.id,
            amount: deduction,
        });
        remaining -= deduction;
    }

    Ok(SpendPlan { plan, available })
}
