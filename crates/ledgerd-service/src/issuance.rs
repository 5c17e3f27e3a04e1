//! Lazy grant issuance.
//!
//! Instead of a scheduled job, the current day's or cycle's grants are
//! ensured on every balance-bearing read. The issuers are idempotent on
//! their `source_ref`, so this is safe to run on every request.

use chrono::{DateTime, Utc};

use ledgerd_core::Owner;
use ledgerd_store::{issuers, Store};

use crate::error::ApiError;
use crate::state::AppState;

/// Ensure the owner's current entitlement grants exist.
///
/// Subscribed owners get the current cycle's subscription grant (plus the
/// yearly signup bonus where applicable); everyone else gets the daily free
/// allowance.
pub fn ensure_current_grants(
    state: &AppState,
    owner: &Owner,
    now: DateTime<Utc>,
) -> Result<(), ApiError> {
    let subscription = state.store.get_subscription(owner)?;

    match subscription {
        Some(subscription) if state.config.plans.monthly_credits(subscription.plan) > 0 => {
            issuers::ensure_subscription_cycle_grant(
                state.store.as_ref(),
                &subscription,
                &state.config.plans,
                now,
            )?;
            issuers::ensure_yearly_signup_bonus(
                state.store.as_ref(),
                &subscription,
                &state.config.plans,
            )?;
        }
        _ => {
            issuers::ensure_daily_free_grant(
                state.store.as_ref(),
                owner,
                state.config.plans.free.daily,
                now,
            )?;
        }
    }

    Ok(())
}
