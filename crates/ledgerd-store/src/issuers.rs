//! Idempotent grant issuers.
//!
//! Each issuer derives a stable `source_ref` from calendar boundaries or
//! plan-change parameters and goes through [`Store::ensure_grant`], so
//! re-running one (lazy issuance fires on every balance read) never creates
//! a duplicate grant.

use chrono::{DateTime, Utc};

use ledgerd_core::{
    calendar, GrantType, NewGrant, Owner, PlanCatalog, PlanId, PlanInterval, Subscription,
};

use crate::error::Result;
use crate::{EnsureOutcome, InvalidationResult, Store};

/// `source_ref` for the daily free grant of the given UTC day.
#[must_use]
pub fn daily_source_ref(at: DateTime<Utc>) -> String {
    format!("daily-{}", calendar::date_key(at))
}

/// `source_ref` prefix for a plan's subscription-cycle grants. Embedding the
/// plan id lets plan-change invalidation target one plan's grants by prefix.
#[must_use]
pub fn subscription_source_prefix(plan: PlanId) -> String {
    format!("subscription-{}", plan.as_str())
}

/// `source_ref` for the subscription-cycle grant of the cycle starting at
/// `cycle_start`.
#[must_use]
pub fn subscription_cycle_source_ref(plan: PlanId, cycle_start: DateTime<Utc>) -> String {
    format!(
        "{}-{}",
        subscription_source_prefix(plan),
        calendar::date_key(cycle_start)
    )
}

/// `source_ref` prefix for upgrade-diff grants away from `old`.
#[must_use]
pub fn upgrade_source_prefix(old: PlanId) -> String {
    format!("upgrade-{}-to-", old.as_str())
}

/// `source_ref` for the upgrade-diff grant of a specific plan change, scoped
/// to the current billing period so a repeated webhook delivery is a no-op.
#[must_use]
pub fn upgrade_source_ref(old: PlanId, new: PlanId, period_end: DateTime<Utc>) -> String {
    format!(
        "{}{}-{}",
        upgrade_source_prefix(old),
        new.as_str(),
        calendar::date_key(period_end)
    )
}

/// Ensure today's daily free grant exists for the owner.
///
/// Expires at the end of the UTC day it was issued for. Returns `None`
/// without touching the store when the allowance is zero (paid plans).
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub fn ensure_daily_free_grant(
    store: &dyn Store,
    owner: &Owner,
    amount: i64,
    now: DateTime<Utc>,
) -> Result<Option<EnsureOutcome>> {
    if amount <= 0 {
        return Ok(None);
    }

    let outcome = store.ensure_grant(
        owner,
        &daily_source_ref(now),
        NewGrant::new(amount, GrantType::DailyFree)
            .expires_at(calendar::end_of_day_utc(now))
            .reason("daily_free"),
    )?;

    Ok(Some(outcome))
}

/// Ensure the current cycle's subscription grant exists for the owner.
///
/// The cycle is the latest monthly boundary at or before `now`, derived from
/// the subscription's anchor date; the grant expires at the next boundary.
/// Returns `None` when the plan has no monthly allowance.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub fn ensure_subscription_cycle_grant(
    store: &dyn Store,
    subscription: &Subscription,
    catalog: &PlanCatalog,
    now: DateTime<Utc>,
) -> Result<Option<EnsureOutcome>> {
    let amount = catalog.monthly_credits(subscription.plan);
    if amount <= 0 {
        return Ok(None);
    }

    let cycle_start = calendar::current_cycle_start(subscription.cycle_anchor, now);
    let cycle_end = calendar::add_months(cycle_start, 1);

    let outcome = store.ensure_grant(
        &subscription.owner,
        &subscription_cycle_source_ref(subscription.plan, cycle_start),
        NewGrant::new(amount, GrantType::Subscription)
            .expires_at(cycle_end)
            .reason("subscription_cycle")
            .metadata(serde_json::json!({
                "plan": subscription.plan.as_str(),
                "cycle_start": cycle_start.to_rfc3339(),
            })),
    )?;

    Ok(Some(outcome))
}

/// Ensure the yearly signup bonus exists for a new yearly subscription.
///
/// Issued once per subscription anchor as a promotional grant expiring a
/// year after the anchor. Returns `None` for monthly subscriptions or plans
/// without a bonus.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub fn ensure_yearly_signup_bonus(
    store: &dyn Store,
    subscription: &Subscription,
    catalog: &PlanCatalog,
) -> Result<Option<EnsureOutcome>> {
    if subscription.interval != PlanInterval::Year {
        return Ok(None);
    }
    let amount = catalog.credits(subscription.plan).yearly_signup_bonus;
    if amount <= 0 {
        return Ok(None);
    }

    let anchor_day = calendar::start_of_day_utc(subscription.cycle_anchor);
    let source_ref = format!(
        "yearly-bonus-{}-{}",
        subscription.plan.as_str(),
        calendar::date_key(anchor_day)
    );

    let outcome = ensure_promotional_grant(
        store,
        &subscription.owner,
        &source_ref,
        amount,
        Some(calendar::add_months(anchor_day, 12)),
        Some("yearly_signup_bonus"),
    )?;

    Ok(Some(outcome))
}

/// Ensure a promotional grant exists for the given campaign key.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub fn ensure_promotional_grant(
    store: &dyn Store,
    owner: &Owner,
    source_ref: &str,
    amount: i64,
    expires_at: Option<DateTime<Utc>>,
    reason: Option<&str>,
) -> Result<EnsureOutcome> {
    let mut new_grant = NewGrant::new(amount, GrantType::Promotional);
    if let Some(expires_at) = expires_at {
        new_grant = new_grant.expires_at(expires_at);
    }
    if let Some(reason) = reason {
        new_grant = new_grant.reason(reason);
    }
    store.ensure_grant(owner, source_ref, new_grant)
}

/// Ensure the one-time upgrade-diff grant for a mid-cycle plan upgrade.
///
/// The amount is the positive difference between the plans' monthly
/// allowances; downgrades and same-level changes issue nothing. The grant
/// expires at the current period end.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub fn ensure_upgrade_grant(
    store: &dyn Store,
    owner: &Owner,
    catalog: &PlanCatalog,
    old_plan: PlanId,
    new_plan: PlanId,
    period_end: DateTime<Utc>,
) -> Result<Option<EnsureOutcome>> {
    let amount = catalog.upgrade_credits_diff(old_plan, new_plan);
    if amount <= 0 {
        return Ok(None);
    }

    let outcome = store.ensure_grant(
        owner,
        &upgrade_source_ref(old_plan, new_plan, period_end),
        NewGrant::new(amount, GrantType::Subscription)
            .expires_at(period_end)
            .reason("plan_upgrade")
            .metadata(serde_json::json!({
                "old_plan": old_plan.as_str(),
                "new_plan": new_plan.as_str(),
            })),
    )?;

    Ok(Some(outcome))
}

/// Zero the remaining credit of every usable grant issued under `old_plan`:
/// its subscription-cycle grants and any upgrade-diff grants away from it.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub fn invalidate_plan_grants(
    store: &dyn Store,
    owner: &Owner,
    old_plan: PlanId,
) -> Result<InvalidationResult> {
    let cycles =
        store.invalidate_grants_by_source_prefix(owner, &subscription_source_prefix(old_plan))?;
    let upgrades =
        store.invalidate_grants_by_source_prefix(owner, &upgrade_source_prefix(old_plan))?;

    Ok(InvalidationResult {
        invalidated_count: cycles.invalidated_count + upgrades.invalidated_count,
        invalidated_amount: cycles.invalidated_amount + upgrades.invalidated_amount,
    })
}
