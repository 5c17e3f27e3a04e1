//! Payment provider webhook handlers.
//!
//! The payment provider is the source of truth for plans; these events keep
//! the subscription record current and drive the plan-change grant flow:
//! invalidate the old plan's grants, issue the upgrade diff, issue the new
//! cycle's grant.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ledgerd_core::{
    GrantType, NewGrant, OrganizationId, Owner, PlanId, PlanInterval, Subscription, UserId,
};
use ledgerd_store::{issuers, Store};

use crate::auth::ServiceAuth;
use crate::error::ApiError;
use crate::state::AppState;

/// Payment webhook envelope.
#[derive(Debug, Deserialize)]
pub struct PaymentEvent {
    /// Event type.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Event ID (for logging).
    pub id: String,
    /// Event payload.
    pub data: serde_json::Value,
}

/// Webhook response.
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    /// Whether the webhook was processed.
    pub received: bool,
}

/// Subscription event payload.
#[derive(Debug, Deserialize)]
struct SubscriptionEventData {
    user_id: Option<UserId>,
    organization_id: Option<OrganizationId>,
    plan: PlanId,
    interval: PlanInterval,
    /// Subscription start date; monthly cycles are anchored to it.
    cycle_anchor: DateTime<Utc>,
    current_period_end: DateTime<Utc>,
}

/// Checkout event payload.
#[derive(Debug, Deserialize)]
struct CheckoutEventData {
    user_id: Option<UserId>,
    organization_id: Option<OrganizationId>,
    /// Provider checkout id; keys the purchased grant's idempotency.
    checkout_id: String,
    credits: i64,
}

/// Handle payment provider webhooks.
pub async fn payment_webhook(
    State(state): State<Arc<AppState>>,
    _service: ServiceAuth,
    Json(event): Json<PaymentEvent>,
) -> Result<Json<WebhookResponse>, ApiError> {
    tracing::info!(
        event_id = %event.id,
        event_type = %event.event_type,
        "Payment webhook received"
    );

    match event.event_type.as_str() {
        "subscription.created" | "subscription.updated" => {
            handle_subscription_change(&state, event.data)?;
        }
        "subscription.deleted" => {
            handle_subscription_deleted(&state, event.data)?;
        }
        "checkout.completed" => {
            handle_checkout_completed(&state, event.data)?;
        }
        other => {
            tracing::debug!(event_type = %other, "Ignoring unhandled webhook event type");
        }
    }

    Ok(Json(WebhookResponse { received: true }))
}

fn handle_subscription_change(
    state: &AppState,
    data: serde_json::Value,
) -> Result<(), ApiError> {
    let data: SubscriptionEventData =
        serde_json::from_value(data).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let owner = Owner::resolve(data.user_id, data.organization_id)?;
    let now = Utc::now();

    let previous = state.store.get_subscription(&owner)?;

    // Plan change: retire the old plan's grants and, for upgrades, issue the
    // monthly-allowance diff for the remainder of the period.
    if let Some(previous) = &previous {
        if previous.plan != data.plan {
            issuers::invalidate_plan_grants(state.store.as_ref(), &owner, previous.plan)?;
            issuers::ensure_upgrade_grant(
                state.store.as_ref(),
                &owner,
                &state.config.plans,
                previous.plan,
                data.plan,
                data.current_period_end,
            )?;
        }
    }

    let subscription = Subscription {
        owner,
        plan: data.plan,
        interval: data.interval,
        cycle_anchor: data.cycle_anchor,
        current_period_end: data.current_period_end,
        created_at: previous.as_ref().map_or(now, |p| p.created_at),
        updated_at: now,
    };
    state.store.put_subscription(&subscription)?;

    issuers::ensure_subscription_cycle_grant(
        state.store.as_ref(),
        &subscription,
        &state.config.plans,
        now,
    )?;
    issuers::ensure_yearly_signup_bonus(state.store.as_ref(), &subscription, &state.config.plans)?;

    tracing::info!(
        owner = %owner,
        plan = %data.plan.as_str(),
        "Subscription record updated"
    );

    Ok(())
}

fn handle_subscription_deleted(
    state: &AppState,
    data: serde_json::Value,
) -> Result<(), ApiError> {
    let data: SubscriptionEventData =
        serde_json::from_value(data).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let owner = Owner::resolve(data.user_id, data.organization_id)?;

    if let Some(previous) = state.store.get_subscription(&owner)? {
        issuers::invalidate_plan_grants(state.store.as_ref(), &owner, previous.plan)?;
        state.store.delete_subscription(&owner)?;
        tracing::info!(
            owner = %owner,
            plan = %previous.plan.as_str(),
            "Subscription deleted, plan grants invalidated"
        );
    }

    Ok(())
}

fn handle_checkout_completed(state: &AppState, data: serde_json::Value) -> Result<(), ApiError> {
    let data: CheckoutEventData =
        serde_json::from_value(data).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let owner = Owner::resolve(data.user_id, data.organization_id)?;

    // Purchased credits never expire; the checkout id makes redelivery a
    // no-op.
    let source_ref = format!("purchase-{}", data.checkout_id);
    let outcome = state.store.ensure_grant(
        &owner,
        &source_ref,
        NewGrant::new(data.credits, GrantType::Purchased).reason("credit_purchase"),
    )?;

    tracing::info!(
        owner = %owner,
        credits = %data.credits,
        created = %outcome.is_new,
        "Checkout completed"
    );

    Ok(())
}
