//! Billing summary handler.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use ledgerd_core::PlanId;
use ledgerd_store::Store;

use crate::auth::Actor;
use crate::error::ApiError;
use crate::issuance::ensure_current_grants;
use crate::state::AppState;

/// Billing summary response.
#[derive(Debug, Serialize)]
pub struct BillingSummaryResponse {
    /// Current plan id.
    pub plan: String,
    /// Billing interval, when subscribed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,
    /// End of the current billing period, when subscribed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_period_end: Option<String>,
    /// Total usable balance.
    pub balance: i64,
    /// Balance split by grant type.
    pub breakdown: BreakdownBody,
    /// Next upcoming credit expiry, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_expiry: Option<String>,
}

/// Balance split by grant type.
#[derive(Debug, Serialize)]
pub struct BreakdownBody {
    /// Remaining daily free credits.
    pub daily_free: i64,
    /// Remaining subscription-cycle credits.
    pub subscription: i64,
    /// Remaining promotional credits.
    pub promotional: i64,
    /// Remaining purchased credits.
    pub purchased: i64,
}

/// Get the billing summary: plan, balance breakdown and next expiry.
///
/// Ensures the current day's or cycle's grants exist before reading, so the
/// first request of a new day or cycle sees the fresh allowance.
pub async fn billing_summary(
    State(state): State<Arc<AppState>>,
    actor: Actor,
) -> Result<Json<BillingSummaryResponse>, ApiError> {
    ensure_current_grants(&state, &actor.owner, Utc::now())?;

    let subscription = state.store.get_subscription(&actor.owner)?;
    let breakdown = state.store.balance_breakdown(&actor.owner)?;

    let (plan, interval, current_period_end) = match &subscription {
        Some(sub) => (
            sub.plan,
            Some(format!("{:?}", sub.interval).to_lowercase()),
            Some(sub.current_period_end.to_rfc3339()),
        ),
        None => (PlanId::Free, None, None),
    };

    Ok(Json(BillingSummaryResponse {
        plan: plan.as_str().to_string(),
        interval,
        current_period_end,
        balance: breakdown.total,
        breakdown: BreakdownBody {
            daily_free: breakdown.daily_free,
            subscription: breakdown.subscription,
            promotional: breakdown.promotional,
            purchased: breakdown.purchased,
        },
        next_expiry: breakdown.next_expiry.map(|t| t.to_rfc3339()),
    }))
}
