//! Credit balance, history and admin handlers.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ledgerd_core::{Grant, GrantType, NewGrant, OrganizationId, Owner, UserId};
use ledgerd_store::{SpendHistoryEntry, Store};

use crate::auth::{Actor, ServiceAuth};
use crate::error::ApiError;
use crate::issuance::ensure_current_grants;
use crate::state::AppState;

/// Balance response.
#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    /// Total usable balance.
    pub balance: i64,
    /// Next upcoming credit expiry, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_expiry: Option<String>,
}

/// Get the current credit balance.
///
/// Lazily ensures the current entitlement grants before reading.
pub async fn get_balance(
    State(state): State<Arc<AppState>>,
    actor: Actor,
) -> Result<Json<BalanceResponse>, ApiError> {
    ensure_current_grants(&state, &actor.owner, Utc::now())?;

    let breakdown = state.store.balance_breakdown(&actor.owner)?;
    Ok(Json(BalanceResponse {
        balance: breakdown.total,
        next_expiry: breakdown.next_expiry.map(|t| t.to_rfc3339()),
    }))
}

/// Pagination query parameters.
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    /// Maximum number of entries to return (default: 50).
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Offset for pagination (default: 0).
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    50
}

/// Grant response body.
#[derive(Debug, Serialize)]
pub struct GrantResponse {
    /// Grant ID.
    pub id: String,
    /// Original quantity issued.
    pub amount: i64,
    /// Quantity left.
    pub remaining_amount: i64,
    /// Grant type.
    pub grant_type: GrantType,
    /// Expiry, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
    /// Idempotency key, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_ref: Option<String>,
    /// Annotation, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Creation timestamp.
    pub created_at: String,
}

impl From<&Grant> for GrantResponse {
    fn from(grant: &Grant) -> Self {
        Self {
            id: grant.id.to_string(),
            amount: grant.amount,
            remaining_amount: grant.remaining_amount,
            grant_type: grant.grant_type,
            expires_at: grant.expires_at.map(|t| t.to_rfc3339()),
            source_ref: grant.source_ref.clone(),
            reason: grant.reason.clone(),
            created_at: grant.created_at.to_rfc3339(),
        }
    }
}

/// Grant list response.
#[derive(Debug, Serialize)]
pub struct ListGrantsResponse {
    /// Grants (newest first).
    pub grants: Vec<GrantResponse>,
    /// Total number of grants for the owner.
    pub total: usize,
    /// Whether there are more grants beyond this page.
    pub has_more: bool,
}

/// List grant history.
pub async fn list_grants(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Query(query): Query<PageQuery>,
) -> Result<Json<ListGrantsResponse>, ApiError> {
    let (grants, total) = state
        .store
        .list_grants(&actor.owner, query.limit, query.offset)?;

    Ok(Json(ListGrantsResponse {
        has_more: query.offset + grants.len() < total,
        grants: grants.iter().map(GrantResponse::from).collect(),
        total,
    }))
}

/// Spend response body.
#[derive(Debug, Serialize)]
pub struct SpendResponse {
    /// Spend ID.
    pub id: String,
    /// Grant debited.
    pub grant_id: String,
    /// Type of the grant debited.
    pub grant_type: GrantType,
    /// Amount debited.
    pub amount: i64,
    /// Annotation, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Logical charge reference, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spend_ref: Option<String>,
    /// Creation timestamp.
    pub created_at: String,
}

impl From<&SpendHistoryEntry> for SpendResponse {
    fn from(entry: &SpendHistoryEntry) -> Self {
        Self {
            id: entry.spend.id.to_string(),
            grant_id: entry.spend.grant_id.to_string(),
            grant_type: entry.grant_type,
            amount: entry.spend.amount,
            reason: entry.spend.reason.clone(),
            spend_ref: entry.spend.spend_ref.clone(),
            created_at: entry.spend.created_at.to_rfc3339(),
        }
    }
}

/// Spend list response.
#[derive(Debug, Serialize)]
pub struct ListSpendsResponse {
    /// Spends (newest first).
    pub spends: Vec<SpendResponse>,
    /// Total number of spends for the owner.
    pub total: usize,
    /// Whether there are more spends beyond this page.
    pub has_more: bool,
}

/// List spend history.
pub async fn list_spends(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Query(query): Query<PageQuery>,
) -> Result<Json<ListSpendsResponse>, ApiError> {
    let (spends, total) = state
        .store
        .list_spends(&actor.owner, query.limit, query.offset)?;

    Ok(Json(ListSpendsResponse {
        has_more: query.offset + spends.len() < total,
        spends: spends.iter().map(SpendResponse::from).collect(),
        total,
    }))
}

/// Usage query parameters.
#[derive(Debug, Deserialize)]
pub struct UsageQuery {
    /// Trailing window length in days (default: 30).
    #[serde(default = "default_days")]
    pub days: u32,
}

fn default_days() -> u32 {
    30
}

/// Usage summary response.
#[derive(Debug, Serialize)]
pub struct UsageResponse {
    /// Total credits spent in the window.
    pub total_spent: i64,
    /// Total credits granted in the window.
    pub total_granted: i64,
    /// Per-day spend histogram, ascending by date.
    pub daily_usage: Vec<DailyUsageBody>,
    /// Window length in days.
    pub days: u32,
}

/// One day of the usage histogram.
#[derive(Debug, Serialize)]
pub struct DailyUsageBody {
    /// `YYYY-MM-DD` day key.
    pub date: String,
    /// Credits spent that day.
    pub amount: i64,
}

/// Get the usage summary over a trailing window.
pub async fn get_usage(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Query(query): Query<UsageQuery>,
) -> Result<Json<UsageResponse>, ApiError> {
    if query.days == 0 || query.days > 366 {
        return Err(ApiError::BadRequest(
            "days must be between 1 and 366".into(),
        ));
    }

    let summary = state
        .store
        .usage_summary(&actor.owner, query.days, Utc::now())?;

    Ok(Json(UsageResponse {
        total_spent: summary.total_spent,
        total_granted: summary.total_granted,
        daily_usage: summary
            .daily_usage
            .into_iter()
            .map(|bucket| DailyUsageBody {
                date: bucket.date,
                amount: bucket.amount,
            })
            .collect(),
        days: summary.days,
    }))
}

/// Admin credit-add request.
#[derive(Debug, Deserialize)]
pub struct AddCreditsRequest {
    /// Target user (exactly one of this and `organization_id`).
    pub user_id: Option<UserId>,
    /// Target organization.
    pub organization_id: Option<OrganizationId>,
    /// Credits to issue; must be positive.
    pub amount: i64,
    /// Grant type (default: promotional).
    pub grant_type: Option<GrantType>,
    /// Optional expiry.
    pub expires_at: Option<DateTime<Utc>>,
    /// Optional idempotency key.
    pub source_ref: Option<String>,
    /// Optional annotation.
    pub reason: Option<String>,
}

/// Admin credit-add response.
#[derive(Debug, Serialize)]
pub struct AddCreditsResponse {
    /// The grant issued (or found, for a repeated `source_ref`).
    pub grant: GrantResponse,
    /// Whether this call created it.
    pub created: bool,
}

/// Issue credits to an owner (service auth).
///
/// With a `source_ref` the call is idempotent; repeating it returns the
/// existing grant.
pub async fn admin_add_credits(
    State(state): State<Arc<AppState>>,
    service: ServiceAuth,
    Json(request): Json<AddCreditsRequest>,
) -> Result<Json<AddCreditsResponse>, ApiError> {
    let owner = Owner::resolve(request.user_id, request.organization_id)?;

    let mut new_grant = NewGrant::new(
        request.amount,
        request.grant_type.unwrap_or(GrantType::Promotional),
    );
    if let Some(expires_at) = request.expires_at {
        new_grant = new_grant.expires_at(expires_at);
    }
    if let Some(reason) = &request.reason {
        new_grant = new_grant.reason(reason.clone());
    }

    let (grant, created) = match &request.source_ref {
        Some(source_ref) => {
            let outcome = state.store.ensure_grant(&owner, source_ref, new_grant)?;
            (outcome.grant, outcome.is_new)
        }
        None => (state.store.create_grant(&owner, new_grant)?, true),
    };

    tracing::info!(
        service = %service.service_name,
        owner = %owner,
        amount = %request.amount,
        created = %created,
        "Admin credits added"
    );

    Ok(Json(AddCreditsResponse {
        grant: GrantResponse::from(&grant),
        created,
    }))
}
