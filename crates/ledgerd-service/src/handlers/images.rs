//! Credit-charged image edit handler.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::auth::Actor;
use crate::charge::charge_image_edit;
use crate::error::ApiError;
use crate::issuance::ensure_current_grants;
use crate::state::AppState;

/// Image edit request.
#[derive(Debug, Deserialize)]
pub struct EditImageRequest {
    /// Edit instruction.
    pub prompt: String,
    /// Model to use (default model when omitted or unknown).
    pub model: Option<String>,
    /// Source image to edit, if any.
    pub image_url: Option<String>,
}

/// Image edit response.
#[derive(Debug, Serialize)]
pub struct EditImageResponse {
    /// URL of the generated image.
    pub url: String,
    /// The model that ran.
    pub model: String,
    /// Credits charged.
    pub cost: i64,
    /// Reference correlating the charge's spend rows.
    pub spend_ref: String,
}

/// Run a credit-charged image edit.
///
/// Ensures the current entitlement grants first so a brand-new user's first
/// edit of the day can draw on the daily allowance.
pub async fn edit_image(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Json(request): Json<EditImageRequest>,
) -> Result<Json<EditImageResponse>, ApiError> {
    if request.prompt.trim().is_empty() {
        return Err(ApiError::BadRequest("prompt must not be empty".into()));
    }

    ensure_current_grants(&state, &actor.owner, Utc::now())?;

    let charged = charge_image_edit(
        &state,
        &actor.owner,
        request.model.as_deref(),
        &request.prompt,
        request.image_url.as_deref(),
    )
    .await?;

    Ok(Json(EditImageResponse {
        url: charged.image.url,
        model: charged.model,
        cost: charged.cost,
        spend_ref: charged.spend_ref,
    }))
}
