//! Charge orchestration for paid operations.
//!
//! Credits are debited before the external backend runs. If the backend
//! fails, a best-effort compensating refund re-issues every allocation on
//! the same terms (type and expiry) as the grant it was taken from, so a
//! refunded daily-free allocation expires when the original would have.
//!
//! Refund failures are logged and never override the backend error the
//! caller sees; the spend rows and the original `spend_ref` make manual
//! reconciliation possible.

use ledgerd_core::{NewGrant, Owner};
use ledgerd_store::{SpendReceipt, SpendRequest, Store};

use crate::error::ApiError;
use crate::generator::GeneratedImage;
use crate::state::AppState;

/// Outcome of a charged image edit.
#[derive(Debug)]
pub struct ChargedEdit {
    /// The generated image.
    pub image: GeneratedImage,

    /// The model that was charged for.
    pub model: String,

    /// Credits debited.
    pub cost: i64,

    /// Reference correlating the spend rows of this charge.
    pub spend_ref: String,
}

/// Charge for an image edit, run it, and refund on failure.
pub async fn charge_image_edit(
    state: &AppState,
    owner: &Owner,
    requested_model: Option<&str>,
    prompt: &str,
    image_url: Option<&str>,
) -> Result<ChargedEdit, ApiError> {
    let generator = state
        .generator
        .as_ref()
        .ok_or_else(|| ApiError::ExternalService("image generator not configured".into()))?;

    let model = state.config.pricing.resolve_model(requested_model);
    let pricing = state
        .config
        .pricing
        .pricing(model)
        .ok_or_else(|| ApiError::Internal(format!("model not priced: {model}")))?;
    if !pricing.active {
        return Err(ApiError::BadRequest(format!("model is not available: {model}")));
    }

    let spend_ref = format!("image-edit-{}", uuid::Uuid::new_v4());
    let receipt = state.store.spend(
        owner,
        SpendRequest::new(pricing.cost)
            .reason("image_edit")
            .spend_ref(spend_ref.clone())
            .metadata(serde_json::json!({ "model": model })),
    )?;

    tracing::debug!(
        owner = %owner,
        model = %model,
        cost = %pricing.cost,
        spend_ref = %spend_ref,
        "Credits charged for image edit"
    );

    match generator.edit(model, prompt, image_url).await {
        Ok(image) => Ok(ChargedEdit {
            image,
            model: model.to_string(),
            cost: pricing.cost,
            spend_ref,
        }),
        Err(err) => {
            tracing::warn!(
                owner = %owner,
                spend_ref = %spend_ref,
                error = %err,
                "Image edit failed after charge, refunding"
            );
            refund_spend(state, owner, &receipt, &spend_ref);
            Err(ApiError::ExternalService(err.to_string()))
        }
    }
}

/// Re-issue every allocation of a failed charge on its original terms.
///
/// Best effort: a failed refund is logged, not raised, so it can never mask
/// the error that triggered it.
fn refund_spend(state: &AppState, owner: &Owner, receipt: &SpendReceipt, spend_ref: &str) {
    for allocation in &receipt.allocations {
        let mut new_grant = NewGrant::new(allocation.amount, allocation.grant_type)
            .reason("image_edit_refund")
            .metadata(serde_json::json!({
                "refund_of": spend_ref,
                "original_grant_id": allocation.grant_id.to_string(),
            }));
        if let Some(expires_at) = allocation.expires_at {
            new_grant = new_grant.expires_at(expires_at);
        }

        if let Err(err) = state.store.create_grant(owner, new_grant) {
            tracing::error!(
                owner = %owner,
                spend_ref = %spend_ref,
                grant_id = %allocation.grant_id,
                amount = %allocation.amount,
                error = %err,
                "Refund grant failed; manual reconciliation required"
            );
        }
    }
}
