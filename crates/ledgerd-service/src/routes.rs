//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{billing, credits, health, images, webhooks};
use crate::state::AppState;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
///
/// ## Billing & credits (bearer auth)
/// - `GET /v1/billing/summary` - Plan, balance breakdown, next expiry
/// - `GET /v1/credits/balance` - Current balance
/// - `GET /v1/credits/grants` - Grant history
/// - `GET /v1/credits/spends` - Spend history
/// - `GET /v1/credits/usage` - Usage histogram
///
/// ## Paid operations (bearer auth)
/// - `POST /v1/images/edit` - Credit-charged image edit
///
/// ## Service (API key auth)
/// - `POST /v1/credits/add` - Issue credits to an owner
/// - `POST /webhooks/payments` - Payment provider events
pub fn create_router(state: AppState) -> Router {
    // Extract config values before moving state
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    // Build CORS layer
    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    Router::new()
        // Health (public)
        .route("/health", get(health::health))
        // Billing
        .route("/v1/billing/summary", get(billing::billing_summary))
        // Credits
        .route("/v1/credits/balance", get(credits::get_balance))
        .route("/v1/credits/grants", get(credits::list_grants))
        .route("/v1/credits/spends", get(credits::list_spends))
        .route("/v1/credits/usage", get(credits::get_usage))
        .route("/v1/credits/add", post(credits::admin_add_credits))
        // Paid operations
        .route("/v1/images/edit", post(images::edit_image))
        // Webhooks
        .route("/webhooks/payments", post(webhooks::payment_webhook))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
