//! Authentication middleware and extractors.
//!
//! This module provides extractors for:
//! - `Actor` - End-user authentication via bearer token, resolved to the
//!   acting ledger [`Owner`]
//! - `ServiceAuth` - Service-to-service authentication via API key

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use ledgerd_core::{OrganizationId, Owner, UserId};

use crate::error::ApiError;
use crate::state::AppState;

/// The authenticated actor of a request.
///
/// Authenticated as a user via bearer token; an `x-organization-id` header
/// switches the acting owner to that organization, so one request always
/// acts for exactly one owner.
#[derive(Debug, Clone)]
pub struct Actor {
    /// The authenticated user.
    pub user_id: UserId,
    /// The ledger owner this request acts for.
    pub owner: Owner,
}

impl FromRequestParts<Arc<AppState>> for Actor {
    type Rejection = ApiError;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut Parts,
        _state: &'life1 Arc<AppState>,
    ) -> ::core::pin::Pin<
        Box<
            dyn ::core::future::Future<Output = Result<Self, Self::Rejection>>
                + ::core::marker::Send
                + 'async_trait,
        >,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            // Extract the Authorization header
            let auth_header = parts
                .headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .ok_or(ApiError::Unauthorized)?;

            // Extract the Bearer token
            let token = auth_header
                .strip_prefix("Bearer ")
                .ok_or(ApiError::Unauthorized)?;

            // For now, we'll use a simple test token format: "test-token:<user-uuid>"
            // In production, this would validate against the identity provider
            let user_id = token
                .strip_prefix("test-token:")
                .ok_or(ApiError::Unauthorized)?
                .parse::<UserId>()
                .map_err(|_| ApiError::Unauthorized)?;

            // An organization header switches the acting owner
            let owner = match parts
                .headers
                .get("x-organization-id")
                .and_then(|v| v.to_str().ok())
            {
                Some(org_id) => {
                    let org_id = org_id
                        .parse::<OrganizationId>()
                        .map_err(|_| ApiError::BadRequest("invalid x-organization-id".into()))?;
                    Owner::Organization(org_id)
                }
                None => Owner::User(user_id),
            };

            Ok(Actor { user_id, owner })
        })
    }
}

/// Service authentication via API key.
///
/// Used for service-to-service requests (payment webhook relay, admin
/// credit adjustments).
#[derive(Debug, Clone)]
pub struct ServiceAuth {
    /// The service name or identifier.
    pub service_name: String,
}

impl FromRequestParts<Arc<AppState>> for ServiceAuth {
    type Rejection = ApiError;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut Parts,
        state: &'life1 Arc<AppState>,
    ) -> ::core::pin::Pin<
        Box<
            dyn ::core::future::Future<Output = Result<Self, Self::Rejection>>
                + ::core::marker::Send
                + 'async_trait,
        >,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            // Check for X-API-Key header
            let api_key = parts
                .headers
                .get("x-api-key")
                .and_then(|v| v.to_str().ok())
                .ok_or(ApiError::Unauthorized)?;

            // Validate against configured service API key
            let expected_key = state
                .config
                .service_api_key
                .as_ref()
                .ok_or(ApiError::Unauthorized)?;

            if api_key != expected_key {
                return Err(ApiError::Unauthorized);
            }

            // Extract service name from header if provided
            let service_name = parts
                .headers
                .get("x-service-name")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("unknown")
                .to_string();

            Ok(ServiceAuth { service_name })
        })
    }
}
