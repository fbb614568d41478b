//! Shared-secret authentication for the ingest endpoint.
//!
//! The tracking network sends a pre-agreed secret in the `x-shared-secret`
//! header. This is the only request-level check that can reject an ingest
//! call; everything past it is acknowledged no matter what.

use axum::{
    extract::FromRequestParts,
    http::{header::HeaderName, request::Parts},
};

use crate::app::AppState;
use crate::error::ApiError;

/// Header carrying the ingest shared secret.
pub static SHARED_SECRET_HEADER: HeaderName = HeaderName::from_static("x-shared-secret");

/// Extractor that authenticates an ingest request.
///
/// Runs before body extraction, so an unauthenticated caller never gets a
/// batch parsed or acknowledged. Succeeds only on an exact match with the
/// configured secret.
pub struct IngestAuth;

#[axum::async_trait]
impl FromRequestParts<AppState> for IngestAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let presented = parts
            .headers
            .get(&SHARED_SECRET_HEADER)
            .and_then(|v| v.to_str().ok());

        match presented {
            Some(secret) if secret == state.config.security.ingest_shared_secret => Ok(IngestAuth),
            Some(_) => {
                tracing::warn!("Ingest request with invalid shared secret");
                Err(ApiError::Unauthorized("invalid shared secret".to_string()))
            }
            None => {
                tracing::warn!("Ingest request missing shared secret header");
                Err(ApiError::Unauthorized("missing shared secret".to_string()))
            }
        }
    }
}
