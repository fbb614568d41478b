//! Telemetry batch ingest endpoint.
//!
//! The tracking network treats any non-2xx response as a signal to redeliver
//! the batch, so once a caller is authenticated the endpoint acknowledges no
//! matter what happened downstream. Bad payloads and infrastructure failures
//! are logged, never surfaced.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use domain::models::RawTelemetryMessage;
use serde::Serialize;

use crate::app::AppState;
use crate::extractors::IngestAuth;
use crate::services::IngestOutcome;

/// Acknowledgement body. Always `{"success": true}` for authenticated calls.
#[derive(Debug, Serialize)]
pub struct IngestAck {
    pub success: bool,
}

/// POST /api/v1/telemetry/ingest
pub async fn ingest_batch(
    State(state): State<AppState>,
    _auth: IngestAuth,
    payload: Result<Json<Vec<RawTelemetryMessage>>, JsonRejection>,
) -> Json<IngestAck> {
    let messages = match payload {
        Ok(Json(messages)) => messages,
        Err(rejection) => {
            tracing::warn!(error = %rejection, "Ingest batch with undecodable body acknowledged");
            return Json(IngestAck { success: true });
        }
    };

    match state.ingest.ingest(messages).await {
        IngestOutcome::Stored { count } => {
            tracing::info!(count, "Telemetry batch stored");
        }
        IngestOutcome::Failed {
            message_count,
            idents,
            error,
        } => {
            tracing::error!(
                message_count,
                idents = ?idents,
                error = %error,
                "Telemetry batch failed, acknowledging anyway"
            );
        }
    }

    Json(IngestAck { success: true })
}
