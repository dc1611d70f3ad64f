use alert_core::types::MarketTick;
use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::Serialize;

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/market/ticks", post(ingest_tick))
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct TickAccepted {
    status: &'static str,
}

/// Ingestion seam for the market-data feed. The tick is queued and
/// evaluated asynchronously; a 202 only acknowledges receipt.
async fn ingest_tick(
    State(state): State<AppState>,
    Json(tick): Json<MarketTick>,
) -> ApiResult<(StatusCode, Json<TickAccepted>)> {
    state
        .ticks
        .send(tick)
        .await
        .map_err(|_| ApiError::Internal("tick queue closed".to_string()))?;

    Ok((StatusCode::ACCEPTED, Json(TickAccepted { status: "queued" })))
}
