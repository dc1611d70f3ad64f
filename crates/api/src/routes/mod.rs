pub mod alerts;
pub mod health;
pub mod preferences;
pub mod rules;
pub mod stream;
pub mod templates;
pub mod ticks;

use axum::Router;

use crate::state::AppState;

/// Everything behind API-key auth.
pub fn api_router(state: AppState) -> Router {
    Router::new()
        .merge(rules::router(state.clone()))
        .merge(alerts::router(state.clone()))
        .merge(templates::router(state.clone()))
        .merge(preferences::router(state.clone()))
        .merge(ticks::router(state.clone()))
        .merge(stream::router(state))
}

pub fn health_router() -> Router {
    health::router()
}
