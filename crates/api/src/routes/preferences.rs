use alert_core::types::AlertPreferences;
use axum::{
    extract::State,
    routing::get,
    Extension, Json, Router,
};

use crate::{error::ApiResult, middleware::auth::AuthContext, state::AppState};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/alerts/preferences",
            get(get_preferences).put(update_preferences),
        )
        .with_state(state)
}

async fn get_preferences(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<AlertPreferences>> {
    Ok(Json(state.engine.get_preferences(&auth.user_id).await?))
}

async fn update_preferences(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(preferences): Json<AlertPreferences>,
) -> ApiResult<Json<AlertPreferences>> {
    Ok(Json(
        state
            .engine
            .update_preferences(&auth.user_id, preferences)
            .await?,
    ))
}
