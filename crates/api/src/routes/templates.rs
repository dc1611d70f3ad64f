use alert_core::types::{AlertRule, AlertTemplate};
use alert_engine::templates::TemplateCustomizations;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};

use crate::{error::ApiResult, middleware::auth::AuthContext, state::AppState};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/alerts/templates", get(list_templates))
        .route(
            "/api/alerts/templates/{id}/create",
            post(create_from_template),
        )
        .with_state(state)
}

async fn list_templates(State(state): State<AppState>) -> Json<Vec<AlertTemplate>> {
    Json(state.engine.templates())
}

async fn create_from_template(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(customizations): Json<TemplateCustomizations>,
) -> ApiResult<(StatusCode, Json<AlertRule>)> {
    let rule = state
        .engine
        .create_rule_from_template(&auth.user_id, &id, customizations)
        .await?;
    Ok((StatusCode::CREATED, Json(rule)))
}
