use alert_core::types::{AlertRule, CreateRuleRequest, RuleStatus, UpdateRuleRequest};
use alert_engine::service::RuleTestReport;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch, post},
    Extension, Json, Router,
};
use serde::Deserialize;

use crate::{
    error::ApiResult,
    middleware::auth::AuthContext,
    state::AppState,
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/alerts/rules", get(list_rules).post(create_rule))
        .route(
            "/api/alerts/rules/{id}",
            get(get_rule).put(update_rule).delete(delete_rule),
        )
        .route("/api/alerts/rules/{id}/toggle", patch(toggle_rule))
        .route("/api/alerts/rules/{id}/test", post(test_rule))
        .with_state(state)
}

async fn list_rules(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<AlertRule>>> {
    Ok(Json(state.engine.list_rules(&auth.user_id).await?))
}

async fn create_rule(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<CreateRuleRequest>,
) -> ApiResult<(StatusCode, Json<AlertRule>)> {
    let rule = state.engine.create_rule(&auth.user_id, request).await?;
    Ok((StatusCode::CREATED, Json(rule)))
}

async fn get_rule(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<AlertRule>> {
    Ok(Json(state.engine.get_rule(&auth.user_id, &id).await?))
}

async fn update_rule(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(patch): Json<UpdateRuleRequest>,
) -> ApiResult<Json<AlertRule>> {
    Ok(Json(
        state.engine.update_rule(&auth.user_id, &id, patch).await?,
    ))
}

async fn delete_rule(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.engine.delete_rule(&auth.user_id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct ToggleRequest {
    status: RuleStatus,
}

async fn toggle_rule(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(body): Json<ToggleRequest>,
) -> ApiResult<Json<AlertRule>> {
    Ok(Json(
        state
            .engine
            .set_rule_status(&auth.user_id, &id, body.status)
            .await?,
    ))
}

async fn test_rule(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<RuleTestReport>> {
    Ok(Json(state.engine.test_rule(&auth.user_id, &id).await?))
}
