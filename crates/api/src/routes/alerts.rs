use alert_core::store::AlertFilter;
use alert_core::types::{Alert, AlertStats, AlertStatus, RuleType};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, patch},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::{ApiError, ApiResult},
    middleware::auth::AuthContext,
    state::AppState,
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/alerts", get(list_alerts))
        .route("/api/alerts/stats", get(stats))
        .route("/api/alerts/read-all", patch(read_all))
        .route("/api/alerts/bulk-update", patch(bulk_update))
        .route("/api/alerts/bulk-delete", delete(bulk_delete))
        .route("/api/alerts/{id}", get(get_alert).delete(delete_alert))
        .route("/api/alerts/{id}/read", patch(mark_read))
        .with_state(state)
}

/// Filters arrive as the frontend sends them: empty strings mean "no filter".
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AlertsQuery {
    #[serde(default)]
    status: Option<String>,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    symbol: Option<String>,
    #[serde(default)]
    region: Option<String>,
    #[serde(default)]
    date_from: Option<String>,
    #[serde(default)]
    date_to: Option<String>,
    #[serde(default)]
    page: Option<u32>,
    #[serde(default)]
    limit: Option<u32>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_enum<T: serde::de::DeserializeOwned>(
    field: &str,
    value: Option<String>,
) -> ApiResult<Option<T>> {
    match non_empty(value) {
        None => Ok(None),
        Some(raw) => serde_json::from_value(serde_json::Value::String(raw.clone()))
            .map(Some)
            .map_err(|_| ApiError::BadRequest(format!("invalid {field}: {raw}"))),
    }
}

fn parse_date(field: &str, value: Option<String>) -> ApiResult<Option<DateTime<Utc>>> {
    match non_empty(value) {
        None => Ok(None),
        Some(raw) => DateTime::parse_from_rfc3339(&raw)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(|_| ApiError::BadRequest(format!("invalid {field}: {raw}"))),
    }
}

impl AlertsQuery {
    fn into_filter(self) -> ApiResult<AlertFilter> {
        Ok(AlertFilter {
            status: parse_enum::<AlertStatus>("status", self.status)?,
            kind: parse_enum::<RuleType>("type", self.kind)?,
            symbol: non_empty(self.symbol),
            region: non_empty(self.region),
            date_from: parse_date("dateFrom", self.date_from)?,
            date_to: parse_date("dateTo", self.date_to)?,
            page: self.page.unwrap_or(1).max(1),
            limit: self.limit.unwrap_or(20).clamp(1, 100),
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ListAlertsResponse {
    alerts: Vec<Alert>,
    total: u64,
    page: u32,
    total_pages: u32,
}

async fn list_alerts(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<AlertsQuery>,
) -> ApiResult<Json<ListAlertsResponse>> {
    let filter = query.into_filter()?;
    let page = state.engine.list_alerts(&auth.user_id, &filter).await?;

    Ok(Json(ListAlertsResponse {
        alerts: page.alerts,
        total: page.total,
        page: page.page,
        total_pages: page.total_pages,
    }))
}

async fn stats(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<AlertStats>> {
    Ok(Json(state.engine.stats(&auth.user_id).await?))
}

async fn get_alert(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<Alert>> {
    Ok(Json(state.engine.get_alert(&auth.user_id, &id).await?))
}

async fn mark_read(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<Alert>> {
    Ok(Json(
        state.engine.mark_alert_read(&auth.user_id, &id).await?,
    ))
}

#[derive(Debug, Serialize)]
struct UpdatedResponse {
    updated: u64,
}

async fn read_all(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<UpdatedResponse>> {
    let updated = state.engine.mark_all_alerts_read(&auth.user_id).await?;
    Ok(Json(UpdatedResponse { updated }))
}

async fn delete_alert(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.engine.delete_alert(&auth.user_id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BulkUpdateRequest {
    alert_ids: Vec<String>,
    updates: BulkUpdates,
}

/// Only the status field may change after the fact; everything else on an
/// alert is an immutable record of what happened.
#[derive(Debug, Deserialize)]
struct BulkUpdates {
    status: Option<AlertStatus>,
}

async fn bulk_update(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(body): Json<BulkUpdateRequest>,
) -> ApiResult<Json<UpdatedResponse>> {
    let Some(status) = body.updates.status else {
        return Err(ApiError::BadRequest(
            "updates.status is the only supported bulk update".to_string(),
        ));
    };

    let updated = state
        .engine
        .bulk_update_alerts(&auth.user_id, &body.alert_ids, status)
        .await?;
    Ok(Json(UpdatedResponse { updated }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BulkDeleteRequest {
    alert_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
struct DeletedResponse {
    deleted: u64,
}

async fn bulk_delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(body): Json<BulkDeleteRequest>,
) -> ApiResult<Json<DeletedResponse>> {
    let deleted = state
        .engine
        .bulk_delete_alerts(&auth.user_id, &body.alert_ids)
        .await?;
    Ok(Json(DeletedResponse { deleted }))
}
