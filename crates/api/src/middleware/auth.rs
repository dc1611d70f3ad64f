//! Bearer API-key auth. Keys are stored hashed; the middleware resolves the
//! owning user and stashes an `AuthContext` for the handlers. Session and
//! account management live elsewhere; the engine only needs a user id.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use tracing::warn;

use crate::error::{ApiError, ApiResult};

#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: String,
    pub key_id: String,
    pub key_prefix: String,
}

pub async fn api_key_auth(
    State(pool): State<PgPool>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let header_value = req
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or_else(|| ApiError::Unauthorized("missing authorization header".to_string()))?;

    let token = parse_bearer(header_value)?;
    let hash = hash_key(token);

    let record = alert_db::queries::api_keys::find_active_by_hash(&pool, &hash)
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))?
        .ok_or_else(|| ApiError::Unauthorized("invalid api key".to_string()))?;

    if let Err(err) = alert_db::queries::api_keys::touch_last_used(&pool, &record.id).await {
        warn!(key_id = %record.id, error = %err, "failed to record api key use");
    }

    req.extensions_mut().insert(AuthContext {
        user_id: record.user_id,
        key_id: record.id,
        key_prefix: record.key_prefix,
    });

    Ok(next.run(req).await)
}

fn parse_bearer(value: &HeaderValue) -> ApiResult<&str> {
    let value = value
        .to_str()
        .map_err(|_| ApiError::Unauthorized("invalid authorization header".to_string()))?;
    let mut parts = value.splitn(2, ' ');
    let scheme = parts.next().unwrap_or_default();
    let token = parts.next().unwrap_or_default().trim();

    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(ApiError::Unauthorized(
            "expected a bearer token".to_string(),
        ));
    }
    Ok(token)
}

fn hash_key(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}
