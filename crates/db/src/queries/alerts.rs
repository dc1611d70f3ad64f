//! Alert ledger database operations.
//!
//! Alerts are append-mostly: rows are inserted when a rule fires and only
//! the status/deliveredAt/readAt columns change afterwards, guarded by the
//! forward-only lifecycle.

use alert_core::store::AlertFilter;
use alert_core::types::{self as domain, Alert};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::models::{AlertRow, AlertStatus, RuleType, Severity};

const ALERT_COLUMNS: &str = "id, rule_id, rule_name, user_id, symbol, commodity, region, \
     rule_type, severity, message, data, status, channels, created_at, delivered_at, read_at";

pub async fn insert(pool: &PgPool, alert: &Alert) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO alerts
            (id, rule_id, rule_name, user_id, symbol, commodity, region,
             rule_type, severity, message, data, status, channels, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        "#,
    )
    .bind(&alert.id)
    .bind(&alert.rule_id)
    .bind(&alert.rule_name)
    .bind(&alert.user_id)
    .bind(&alert.symbol)
    .bind(&alert.commodity)
    .bind(&alert.region)
    .bind(RuleType::from(alert.kind))
    .bind(Severity::from(alert.severity))
    .bind(&alert.message)
    .bind(serde_json::to_value(&alert.data).unwrap_or_default())
    .bind(AlertStatus::from(alert.status))
    .bind(serde_json::to_value(&alert.channels).unwrap_or_default())
    .bind(alert.created_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get(pool: &PgPool, user_id: &str, id: &str) -> Result<Option<AlertRow>, sqlx::Error> {
    sqlx::query_as::<_, AlertRow>(&format!(
        "SELECT {ALERT_COLUMNS} FROM alerts WHERE id = $1 AND user_id = $2"
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, user_id: &str, filter: &AlertFilter) {
    builder.push(" WHERE user_id = ").push_bind(user_id.to_string());
    if let Some(status) = filter.status {
        builder
            .push(" AND status = ")
            .push_bind(AlertStatus::from(status));
    }
    if let Some(kind) = filter.kind {
        builder
            .push(" AND rule_type = ")
            .push_bind(RuleType::from(kind));
    }
    if let Some(symbol) = filter.symbol.clone() {
        builder.push(" AND symbol = ").push_bind(symbol);
    }
    if let Some(region) = filter.region.clone() {
        builder.push(" AND region = ").push_bind(region);
    }
    if let Some(from) = filter.date_from {
        builder.push(" AND created_at >= ").push_bind(from);
    }
    if let Some(to) = filter.date_to {
        builder.push(" AND created_at <= ").push_bind(to);
    }
}

pub async fn list(
    pool: &PgPool,
    user_id: &str,
    filter: &AlertFilter,
) -> Result<Vec<AlertRow>, sqlx::Error> {
    let limit = i64::from(filter.limit.clamp(1, 100));
    let offset = i64::from(filter.page.max(1) - 1) * limit;

    let mut builder: QueryBuilder<'_, Postgres> =
        QueryBuilder::new(format!("SELECT {ALERT_COLUMNS} FROM alerts"));
    push_filters(&mut builder, user_id, filter);
    builder
        .push(" ORDER BY created_at DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    builder.build_query_as::<AlertRow>().fetch_all(pool).await
}

pub async fn count(
    pool: &PgPool,
    user_id: &str,
    filter: &AlertFilter,
) -> Result<i64, sqlx::Error> {
    let mut builder: QueryBuilder<'_, Postgres> =
        QueryBuilder::new("SELECT COUNT(*) FROM alerts");
    push_filters(&mut builder, user_id, filter);

    let row: (i64,) = builder.build_query_as().fetch_one(pool).await?;
    Ok(row.0)
}

/// Forward-only status transition. The WHERE clause encodes which source
/// states may reach the target, so a stale or repeated update affects zero
/// rows instead of rewinding the lifecycle.
pub async fn advance_status(
    pool: &PgPool,
    id: &str,
    status: domain::AlertStatus,
    at: DateTime<Utc>,
) -> Result<u64, sqlx::Error> {
    let result = match status {
        domain::AlertStatus::Sent => return Ok(0),
        domain::AlertStatus::Delivered => {
            sqlx::query(
                "UPDATE alerts SET status = 'delivered', delivered_at = $2 \
                 WHERE id = $1 AND status = 'sent'",
            )
            .bind(id)
            .bind(at)
            .execute(pool)
            .await?
        }
        domain::AlertStatus::Failed => {
            sqlx::query("UPDATE alerts SET status = 'failed' WHERE id = $1 AND status = 'sent'")
                .bind(id)
                .execute(pool)
                .await?
        }
        domain::AlertStatus::Read => {
            sqlx::query(
                "UPDATE alerts SET status = 'read', read_at = $2 \
                 WHERE id = $1 AND status != 'read'",
            )
            .bind(id)
            .bind(at)
            .execute(pool)
            .await?
        }
    };
    Ok(result.rows_affected())
}

pub async fn mark_read(
    pool: &PgPool,
    user_id: &str,
    id: &str,
    at: DateTime<Utc>,
) -> Result<Option<AlertRow>, sqlx::Error> {
    sqlx::query(
        "UPDATE alerts SET status = 'read', read_at = $3 \
         WHERE id = $1 AND user_id = $2 AND status != 'read'",
    )
    .bind(id)
    .bind(user_id)
    .bind(at)
    .execute(pool)
    .await?;

    get(pool, user_id, id).await
}

pub async fn mark_all_read(
    pool: &PgPool,
    user_id: &str,
    at: DateTime<Utc>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE alerts SET status = 'read', read_at = $2 \
         WHERE user_id = $1 AND status != 'read'",
    )
    .bind(user_id)
    .bind(at)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

pub async fn delete(pool: &PgPool, user_id: &str, id: &str) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM alerts WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

pub async fn bulk_update_status(
    pool: &PgPool,
    user_id: &str,
    ids: &[String],
    status: domain::AlertStatus,
    at: DateTime<Utc>,
) -> Result<u64, sqlx::Error> {
    let result = match status {
        domain::AlertStatus::Sent => return Ok(0),
        domain::AlertStatus::Delivered => {
            sqlx::query(
                "UPDATE alerts SET status = 'delivered', delivered_at = $3 \
                 WHERE user_id = $1 AND id = ANY($2) AND status = 'sent'",
            )
            .bind(user_id)
            .bind(ids)
            .bind(at)
            .execute(pool)
            .await?
        }
        domain::AlertStatus::Failed => {
            sqlx::query(
                "UPDATE alerts SET status = 'failed' \
                 WHERE user_id = $1 AND id = ANY($2) AND status = 'sent'",
            )
            .bind(user_id)
            .bind(ids)
            .execute(pool)
            .await?
        }
        domain::AlertStatus::Read => {
            sqlx::query(
                "UPDATE alerts SET status = 'read', read_at = $3 \
                 WHERE user_id = $1 AND id = ANY($2) AND status != 'read'",
            )
            .bind(user_id)
            .bind(ids)
            .bind(at)
            .execute(pool)
            .await?
        }
    };
    Ok(result.rows_affected())
}

pub async fn bulk_delete(pool: &PgPool, user_id: &str, ids: &[String]) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM alerts WHERE user_id = $1 AND id = ANY($2)")
        .bind(user_id)
        .bind(ids)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

#[derive(Debug, sqlx::FromRow)]
pub struct StatsRow {
    pub total: i64,
    pub unread: i64,
    pub today: i64,
    pub attempted: i64,
    pub delivered: i64,
}

pub async fn stats(
    pool: &PgPool,
    user_id: &str,
    today_start: DateTime<Utc>,
) -> Result<StatsRow, sqlx::Error> {
    sqlx::query_as::<_, StatsRow>(
        r#"
        SELECT
            COUNT(*) AS total,
            COUNT(*) FILTER (WHERE status != 'read') AS unread,
            COUNT(*) FILTER (WHERE created_at >= $2) AS today,
            COUNT(*) FILTER (WHERE jsonb_array_length(channels) > 0) AS attempted,
            COUNT(*) FILTER (WHERE delivered_at IS NOT NULL) AS delivered
        FROM alerts
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .bind(today_start)
    .fetch_one(pool)
    .await
}
