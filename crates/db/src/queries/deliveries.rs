//! Per-channel delivery attempt records.
//!
//! Each attempt against a channel provider gets its own row; the alert's
//! overall status is aggregated by the dispatcher, not here.

use alert_core::types::DeliveryRecord;
use sqlx::PgPool;

use crate::models::{ChannelKind, DeliveryOutcome, DeliveryRow};

pub async fn insert(pool: &PgPool, record: &DeliveryRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO alert_deliveries
            (id, alert_id, channel, attempt, outcome, error_message, latency_ms, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(&record.id)
    .bind(&record.alert_id)
    .bind(ChannelKind::from(record.channel))
    .bind(record.attempt as i32)
    .bind(DeliveryOutcome::from(record.outcome))
    .bind(&record.error)
    .bind(record.latency_ms)
    .bind(record.created_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn list_for_alert(pool: &PgPool, alert_id: &str) -> Result<Vec<DeliveryRow>, sqlx::Error> {
    sqlx::query_as::<_, DeliveryRow>(
        r#"
        SELECT id, alert_id, channel, attempt, outcome, error_message, latency_ms, created_at
        FROM alert_deliveries
        WHERE alert_id = $1
        ORDER BY created_at ASC
        "#,
    )
    .bind(alert_id)
    .fetch_all(pool)
    .await
}
