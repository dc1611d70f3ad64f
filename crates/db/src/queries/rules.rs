//! Alert-rule database operations.

use alert_core::types::AlertRule;
use sqlx::PgPool;

use crate::models::{RuleRow, RuleStatus, RuleType};

const RULE_COLUMNS: &str = "id, user_id, name, description, rule_type, status, \
     conditions, channels, cooldown_minutes, created_at, updated_at";

pub async fn create(pool: &PgPool, rule: &AlertRule) -> Result<RuleRow, sqlx::Error> {
    sqlx::query_as::<_, RuleRow>(&format!(
        r#"
        INSERT INTO alert_rules
            (id, user_id, name, description, rule_type, status,
             conditions, channels, cooldown_minutes, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING {RULE_COLUMNS}
        "#
    ))
    .bind(&rule.id)
    .bind(&rule.user_id)
    .bind(&rule.name)
    .bind(&rule.description)
    .bind(RuleType::from(rule.kind))
    .bind(RuleStatus::from(rule.status))
    .bind(serde_json::to_value(&rule.conditions).unwrap_or_default())
    .bind(serde_json::to_value(&rule.channels).unwrap_or_default())
    .bind(rule.cooldown as i32)
    .bind(rule.created_at)
    .bind(rule.updated_at)
    .fetch_one(pool)
    .await
}

/// Full replacement of a rule's mutable fields. Returns `None` when the
/// rule does not exist for that owner.
pub async fn update(pool: &PgPool, rule: &AlertRule) -> Result<Option<RuleRow>, sqlx::Error> {
    sqlx::query_as::<_, RuleRow>(&format!(
        r#"
        UPDATE alert_rules
        SET name = $3,
            description = $4,
            rule_type = $5,
            status = $6,
            conditions = $7,
            channels = $8,
            cooldown_minutes = $9,
            updated_at = $10
        WHERE id = $1 AND user_id = $2
        RETURNING {RULE_COLUMNS}
        "#
    ))
    .bind(&rule.id)
    .bind(&rule.user_id)
    .bind(&rule.name)
    .bind(&rule.description)
    .bind(RuleType::from(rule.kind))
    .bind(RuleStatus::from(rule.status))
    .bind(serde_json::to_value(&rule.conditions).unwrap_or_default())
    .bind(serde_json::to_value(&rule.channels).unwrap_or_default())
    .bind(rule.cooldown as i32)
    .bind(rule.updated_at)
    .fetch_optional(pool)
    .await
}

pub async fn delete(pool: &PgPool, user_id: &str, id: &str) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM alert_rules WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

pub async fn get(pool: &PgPool, user_id: &str, id: &str) -> Result<Option<RuleRow>, sqlx::Error> {
    sqlx::query_as::<_, RuleRow>(&format!(
        "SELECT {RULE_COLUMNS} FROM alert_rules WHERE id = $1 AND user_id = $2"
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

pub async fn list(pool: &PgPool, user_id: &str) -> Result<Vec<RuleRow>, sqlx::Error> {
    sqlx::query_as::<_, RuleRow>(&format!(
        "SELECT {RULE_COLUMNS} FROM alert_rules WHERE user_id = $1 ORDER BY created_at DESC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await
}

/// Every active rule across all users; the evaluation set for a tick.
pub async fn list_active(pool: &PgPool) -> Result<Vec<RuleRow>, sqlx::Error> {
    sqlx::query_as::<_, RuleRow>(&format!(
        "SELECT {RULE_COLUMNS} FROM alert_rules WHERE status = 'active'"
    ))
    .fetch_all(pool)
    .await
}

pub async fn count_active(pool: &PgPool, user_id: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM alert_rules WHERE user_id = $1 AND status = 'active'",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await
}
