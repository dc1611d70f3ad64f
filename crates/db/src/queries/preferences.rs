//! Per-user alert preference storage.

use alert_core::types::AlertPreferences;
use sqlx::PgPool;

use crate::models::PreferencesRow;

const PREFERENCE_COLUMNS: &str =
    "user_id, global_enabled, default_channels, quiet_hours, notification_settings";

pub async fn get(pool: &PgPool, user_id: &str) -> Result<Option<PreferencesRow>, sqlx::Error> {
    sqlx::query_as::<_, PreferencesRow>(&format!(
        "SELECT {PREFERENCE_COLUMNS} FROM alert_preferences WHERE user_id = $1"
    ))
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

pub async fn upsert(
    pool: &PgPool,
    preferences: &AlertPreferences,
) -> Result<PreferencesRow, sqlx::Error> {
    sqlx::query_as::<_, PreferencesRow>(&format!(
        r#"
        INSERT INTO alert_preferences
            (user_id, global_enabled, default_channels, quiet_hours, notification_settings, updated_at)
        VALUES ($1, $2, $3, $4, $5, now())
        ON CONFLICT (user_id) DO UPDATE
        SET global_enabled = EXCLUDED.global_enabled,
            default_channels = EXCLUDED.default_channels,
            quiet_hours = EXCLUDED.quiet_hours,
            notification_settings = EXCLUDED.notification_settings,
            updated_at = now()
        RETURNING {PREFERENCE_COLUMNS}
        "#
    ))
    .bind(&preferences.user_id)
    .bind(preferences.global_enabled)
    .bind(serde_json::to_value(&preferences.default_channels).unwrap_or_default())
    .bind(serde_json::to_value(&preferences.quiet_hours).unwrap_or_default())
    .bind(serde_json::to_value(&preferences.notification_settings).unwrap_or_default())
    .fetch_one(pool)
    .await
}
