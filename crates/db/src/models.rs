//! Row models for the Postgres schema. Wire enums mirror the domain enums
//! one-to-one; JSONB columns round-trip through the domain types' serde
//! representation.

use alert_core::error::StoreError;
use alert_core::types as domain;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "rule_type", rename_all = "snake_case")]
pub enum RuleType {
    Threshold,
    Pattern,
    Volume,
    PriceChange,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "rule_status", rename_all = "lowercase")]
pub enum RuleStatus {
    Active,
    Inactive,
    Paused,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "alert_status", rename_all = "lowercase")]
pub enum AlertStatus {
    Sent,
    Delivered,
    Failed,
    Read,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "alert_severity", rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "channel_kind", rename_all = "snake_case")]
pub enum ChannelKind {
    InApp,
    Email,
    Sms,
    Push,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "delivery_outcome", rename_all = "lowercase")]
pub enum DeliveryOutcome {
    Delivered,
    Failed,
}

impl From<domain::RuleType> for RuleType {
    fn from(value: domain::RuleType) -> Self {
        match value {
            domain::RuleType::Threshold => RuleType::Threshold,
            domain::RuleType::Pattern => RuleType::Pattern,
            domain::RuleType::Volume => RuleType::Volume,
            domain::RuleType::PriceChange => RuleType::PriceChange,
        }
    }
}

impl From<RuleType> for domain::RuleType {
    fn from(value: RuleType) -> Self {
        match value {
            RuleType::Threshold => domain::RuleType::Threshold,
            RuleType::Pattern => domain::RuleType::Pattern,
            RuleType::Volume => domain::RuleType::Volume,
            RuleType::PriceChange => domain::RuleType::PriceChange,
        }
    }
}

impl From<domain::RuleStatus> for RuleStatus {
    fn from(value: domain::RuleStatus) -> Self {
        match value {
            domain::RuleStatus::Active => RuleStatus::Active,
            domain::RuleStatus::Inactive => RuleStatus::Inactive,
            domain::RuleStatus::Paused => RuleStatus::Paused,
        }
    }
}

impl From<RuleStatus> for domain::RuleStatus {
    fn from(value: RuleStatus) -> Self {
        match value {
            RuleStatus::Active => domain::RuleStatus::Active,
            RuleStatus::Inactive => domain::RuleStatus::Inactive,
            RuleStatus::Paused => domain::RuleStatus::Paused,
        }
    }
}

impl From<domain::AlertStatus> for AlertStatus {
    fn from(value: domain::AlertStatus) -> Self {
        match value {
            domain::AlertStatus::Sent => AlertStatus::Sent,
            domain::AlertStatus::Delivered => AlertStatus::Delivered,
            domain::AlertStatus::Failed => AlertStatus::Failed,
            domain::AlertStatus::Read => AlertStatus::Read,
        }
    }
}

impl From<AlertStatus> for domain::AlertStatus {
    fn from(value: AlertStatus) -> Self {
        match value {
            AlertStatus::Sent => domain::AlertStatus::Sent,
            AlertStatus::Delivered => domain::AlertStatus::Delivered,
            AlertStatus::Failed => domain::AlertStatus::Failed,
            AlertStatus::Read => domain::AlertStatus::Read,
        }
    }
}

impl From<domain::Severity> for Severity {
    fn from(value: domain::Severity) -> Self {
        match value {
            domain::Severity::Low => Severity::Low,
            domain::Severity::Medium => Severity::Medium,
            domain::Severity::High => Severity::High,
            domain::Severity::Critical => Severity::Critical,
        }
    }
}

impl From<Severity> for domain::Severity {
    fn from(value: Severity) -> Self {
        match value {
            Severity::Low => domain::Severity::Low,
            Severity::Medium => domain::Severity::Medium,
            Severity::High => domain::Severity::High,
            Severity::Critical => domain::Severity::Critical,
        }
    }
}

impl From<domain::ChannelKind> for ChannelKind {
    fn from(value: domain::ChannelKind) -> Self {
        match value {
            domain::ChannelKind::InApp => ChannelKind::InApp,
            domain::ChannelKind::Email => ChannelKind::Email,
            domain::ChannelKind::Sms => ChannelKind::Sms,
            domain::ChannelKind::Push => ChannelKind::Push,
        }
    }
}

impl From<ChannelKind> for domain::ChannelKind {
    fn from(value: ChannelKind) -> Self {
        match value {
            ChannelKind::InApp => domain::ChannelKind::InApp,
            ChannelKind::Email => domain::ChannelKind::Email,
            ChannelKind::Sms => domain::ChannelKind::Sms,
            ChannelKind::Push => domain::ChannelKind::Push,
        }
    }
}

impl From<domain::DeliveryOutcome> for DeliveryOutcome {
    fn from(value: domain::DeliveryOutcome) -> Self {
        match value {
            domain::DeliveryOutcome::Delivered => DeliveryOutcome::Delivered,
            domain::DeliveryOutcome::Failed => DeliveryOutcome::Failed,
        }
    }
}

impl From<DeliveryOutcome> for domain::DeliveryOutcome {
    fn from(value: DeliveryOutcome) -> Self {
        match value {
            DeliveryOutcome::Delivered => domain::DeliveryOutcome::Delivered,
            DeliveryOutcome::Failed => domain::DeliveryOutcome::Failed,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct RuleRow {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    pub rule_type: RuleType,
    pub status: RuleStatus,
    pub conditions: serde_json::Value,
    pub channels: serde_json::Value,
    pub cooldown_minutes: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RuleRow {
    pub fn into_domain(self) -> Result<domain::AlertRule, StoreError> {
        Ok(domain::AlertRule {
            id: self.id,
            user_id: self.user_id,
            name: self.name,
            description: self.description,
            kind: self.rule_type.into(),
            status: self.status.into(),
            conditions: serde_json::from_value(self.conditions).map_err(StoreError::backend)?,
            channels: serde_json::from_value(self.channels).map_err(StoreError::backend)?,
            cooldown: self.cooldown_minutes.max(0) as u32,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct AlertRow {
    pub id: String,
    pub rule_id: String,
    pub rule_name: String,
    pub user_id: String,
    pub symbol: String,
    pub commodity: String,
    pub region: String,
    pub rule_type: RuleType,
    pub severity: Severity,
    pub message: String,
    pub data: serde_json::Value,
    pub status: AlertStatus,
    pub channels: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub read_at: Option<DateTime<Utc>>,
}

impl AlertRow {
    pub fn into_domain(self) -> Result<domain::Alert, StoreError> {
        Ok(domain::Alert {
            id: self.id,
            rule_id: self.rule_id,
            rule_name: self.rule_name,
            user_id: self.user_id,
            symbol: self.symbol,
            commodity: self.commodity,
            region: self.region,
            kind: self.rule_type.into(),
            severity: self.severity.into(),
            message: self.message,
            data: serde_json::from_value(self.data).map_err(StoreError::backend)?,
            status: self.status.into(),
            channels: serde_json::from_value(self.channels).map_err(StoreError::backend)?,
            created_at: self.created_at,
            delivered_at: self.delivered_at,
            read_at: self.read_at,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DeliveryRow {
    pub id: String,
    pub alert_id: String,
    pub channel: ChannelKind,
    pub attempt: i32,
    pub outcome: DeliveryOutcome,
    pub error_message: Option<String>,
    pub latency_ms: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl DeliveryRow {
    pub fn into_domain(self) -> domain::DeliveryRecord {
        domain::DeliveryRecord {
            id: self.id,
            alert_id: self.alert_id,
            channel: self.channel.into(),
            attempt: self.attempt.max(0) as u32,
            outcome: self.outcome.into(),
            error: self.error_message,
            latency_ms: self.latency_ms,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct PreferencesRow {
    pub user_id: String,
    pub global_enabled: bool,
    pub default_channels: serde_json::Value,
    pub quiet_hours: serde_json::Value,
    pub notification_settings: serde_json::Value,
}

impl PreferencesRow {
    pub fn into_domain(self) -> Result<domain::AlertPreferences, StoreError> {
        Ok(domain::AlertPreferences {
            user_id: self.user_id,
            global_enabled: self.global_enabled,
            default_channels: serde_json::from_value(self.default_channels)
                .map_err(StoreError::backend)?,
            quiet_hours: serde_json::from_value(self.quiet_hours).map_err(StoreError::backend)?,
            notification_settings: serde_json::from_value(self.notification_settings)
                .map_err(StoreError::backend)?,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ApiKeyRow {
    pub id: String,
    pub user_id: String,
    pub key_prefix: String,
}
