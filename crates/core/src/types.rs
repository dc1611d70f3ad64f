use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    Threshold,
    Pattern,
    Volume,
    PriceChange,
}

impl RuleType {
    pub fn label(self) -> &'static str {
        match self {
            RuleType::Threshold => "threshold",
            RuleType::Pattern => "pattern",
            RuleType::Volume => "volume",
            RuleType::PriceChange => "price change",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleStatus {
    Active,
    Inactive,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionField {
    Price,
    Volume,
    ChangePercent,
    TradeCount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionOperator {
    Gt,
    Gte,
    Lt,
    Lte,
    Eq,
    Neq,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    InApp,
    Email,
    Sms,
    Push,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Sent,
    Delivered,
    Failed,
    Read,
}

impl AlertStatus {
    /// Position in the forward-only lifecycle: sent(0) -> delivered|failed(1) -> read(2).
    pub fn rank(self) -> u8 {
        match self {
            AlertStatus::Sent => 0,
            AlertStatus::Delivered | AlertStatus::Failed => 1,
            AlertStatus::Read => 2,
        }
    }

    /// A transition is legal only if it strictly advances the lifecycle.
    /// Delivered and failed share a rank, so they never replace each other.
    pub fn can_advance_to(self, next: AlertStatus) -> bool {
        next.rank() > self.rank()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryOutcome {
    Delivered,
    Failed,
}

/// One conjunctive clause of a rule. Absent symbol/region scope is a wildcard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertCondition {
    pub field: ConditionField,
    pub operator: ConditionOperator,
    pub value: f64,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    /// Minutes; aggregate window for pattern/volume conditions.
    #[serde(default)]
    pub timeframe: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub push_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertChannel {
    #[serde(rename = "type")]
    pub kind: ChannelKind,
    pub enabled: bool,
    #[serde(default)]
    pub config: ChannelConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertRule {
    pub id: String,
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: RuleType,
    pub status: RuleStatus,
    pub conditions: Vec<AlertCondition>,
    pub channels: Vec<AlertChannel>,
    /// Minutes a rule stays muted after firing.
    pub cooldown: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AlertRule {
    pub fn enabled_channels(&self) -> impl Iterator<Item = &AlertChannel> {
        self.channels.iter().filter(|c| c.enabled)
    }
}

/// Snapshot of the values that made a rule fire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertData {
    #[serde(default)]
    pub current_price: Option<f64>,
    #[serde(default)]
    pub previous_price: Option<f64>,
    #[serde(default)]
    pub change_percent: Option<f64>,
    #[serde(default)]
    pub volume: Option<f64>,
    #[serde(default)]
    pub trade_count: Option<u32>,
    #[serde(default)]
    pub threshold: Option<f64>,
    #[serde(default)]
    pub timeframe: Option<u32>,
}

/// An immutable fact: a rule matched market data at a point in time.
/// Only status/deliveredAt/readAt change afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: String,
    pub rule_id: String,
    pub rule_name: String,
    pub user_id: String,
    pub symbol: String,
    pub commodity: String,
    pub region: String,
    #[serde(rename = "type")]
    pub kind: RuleType,
    pub severity: Severity,
    pub message: String,
    pub data: AlertData,
    pub status: AlertStatus,
    /// Channel kinds actually attempted for this alert.
    pub channels: Vec<ChannelKind>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub delivered_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub read_at: Option<DateTime<Utc>>,
}

/// A market-data observation. Aggregate fields (changePercent, volume,
/// tradeCount over a window) are computed by the upstream tick source.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketTick {
    pub symbol: String,
    pub commodity: String,
    pub region: String,
    pub price: f64,
    #[serde(default)]
    pub previous_price: Option<f64>,
    #[serde(default)]
    pub change_percent: Option<f64>,
    #[serde(default)]
    pub volume: Option<f64>,
    #[serde(default)]
    pub trade_count: Option<u32>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertStats {
    pub total_alerts: u64,
    pub unread_alerts: u64,
    pub active_rules: u64,
    pub today_alerts: u64,
    pub delivery_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuietHours {
    pub enabled: bool,
    /// HH:mm, local to `timezone`.
    pub start: String,
    /// HH:mm, local to `timezone`.
    pub end: String,
    pub timezone: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationSettings {
    pub sound: bool,
    pub vibration: bool,
    pub desktop: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertPreferences {
    pub user_id: String,
    pub global_enabled: bool,
    pub default_channels: Vec<AlertChannel>,
    pub quiet_hours: QuietHours,
    pub notification_settings: NotificationSettings,
}

impl AlertPreferences {
    pub fn defaults_for(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            global_enabled: true,
            default_channels: vec![AlertChannel {
                kind: ChannelKind::InApp,
                enabled: true,
                config: ChannelConfig::default(),
            }],
            quiet_hours: QuietHours {
                enabled: false,
                start: "22:00".to_string(),
                end: "06:00".to_string(),
                timezone: "UTC".to_string(),
            },
            notification_settings: NotificationSettings {
                sound: true,
                vibration: true,
                desktop: true,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertTemplate {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: RuleType,
    pub conditions: Vec<AlertCondition>,
    pub channels: Vec<AlertChannel>,
    pub cooldown: u32,
    pub is_default: bool,
}

/// One attempt to push an alert through a channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryRecord {
    pub id: String,
    pub alert_id: String,
    pub channel: ChannelKind,
    pub attempt: u32,
    pub outcome: DeliveryOutcome,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub latency_ms: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRuleRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: RuleType,
    pub conditions: Vec<AlertCondition>,
    pub channels: Vec<AlertChannel>,
    pub cooldown: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRuleRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<RuleType>,
    #[serde(default)]
    pub conditions: Option<Vec<AlertCondition>>,
    #[serde(default)]
    pub channels: Option<Vec<AlertChannel>>,
    #[serde(default)]
    pub cooldown: Option<u32>,
    #[serde(default)]
    pub status: Option<RuleStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_only_advances() {
        assert!(AlertStatus::Sent.can_advance_to(AlertStatus::Delivered));
        assert!(AlertStatus::Sent.can_advance_to(AlertStatus::Failed));
        assert!(AlertStatus::Sent.can_advance_to(AlertStatus::Read));
        assert!(AlertStatus::Delivered.can_advance_to(AlertStatus::Read));
        assert!(AlertStatus::Failed.can_advance_to(AlertStatus::Read));

        assert!(!AlertStatus::Read.can_advance_to(AlertStatus::Delivered));
        assert!(!AlertStatus::Delivered.can_advance_to(AlertStatus::Sent));
        assert!(!AlertStatus::Delivered.can_advance_to(AlertStatus::Failed));
        assert!(!AlertStatus::Failed.can_advance_to(AlertStatus::Delivered));
        assert!(!AlertStatus::Read.can_advance_to(AlertStatus::Read));
    }

    #[test]
    fn wire_casing_matches_the_frontend_contract() {
        let channel: AlertChannel =
            serde_json::from_str(r#"{"type":"in_app","enabled":true}"#).unwrap();
        assert_eq!(channel.kind, ChannelKind::InApp);

        let condition: AlertCondition = serde_json::from_str(
            r#"{"field":"change_percent","operator":"gte","value":5.0,"symbol":"GAPWM2"}"#,
        )
        .unwrap();
        assert_eq!(condition.field, ConditionField::ChangePercent);
        assert_eq!(condition.operator, ConditionOperator::Gte);
        assert_eq!(condition.symbol.as_deref(), Some("GAPWM2"));
        assert_eq!(condition.timeframe, None);

        let json = serde_json::to_value(RuleType::PriceChange).unwrap();
        assert_eq!(json, serde_json::json!("price_change"));
    }

    #[test]
    fn enabled_channels_filters_disabled_ones() {
        let rule = AlertRule {
            id: "rul_1".into(),
            user_id: "usr_1".into(),
            name: "maize watch".into(),
            description: None,
            kind: RuleType::Threshold,
            status: RuleStatus::Active,
            conditions: vec![],
            channels: vec![
                AlertChannel {
                    kind: ChannelKind::Email,
                    enabled: true,
                    config: ChannelConfig::default(),
                },
                AlertChannel {
                    kind: ChannelKind::Sms,
                    enabled: false,
                    config: ChannelConfig::default(),
                },
            ],
            cooldown: 30,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let kinds: Vec<_> = rule.enabled_channels().map(|c| c.kind).collect();
        assert_eq!(kinds, vec![ChannelKind::Email]);
    }
}
