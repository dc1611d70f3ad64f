//! The alert engine: rule CRUD, tick evaluation, alert lifecycle and the
//! seams the HTTP layer talks to. Dependencies are injected as trait
//! objects; the engine itself owns no storage.

use std::sync::Arc;

use alert_core::cooldown::CooldownTracker;
use alert_core::error::{StoreError, ValidationError};
use alert_core::evaluate;
use alert_core::message;
use alert_core::severity::SeverityPolicy;
use alert_core::store::{AlertFilter, AlertLedger, AlertPage, PreferenceStore, RuleStore};
use alert_core::types::{
    Alert, AlertChannel, AlertData, AlertPreferences, AlertRule, AlertStats, AlertStatus,
    AlertTemplate, ChannelKind, ConditionOperator, CreateRuleRequest, DeliveryOutcome, MarketTick,
    RuleStatus, Severity, UpdateRuleRequest,
};
use alert_core::validate;
use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::dispatch::Dispatcher;
use crate::events::{AlertEvent, EventBus};
use crate::templates::{self, TemplateCustomizations};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{0} not found")]
    NotFound(String),
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => EngineError::NotFound(what),
            other => EngineError::Store(other),
        }
    }
}

/// Result of a forced `/test` cycle. Nothing here is persisted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleTestReport {
    pub matched: bool,
    pub severity: Severity,
    pub message: String,
    pub channels: Vec<ChannelTestResult>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelTestResult {
    pub channel: ChannelKind,
    pub outcome: DeliveryOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct AlertEngine {
    rules: Arc<dyn RuleStore>,
    ledger: Arc<dyn AlertLedger>,
    preferences: Arc<dyn PreferenceStore>,
    cooldown: CooldownTracker,
    dispatcher: Dispatcher,
    events: EventBus,
    severity: SeverityPolicy,
}

impl AlertEngine {
    pub fn new(
        rules: Arc<dyn RuleStore>,
        ledger: Arc<dyn AlertLedger>,
        preferences: Arc<dyn PreferenceStore>,
        dispatcher: Dispatcher,
        events: EventBus,
        severity: SeverityPolicy,
    ) -> Self {
        Self {
            rules,
            ledger,
            preferences,
            cooldown: CooldownTracker::new(),
            dispatcher,
            events,
            severity,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AlertEvent> {
        self.events.subscribe()
    }

    // ---- rules -----------------------------------------------------------

    pub async fn create_rule(
        &self,
        user_id: &str,
        request: CreateRuleRequest,
    ) -> Result<AlertRule, EngineError> {
        validate::validate_create(&request)?;

        let now = Utc::now();
        let rule = AlertRule {
            id: format!("rul_{}", nanoid::nanoid!(12)),
            user_id: user_id.to_string(),
            name: request.name,
            description: request.description,
            kind: request.kind,
            status: RuleStatus::Active,
            conditions: request.conditions,
            channels: request.channels,
            cooldown: request.cooldown,
            created_at: now,
            updated_at: now,
        };

        let rule = self.rules.create(rule).await?;
        info!(rule_id = %rule.id, user_id = %rule.user_id, "alert rule created");
        Ok(rule)
    }

    pub async fn update_rule(
        &self,
        user_id: &str,
        id: &str,
        patch: UpdateRuleRequest,
    ) -> Result<AlertRule, EngineError> {
        let mut rule = self
            .rules
            .get(user_id, id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("rule {id}")))?;

        if let Some(name) = patch.name {
            rule.name = name;
        }
        if let Some(description) = patch.description {
            rule.description = Some(description);
        }
        if let Some(kind) = patch.kind {
            rule.kind = kind;
        }
        if let Some(conditions) = patch.conditions {
            rule.conditions = conditions;
        }
        if let Some(channels) = patch.channels {
            rule.channels = channels;
        }
        if let Some(cooldown) = patch.cooldown {
            rule.cooldown = cooldown;
        }
        if let Some(status) = patch.status {
            rule.status = status;
        }
        rule.updated_at = Utc::now();

        validate::validate_rule(&rule)?;
        Ok(self.rules.update(rule).await?)
    }

    pub async fn delete_rule(&self, user_id: &str, id: &str) -> Result<(), EngineError> {
        self.rules.delete(user_id, id).await?;
        info!(rule_id = %id, user_id = %user_id, "alert rule deleted");
        Ok(())
    }

    pub async fn get_rule(&self, user_id: &str, id: &str) -> Result<AlertRule, EngineError> {
        self.rules
            .get(user_id, id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("rule {id}")))
    }

    pub async fn list_rules(&self, user_id: &str) -> Result<Vec<AlertRule>, EngineError> {
        Ok(self.rules.list(user_id).await?)
    }

    pub async fn set_rule_status(
        &self,
        user_id: &str,
        id: &str,
        status: RuleStatus,
    ) -> Result<AlertRule, EngineError> {
        let mut rule = self
            .rules
            .get(user_id, id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("rule {id}")))?;
        rule.status = status;
        rule.updated_at = Utc::now();
        Ok(self.rules.update(rule).await?)
    }

    // ---- tick evaluation -------------------------------------------------

    /// Evaluate one tick against every active rule. Matches that survive
    /// the cooldown gate are written to the ledger and handed to the
    /// dispatcher in the background; the fired alerts are returned.
    pub async fn handle_tick(self: &Arc<Self>, tick: MarketTick) -> Result<Vec<Alert>, EngineError> {
        let rules = self.rules.list_active().await?;
        let mut fired = Vec::new();

        for rule in rules {
            match evaluate::evaluate(&rule.conditions, &tick) {
                Ok(true) => {
                    if let Some(alert) = self.fire(&rule, &tick).await {
                        fired.push(alert);
                    }
                }
                Ok(false) => {}
                Err(err) => {
                    // One rule's bad input never halts the others.
                    warn!(rule_id = %rule.id, error = %err, "skipping rule for this tick");
                }
            }
        }

        Ok(fired)
    }

    async fn fire(self: &Arc<Self>, rule: &AlertRule, tick: &MarketTick) -> Option<Alert> {
        let now = Utc::now();
        let decision = self.cooldown.try_fire(&rule.id, rule.cooldown, now);
        if !decision.allowed {
            debug!(
                rule_id = %rule.id,
                next_eligible_at = %decision.next_eligible_at,
                "match suppressed by cooldown"
            );
            return None;
        }

        let alert = build_alert(rule, tick, &self.severity);

        // The alert must exist durably before any delivery starts. If the
        // write fails the match is not considered fired, so the cooldown
        // stamp is rolled back.
        if let Err(err) = self.ledger.insert(&alert).await {
            self.cooldown.revert(&rule.id, &decision);
            warn!(rule_id = %rule.id, error = %err, "alert write failed; match not fired");
            return None;
        }

        info!(
            alert_id = %alert.id,
            rule_id = %rule.id,
            symbol = %alert.symbol,
            severity = ?alert.severity,
            "alert fired"
        );
        self.events.publish(AlertEvent::Created {
            alert: alert.clone(),
        });

        // Delivery runs detached: a paused or deleted rule no longer
        // evaluates, but an in-flight alert still completes.
        let engine = Arc::clone(self);
        let channels = rule.channels.clone();
        let dispatched = alert.clone();
        tokio::spawn(async move {
            engine.dispatch_alert(dispatched, channels).await;
        });

        Some(alert)
    }

    async fn dispatch_alert(&self, alert: Alert, channels: Vec<AlertChannel>) {
        let preferences = self.preferences_for(&alert.user_id).await;
        let summary = self
            .dispatcher
            .dispatch(Arc::clone(&self.ledger), &alert, &channels, &preferences)
            .await;

        let Some(status) = summary.final_status else {
            return;
        };

        match self.ledger.advance_status(&alert.id, status, Utc::now()).await {
            Ok(true) => {
                self.events.publish(AlertEvent::StatusChanged {
                    alert_id: alert.id.clone(),
                    user_id: alert.user_id.clone(),
                    status,
                });
            }
            // Already past this state, e.g. the user read it mid-flight.
            Ok(false) => {}
            Err(err) => {
                warn!(alert_id = %alert.id, error = %err, "failed to finalize alert status");
            }
        }
    }

    async fn preferences_for(&self, user_id: &str) -> AlertPreferences {
        match self.preferences.get(user_id).await {
            Ok(Some(preferences)) => preferences,
            Ok(None) => AlertPreferences::defaults_for(user_id),
            Err(err) => {
                warn!(user_id = %user_id, error = %err, "preference lookup failed; using defaults");
                AlertPreferences::defaults_for(user_id)
            }
        }
    }

    // ---- alerts ----------------------------------------------------------

    pub async fn list_alerts(
        &self,
        user_id: &str,
        filter: &AlertFilter,
    ) -> Result<AlertPage, EngineError> {
        Ok(self.ledger.list(user_id, filter).await?)
    }

    pub async fn get_alert(&self, user_id: &str, id: &str) -> Result<Alert, EngineError> {
        self.ledger
            .get(user_id, id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("alert {id}")))
    }

    pub async fn mark_alert_read(&self, user_id: &str, id: &str) -> Result<Alert, EngineError> {
        let alert = self.ledger.mark_read(user_id, id, Utc::now()).await?;
        self.events.publish(AlertEvent::StatusChanged {
            alert_id: alert.id.clone(),
            user_id: alert.user_id.clone(),
            status: alert.status,
        });
        Ok(alert)
    }

    pub async fn mark_all_alerts_read(&self, user_id: &str) -> Result<u64, EngineError> {
        Ok(self.ledger.mark_all_read(user_id, Utc::now()).await?)
    }

    pub async fn delete_alert(&self, user_id: &str, id: &str) -> Result<(), EngineError> {
        Ok(self.ledger.delete(user_id, id).await?)
    }

    pub async fn bulk_update_alerts(
        &self,
        user_id: &str,
        ids: &[String],
        status: AlertStatus,
    ) -> Result<u64, EngineError> {
        Ok(self
            .ledger
            .bulk_update_status(user_id, ids, status, Utc::now())
            .await?)
    }

    pub async fn bulk_delete_alerts(
        &self,
        user_id: &str,
        ids: &[String],
    ) -> Result<u64, EngineError> {
        Ok(self.ledger.bulk_delete(user_id, ids).await?)
    }

    pub async fn stats(&self, user_id: &str) -> Result<AlertStats, EngineError> {
        let ledger = self.ledger.stats(user_id, Utc::now()).await?;
        let active_rules = self.rules.count_active(user_id).await?;

        Ok(AlertStats {
            total_alerts: ledger.total,
            unread_alerts: ledger.unread,
            active_rules,
            today_alerts: ledger.today,
            delivery_rate: ledger.delivery_rate,
        })
    }

    // ---- preferences -----------------------------------------------------

    pub async fn get_preferences(&self, user_id: &str) -> Result<AlertPreferences, EngineError> {
        Ok(match self.preferences.get(user_id).await? {
            Some(preferences) => preferences,
            None => AlertPreferences::defaults_for(user_id),
        })
    }

    pub async fn update_preferences(
        &self,
        user_id: &str,
        mut preferences: AlertPreferences,
    ) -> Result<AlertPreferences, EngineError> {
        preferences.user_id = user_id.to_string();
        Ok(self.preferences.put(preferences).await?)
    }

    // ---- templates -------------------------------------------------------

    pub fn templates(&self) -> Vec<AlertTemplate> {
        templates::builtin_templates()
    }

    pub async fn create_rule_from_template(
        &self,
        user_id: &str,
        template_id: &str,
        customizations: TemplateCustomizations,
    ) -> Result<AlertRule, EngineError> {
        let template = templates::find_template(template_id)
            .ok_or_else(|| EngineError::NotFound(format!("template {template_id}")))?;
        let request = templates::instantiate(template, customizations);
        self.create_rule(user_id, request).await
    }

    // ---- test cycle ------------------------------------------------------

    /// Force one synthetic evaluation/dispatch cycle for a rule, bypassing
    /// cooldown. The outcome goes straight back to the caller and no alert
    /// is persisted.
    pub async fn test_rule(&self, user_id: &str, id: &str) -> Result<RuleTestReport, EngineError> {
        let rule = self.get_rule(user_id, id).await?;
        let tick = synthetic_tick(&rule);

        let matched = match evaluate::evaluate(&rule.conditions, &tick) {
            Ok(matched) => matched,
            Err(err) => {
                warn!(rule_id = %rule.id, error = %err, "synthetic tick did not cover a condition field");
                false
            }
        };

        let alert = build_alert(&rule, &tick, &self.severity);
        let mut channels = Vec::new();

        if matched {
            for channel in rule.enabled_channels() {
                let Some(sender) = self.dispatcher.sender(channel.kind) else {
                    channels.push(ChannelTestResult {
                        channel: channel.kind,
                        outcome: DeliveryOutcome::Failed,
                        error: Some("no sender registered".to_string()),
                    });
                    continue;
                };

                let result = tokio::time::timeout(
                    self.dispatcher.attempt_timeout(),
                    sender.send(&alert, &channel.config),
                )
                .await;

                channels.push(match result {
                    Ok(Ok(())) => ChannelTestResult {
                        channel: channel.kind,
                        outcome: DeliveryOutcome::Delivered,
                        error: None,
                    },
                    Ok(Err(err)) => ChannelTestResult {
                        channel: channel.kind,
                        outcome: DeliveryOutcome::Failed,
                        error: Some(err.to_string()),
                    },
                    Err(_) => ChannelTestResult {
                        channel: channel.kind,
                        outcome: DeliveryOutcome::Failed,
                        error: Some("attempt timed out".to_string()),
                    },
                });
            }
        }

        Ok(RuleTestReport {
            matched,
            severity: alert.severity,
            message: alert.message,
            channels,
        })
    }
}

fn build_alert(rule: &AlertRule, tick: &MarketTick, severity: &SeverityPolicy) -> Alert {
    let data = AlertData {
        current_price: Some(tick.price),
        previous_price: tick.previous_price,
        change_percent: tick.change_percent,
        volume: tick.volume,
        trade_count: tick.trade_count,
        threshold: rule.conditions.first().map(|c| c.value),
        timeframe: rule.conditions.iter().find_map(|c| c.timeframe),
    };

    let severity = severity.derive(rule.kind, &data);
    let message = message::render(rule.kind, &tick.symbol, &tick.commodity, &data);

    let mut channels: Vec<ChannelKind> = Vec::new();
    for channel in rule.enabled_channels() {
        if !channels.contains(&channel.kind) {
            channels.push(channel.kind);
        }
    }

    Alert {
        id: format!("alr_{}", nanoid::nanoid!(12)),
        rule_id: rule.id.clone(),
        rule_name: rule.name.clone(),
        user_id: rule.user_id.clone(),
        symbol: tick.symbol.clone(),
        commodity: tick.commodity.clone(),
        region: tick.region.clone(),
        kind: rule.kind,
        severity,
        message,
        data,
        status: AlertStatus::Sent,
        channels,
        created_at: Utc::now(),
        delivered_at: None,
        read_at: None,
    }
}

/// A tick constructed to satisfy every condition of the rule, for `/test`.
fn synthetic_tick(rule: &AlertRule) -> MarketTick {
    let symbol = rule
        .conditions
        .iter()
        .find_map(|c| c.symbol.clone())
        .unwrap_or_else(|| "GCXTEST".to_string());
    let region = rule
        .conditions
        .iter()
        .find_map(|c| c.region.clone())
        .unwrap_or_else(|| "Greater Accra".to_string());

    let mut tick = MarketTick {
        symbol,
        commodity: "Test Commodity".to_string(),
        region,
        price: 100.0,
        previous_price: Some(100.0),
        change_percent: Some(0.0),
        volume: Some(0.0),
        trade_count: Some(0),
        timestamp: Utc::now(),
    };

    for condition in &rule.conditions {
        let satisfying = satisfying_value(condition.operator, condition.value);
        match condition.field {
            alert_core::types::ConditionField::Price => tick.price = satisfying,
            alert_core::types::ConditionField::Volume => tick.volume = Some(satisfying),
            alert_core::types::ConditionField::ChangePercent => {
                tick.change_percent = Some(satisfying)
            }
            alert_core::types::ConditionField::TradeCount => {
                tick.trade_count = Some(satisfying.max(0.0) as u32)
            }
        }
    }

    tick
}

fn satisfying_value(operator: ConditionOperator, value: f64) -> f64 {
    match operator {
        ConditionOperator::Gt => value + 1.0,
        ConditionOperator::Gte | ConditionOperator::Eq => value,
        ConditionOperator::Lt => value - 1.0,
        ConditionOperator::Lte => value,
        ConditionOperator::Neq => value + 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alert_core::types::{AlertCondition, ChannelConfig, ConditionField, RuleType};

    fn rule_with(conditions: Vec<AlertCondition>) -> AlertRule {
        AlertRule {
            id: "rul_1".into(),
            user_id: "usr_1".into(),
            name: "maize watch".into(),
            description: None,
            kind: RuleType::Threshold,
            status: RuleStatus::Active,
            conditions,
            channels: vec![AlertChannel {
                kind: ChannelKind::InApp,
                enabled: true,
                config: ChannelConfig::default(),
            }],
            cooldown: 30,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn synthetic_ticks_satisfy_their_rule() {
        let operators = [
            ConditionOperator::Gt,
            ConditionOperator::Gte,
            ConditionOperator::Lt,
            ConditionOperator::Lte,
            ConditionOperator::Eq,
            ConditionOperator::Neq,
        ];

        for operator in operators {
            let rule = rule_with(vec![AlertCondition {
                field: ConditionField::Price,
                operator,
                value: 1800.0,
                symbol: Some("GAPWM2".into()),
                region: None,
                timeframe: None,
            }]);
            let tick = synthetic_tick(&rule);
            assert_eq!(
                evaluate::evaluate(&rule.conditions, &tick),
                Ok(true),
                "operator {operator:?} not satisfied"
            );
        }
    }

    #[test]
    fn built_alerts_snapshot_the_tick_and_rule() {
        let rule = rule_with(vec![AlertCondition {
            field: ConditionField::Price,
            operator: ConditionOperator::Gt,
            value: 1800.0,
            symbol: Some("GAPWM2".into()),
            region: None,
            timeframe: None,
        }]);

        let tick = MarketTick {
            symbol: "GAPWM2".into(),
            commodity: "Maize".into(),
            region: "Greater Accra".into(),
            price: 1880.5,
            previous_price: Some(1795.0),
            change_percent: Some(4.76),
            volume: Some(52_000.0),
            trade_count: Some(18),
            timestamp: Utc::now(),
        };

        let alert = build_alert(&rule, &tick, &SeverityPolicy::default());
        assert_eq!(alert.status, AlertStatus::Sent);
        assert_eq!(alert.data.threshold, Some(1800.0));
        assert_eq!(alert.data.current_price, Some(1880.5));
        assert_eq!(alert.channels, vec![ChannelKind::InApp]);
        assert_eq!(
            alert.message,
            "GAPWM2 (Maize) price is above threshold of 1800"
        );
    }

    #[test]
    fn duplicate_enabled_channels_collapse() {
        let mut rule = rule_with(vec![AlertCondition {
            field: ConditionField::Price,
            operator: ConditionOperator::Gt,
            value: 1.0,
            symbol: None,
            region: None,
            timeframe: None,
        }]);
        rule.channels.push(AlertChannel {
            kind: ChannelKind::InApp,
            enabled: true,
            config: ChannelConfig::default(),
        });

        let tick = synthetic_tick(&rule);
        let alert = build_alert(&rule, &tick, &SeverityPolicy::default());
        assert_eq!(alert.channels, vec![ChannelKind::InApp]);
    }
}
