//! In-memory implementations of the storage ports.
//!
//! These back the test suites and local development; production wiring
//! injects the Postgres adapters from the db crate instead. Behavior must
//! stay in lockstep with those adapters, the lifecycle guard included.

use std::collections::HashMap;

use alert_core::error::StoreError;
use alert_core::store::{
    AlertFilter, AlertLedger, AlertPage, LedgerStats, PreferenceStore, RuleStore,
};
use alert_core::types::{Alert, AlertPreferences, AlertRule, AlertStatus, DeliveryRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

#[derive(Default)]
pub struct MemoryRuleStore {
    rules: RwLock<HashMap<String, AlertRule>>,
}

impl MemoryRuleStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RuleStore for MemoryRuleStore {
    async fn create(&self, rule: AlertRule) -> Result<AlertRule, StoreError> {
        self.rules
            .write()
            .await
            .insert(rule.id.clone(), rule.clone());
        Ok(rule)
    }

    async fn update(&self, rule: AlertRule) -> Result<AlertRule, StoreError> {
        let mut rules = self.rules.write().await;
        match rules.get(&rule.id) {
            Some(existing) if existing.user_id == rule.user_id => {
                rules.insert(rule.id.clone(), rule.clone());
                Ok(rule)
            }
            _ => Err(StoreError::NotFound(format!("rule {}", rule.id))),
        }
    }

    async fn delete(&self, user_id: &str, id: &str) -> Result<(), StoreError> {
        let mut rules = self.rules.write().await;
        match rules.get(id) {
            Some(existing) if existing.user_id == user_id => {
                rules.remove(id);
                Ok(())
            }
            _ => Err(StoreError::NotFound(format!("rule {id}"))),
        }
    }

    async fn get(&self, user_id: &str, id: &str) -> Result<Option<AlertRule>, StoreError> {
        Ok(self
            .rules
            .read()
            .await
            .get(id)
            .filter(|rule| rule.user_id == user_id)
            .cloned())
    }

    async fn list(&self, user_id: &str) -> Result<Vec<AlertRule>, StoreError> {
        let mut rules: Vec<_> = self
            .rules
            .read()
            .await
            .values()
            .filter(|rule| rule.user_id == user_id)
            .cloned()
            .collect();
        rules.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rules)
    }

    async fn list_active(&self) -> Result<Vec<AlertRule>, StoreError> {
        Ok(self
            .rules
            .read()
            .await
            .values()
            .filter(|rule| rule.status == alert_core::types::RuleStatus::Active)
            .cloned()
            .collect())
    }

    async fn count_active(&self, user_id: &str) -> Result<u64, StoreError> {
        Ok(self
            .rules
            .read()
            .await
            .values()
            .filter(|rule| {
                rule.user_id == user_id && rule.status == alert_core::types::RuleStatus::Active
            })
            .count() as u64)
    }
}

#[derive(Default)]
pub struct MemoryAlertLedger {
    alerts: RwLock<HashMap<String, Alert>>,
    deliveries: RwLock<Vec<DeliveryRecord>>,
}

impl MemoryAlertLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

fn apply_transition(alert: &mut Alert, status: AlertStatus, at: DateTime<Utc>) -> bool {
    if !alert.status.can_advance_to(status) {
        return false;
    }
    alert.status = status;
    match status {
        AlertStatus::Delivered => alert.delivered_at = Some(at),
        AlertStatus::Read => alert.read_at = Some(at),
        AlertStatus::Sent | AlertStatus::Failed => {}
    }
    true
}

#[async_trait]
impl AlertLedger for MemoryAlertLedger {
    async fn insert(&self, alert: &Alert) -> Result<(), StoreError> {
        self.alerts
            .write()
            .await
            .insert(alert.id.clone(), alert.clone());
        Ok(())
    }

    async fn get(&self, user_id: &str, id: &str) -> Result<Option<Alert>, StoreError> {
        Ok(self
            .alerts
            .read()
            .await
            .get(id)
            .filter(|alert| alert.user_id == user_id)
            .cloned())
    }

    async fn list(&self, user_id: &str, filter: &AlertFilter) -> Result<AlertPage, StoreError> {
        let mut matching: Vec<_> = self
            .alerts
            .read()
            .await
            .values()
            .filter(|alert| alert.user_id == user_id && filter.matches(alert))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = matching.len() as u64;
        let limit = filter.limit.clamp(1, 100) as usize;
        let page = filter.page.max(1);
        let start = (page as usize - 1) * limit;
        let alerts = matching.into_iter().skip(start).take(limit).collect();

        Ok(AlertPage {
            alerts,
            total,
            page,
            total_pages: total.div_ceil(limit as u64) as u32,
        })
    }

    async fn advance_status(
        &self,
        id: &str,
        status: AlertStatus,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut alerts = self.alerts.write().await;
        match alerts.get_mut(id) {
            Some(alert) => Ok(apply_transition(alert, status, at)),
            None => Ok(false),
        }
    }

    async fn mark_read(
        &self,
        user_id: &str,
        id: &str,
        at: DateTime<Utc>,
    ) -> Result<Alert, StoreError> {
        let mut alerts = self.alerts.write().await;
        match alerts.get_mut(id) {
            Some(alert) if alert.user_id == user_id => {
                apply_transition(alert, AlertStatus::Read, at);
                Ok(alert.clone())
            }
            _ => Err(StoreError::NotFound(format!("alert {id}"))),
        }
    }

    async fn mark_all_read(&self, user_id: &str, at: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut alerts = self.alerts.write().await;
        let mut changed = 0;
        for alert in alerts.values_mut() {
            if alert.user_id == user_id && apply_transition(alert, AlertStatus::Read, at) {
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn delete(&self, user_id: &str, id: &str) -> Result<(), StoreError> {
        let mut alerts = self.alerts.write().await;
        match alerts.get(id) {
            Some(alert) if alert.user_id == user_id => {
                alerts.remove(id);
                Ok(())
            }
            _ => Err(StoreError::NotFound(format!("alert {id}"))),
        }
    }

    async fn bulk_update_status(
        &self,
        user_id: &str,
        ids: &[String],
        status: AlertStatus,
        at: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let mut alerts = self.alerts.write().await;
        let mut changed = 0;
        for id in ids {
            if let Some(alert) = alerts.get_mut(id) {
                if alert.user_id == user_id && apply_transition(alert, status, at) {
                    changed += 1;
                }
            }
        }
        Ok(changed)
    }

    async fn bulk_delete(&self, user_id: &str, ids: &[String]) -> Result<u64, StoreError> {
        let mut alerts = self.alerts.write().await;
        let mut removed = 0;
        for id in ids {
            if alerts.get(id).is_some_and(|a| a.user_id == user_id) {
                alerts.remove(id);
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn record_delivery(&self, record: &DeliveryRecord) -> Result<(), StoreError> {
        self.deliveries.write().await.push(record.clone());
        Ok(())
    }

    async fn deliveries(&self, alert_id: &str) -> Result<Vec<DeliveryRecord>, StoreError> {
        Ok(self
            .deliveries
            .read()
            .await
            .iter()
            .filter(|record| record.alert_id == alert_id)
            .cloned()
            .collect())
    }

    async fn stats(&self, user_id: &str, now: DateTime<Utc>) -> Result<LedgerStats, StoreError> {
        let today_start = now
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc())
            .unwrap_or(now);

        let alerts = self.alerts.read().await;
        let mine: Vec<_> = alerts.values().filter(|a| a.user_id == user_id).collect();

        let total = mine.len() as u64;
        let unread = mine.iter().filter(|a| a.status != AlertStatus::Read).count() as u64;
        let today = mine
            .iter()
            .filter(|a| a.created_at >= today_start)
            .count() as u64;
        let attempted = mine.iter().filter(|a| !a.channels.is_empty()).count() as u64;
        let delivered = mine.iter().filter(|a| a.delivered_at.is_some()).count() as u64;

        let delivery_rate = if attempted == 0 {
            100.0
        } else {
            delivered as f64 / attempted as f64 * 100.0
        };

        Ok(LedgerStats {
            total,
            unread,
            today,
            delivery_rate,
        })
    }
}

#[derive(Default)]
pub struct MemoryPreferenceStore {
    preferences: RwLock<HashMap<String, AlertPreferences>>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PreferenceStore for MemoryPreferenceStore {
    async fn get(&self, user_id: &str) -> Result<Option<AlertPreferences>, StoreError> {
        Ok(self.preferences.read().await.get(user_id).cloned())
    }

    async fn put(&self, preferences: AlertPreferences) -> Result<AlertPreferences, StoreError> {
        self.preferences
            .write()
            .await
            .insert(preferences.user_id.clone(), preferences.clone());
        Ok(preferences)
    }
}
