//! Storage ports. The engine only ever sees these traits; Postgres adapters
//! live in the db crate and the test suite injects in-memory versions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::types::{Alert, AlertPreferences, AlertRule, AlertStatus, DeliveryRecord, RuleType};

/// Listing filter for the alert ledger. `page` is 1-based.
#[derive(Debug, Clone)]
pub struct AlertFilter {
    pub status: Option<AlertStatus>,
    pub kind: Option<RuleType>,
    pub symbol: Option<String>,
    pub region: Option<String>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub page: u32,
    pub limit: u32,
}

impl Default for AlertFilter {
    fn default() -> Self {
        Self {
            status: None,
            kind: None,
            symbol: None,
            region: None,
            date_from: None,
            date_to: None,
            page: 1,
            limit: 20,
        }
    }
}

impl AlertFilter {
    pub fn matches(&self, alert: &Alert) -> bool {
        if let Some(status) = self.status {
            if alert.status != status {
                return false;
            }
        }
        if let Some(kind) = self.kind {
            if alert.kind != kind {
                return false;
            }
        }
        if let Some(symbol) = self.symbol.as_deref() {
            if alert.symbol != symbol {
                return false;
            }
        }
        if let Some(region) = self.region.as_deref() {
            if alert.region != region {
                return false;
            }
        }
        if let Some(from) = self.date_from {
            if alert.created_at < from {
                return false;
            }
        }
        if let Some(to) = self.date_to {
            if alert.created_at > to {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone)]
pub struct AlertPage {
    pub alerts: Vec<Alert>,
    pub total: u64,
    pub page: u32,
    pub total_pages: u32,
}

/// Ledger-derived counters; the service layer adds the rule count on top.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LedgerStats {
    pub total: u64,
    pub unread: u64,
    pub today: u64,
    pub delivery_rate: f64,
}

#[async_trait]
pub trait RuleStore: Send + Sync {
    async fn create(&self, rule: AlertRule) -> Result<AlertRule, StoreError>;
    /// Full replacement of an existing rule; `NotFound` when the id is unknown.
    async fn update(&self, rule: AlertRule) -> Result<AlertRule, StoreError>;
    async fn delete(&self, user_id: &str, id: &str) -> Result<(), StoreError>;
    async fn get(&self, user_id: &str, id: &str) -> Result<Option<AlertRule>, StoreError>;
    async fn list(&self, user_id: &str) -> Result<Vec<AlertRule>, StoreError>;
    /// Every active rule across users; the per-tick evaluation set.
    async fn list_active(&self) -> Result<Vec<AlertRule>, StoreError>;
    async fn count_active(&self, user_id: &str) -> Result<u64, StoreError>;
}

#[async_trait]
pub trait AlertLedger: Send + Sync {
    async fn insert(&self, alert: &Alert) -> Result<(), StoreError>;
    async fn get(&self, user_id: &str, id: &str) -> Result<Option<Alert>, StoreError>;
    async fn list(&self, user_id: &str, filter: &AlertFilter) -> Result<AlertPage, StoreError>;
    /// Forward-only status transition (see `AlertStatus::can_advance_to`).
    /// Returns whether anything changed; repeating a transition is a no-op,
    /// never an error. Sets `deliveredAt`/`readAt` alongside the status.
    async fn advance_status(
        &self,
        id: &str,
        status: AlertStatus,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;
    async fn mark_read(&self, user_id: &str, id: &str, at: DateTime<Utc>)
        -> Result<Alert, StoreError>;
    async fn mark_all_read(&self, user_id: &str, at: DateTime<Utc>) -> Result<u64, StoreError>;
    async fn delete(&self, user_id: &str, id: &str) -> Result<(), StoreError>;
    async fn bulk_update_status(
        &self,
        user_id: &str,
        ids: &[String],
        status: AlertStatus,
        at: DateTime<Utc>,
    ) -> Result<u64, StoreError>;
    async fn bulk_delete(&self, user_id: &str, ids: &[String]) -> Result<u64, StoreError>;
    async fn record_delivery(&self, record: &DeliveryRecord) -> Result<(), StoreError>;
    async fn deliveries(&self, alert_id: &str) -> Result<Vec<DeliveryRecord>, StoreError>;
    async fn stats(&self, user_id: &str, now: DateTime<Utc>) -> Result<LedgerStats, StoreError>;
}

#[async_trait]
pub trait PreferenceStore: Send + Sync {
    async fn get(&self, user_id: &str) -> Result<Option<AlertPreferences>, StoreError>;
    async fn put(&self, preferences: AlertPreferences) -> Result<AlertPreferences, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AlertData, Severity};

    fn alert(symbol: &str, status: AlertStatus) -> Alert {
        Alert {
            id: "alr_1".into(),
            rule_id: "rul_1".into(),
            rule_name: "r".into(),
            user_id: "usr_1".into(),
            symbol: symbol.into(),
            commodity: "Maize".into(),
            region: "Greater Accra".into(),
            kind: RuleType::Threshold,
            severity: Severity::Low,
            message: String::new(),
            data: AlertData::default(),
            status,
            channels: vec![],
            created_at: Utc::now(),
            delivered_at: None,
            read_at: None,
        }
    }

    #[test]
    fn default_filter_matches_everything() {
        let filter = AlertFilter::default();
        assert!(filter.matches(&alert("GAPWM2", AlertStatus::Sent)));
        assert_eq!(filter.page, 1);
        assert_eq!(filter.limit, 20);
    }

    #[test]
    fn filters_compose_conjunctively() {
        let filter = AlertFilter {
            status: Some(AlertStatus::Sent),
            symbol: Some("GAPWM2".into()),
            ..AlertFilter::default()
        };
        assert!(filter.matches(&alert("GAPWM2", AlertStatus::Sent)));
        assert!(!filter.matches(&alert("GAPWM2", AlertStatus::Read)));
        assert!(!filter.matches(&alert("GSRIW1", AlertStatus::Sent)));
    }

    #[test]
    fn date_bounds_are_inclusive() {
        let a = alert("GAPWM2", AlertStatus::Sent);
        let filter = AlertFilter {
            date_from: Some(a.created_at),
            date_to: Some(a.created_at),
            ..AlertFilter::default()
        };
        assert!(filter.matches(&a));
    }
}
