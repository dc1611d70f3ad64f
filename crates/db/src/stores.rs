//! Postgres adapters for the engine's storage ports.

use alert_core::error::StoreError;
use alert_core::store::{AlertFilter, AlertLedger, AlertPage, LedgerStats, PreferenceStore, RuleStore};
use alert_core::types::{Alert, AlertPreferences, AlertRule, AlertStatus, DeliveryRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::queries;

#[derive(Clone)]
pub struct PgRuleStore {
    pool: PgPool,
}

impl PgRuleStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RuleStore for PgRuleStore {
    async fn create(&self, rule: AlertRule) -> Result<AlertRule, StoreError> {
        queries::rules::create(&self.pool, &rule)
            .await
            .map_err(StoreError::backend)?
            .into_domain()
    }

    async fn update(&self, rule: AlertRule) -> Result<AlertRule, StoreError> {
        match queries::rules::update(&self.pool, &rule)
            .await
            .map_err(StoreError::backend)?
        {
            Some(row) => row.into_domain(),
            None => Err(StoreError::NotFound(format!("rule {}", rule.id))),
        }
    }

    async fn delete(&self, user_id: &str, id: &str) -> Result<(), StoreError> {
        let deleted = queries::rules::delete(&self.pool, user_id, id)
            .await
            .map_err(StoreError::backend)?;
        if deleted == 0 {
            return Err(StoreError::NotFound(format!("rule {id}")));
        }
        Ok(())
    }

    async fn get(&self, user_id: &str, id: &str) -> Result<Option<AlertRule>, StoreError> {
        queries::rules::get(&self.pool, user_id, id)
            .await
            .map_err(StoreError::backend)?
            .map(|row| row.into_domain())
            .transpose()
    }

    async fn list(&self, user_id: &str) -> Result<Vec<AlertRule>, StoreError> {
        queries::rules::list(&self.pool, user_id)
            .await
            .map_err(StoreError::backend)?
            .into_iter()
            .map(|row| row.into_domain())
            .collect()
    }

    async fn list_active(&self) -> Result<Vec<AlertRule>, StoreError> {
        queries::rules::list_active(&self.pool)
            .await
            .map_err(StoreError::backend)?
            .into_iter()
            .map(|row| row.into_domain())
            .collect()
    }

    async fn count_active(&self, user_id: &str) -> Result<u64, StoreError> {
        let count = queries::rules::count_active(&self.pool, user_id)
            .await
            .map_err(StoreError::backend)?;
        Ok(count.max(0) as u64)
    }
}

#[derive(Clone)]
pub struct PgAlertLedger {
    pool: PgPool,
}

impl PgAlertLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AlertLedger for PgAlertLedger {
    async fn insert(&self, alert: &Alert) -> Result<(), StoreError> {
        queries::alerts::insert(&self.pool, alert)
            .await
            .map_err(StoreError::backend)
    }

    async fn get(&self, user_id: &str, id: &str) -> Result<Option<Alert>, StoreError> {
        queries::alerts::get(&self.pool, user_id, id)
            .await
            .map_err(StoreError::backend)?
            .map(|row| row.into_domain())
            .transpose()
    }

    async fn list(&self, user_id: &str, filter: &AlertFilter) -> Result<AlertPage, StoreError> {
        let rows = queries::alerts::list(&self.pool, user_id, filter)
            .await
            .map_err(StoreError::backend)?;
        let total = queries::alerts::count(&self.pool, user_id, filter)
            .await
            .map_err(StoreError::backend)?
            .max(0) as u64;

        let alerts = rows
            .into_iter()
            .map(|row| row.into_domain())
            .collect::<Result<Vec<_>, _>>()?;

        let limit = u64::from(filter.limit.clamp(1, 100));
        Ok(AlertPage {
            alerts,
            total,
            page: filter.page.max(1),
            total_pages: total.div_ceil(limit) as u32,
        })
    }

    async fn advance_status(
        &self,
        id: &str,
        status: AlertStatus,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let changed = queries::alerts::advance_status(&self.pool, id, status, at)
            .await
            .map_err(StoreError::backend)?;
        Ok(changed > 0)
    }

    async fn mark_read(
        &self,
        user_id: &str,
        id: &str,
        at: DateTime<Utc>,
    ) -> Result<Alert, StoreError> {
        match queries::alerts::mark_read(&self.pool, user_id, id, at)
            .await
            .map_err(StoreError::backend)?
        {
            Some(row) => row.into_domain(),
            None => Err(StoreError::NotFound(format!("alert {id}"))),
        }
    }

    async fn mark_all_read(&self, user_id: &str, at: DateTime<Utc>) -> Result<u64, StoreError> {
        queries::alerts::mark_all_read(&self.pool, user_id, at)
            .await
            .map_err(StoreError::backend)
    }

    async fn delete(&self, user_id: &str, id: &str) -> Result<(), StoreError> {
        let deleted = queries::alerts::delete(&self.pool, user_id, id)
            .await
            .map_err(StoreError::backend)?;
        if deleted == 0 {
            return Err(StoreError::NotFound(format!("alert {id}")));
        }
        Ok(())
    }

    async fn bulk_update_status(
        &self,
        user_id: &str,
        ids: &[String],
        status: AlertStatus,
        at: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        queries::alerts::bulk_update_status(&self.pool, user_id, ids, status, at)
            .await
            .map_err(StoreError::backend)
    }

    async fn bulk_delete(&self, user_id: &str, ids: &[String]) -> Result<u64, StoreError> {
        queries::alerts::bulk_delete(&self.pool, user_id, ids)
            .await
            .map_err(StoreError::backend)
    }

    async fn record_delivery(&self, record: &DeliveryRecord) -> Result<(), StoreError> {
        queries::deliveries::insert(&self.pool, record)
            .await
            .map_err(StoreError::backend)
    }

    async fn deliveries(&self, alert_id: &str) -> Result<Vec<DeliveryRecord>, StoreError> {
        Ok(queries::deliveries::list_for_alert(&self.pool, alert_id)
            .await
            .map_err(StoreError::backend)?
            .into_iter()
            .map(|row| row.into_domain())
            .collect())
    }

    async fn stats(&self, user_id: &str, now: DateTime<Utc>) -> Result<LedgerStats, StoreError> {
        let today_start = now
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc())
            .unwrap_or(now);
        let row = queries::alerts::stats(&self.pool, user_id, today_start)
            .await
            .map_err(StoreError::backend)?;

        let attempted = row.attempted.max(0) as u64;
        let delivered = row.delivered.max(0) as u64;
        let delivery_rate = if attempted == 0 {
            100.0
        } else {
            delivered as f64 / attempted as f64 * 100.0
        };

        Ok(LedgerStats {
            total: row.total.max(0) as u64,
            unread: row.unread.max(0) as u64,
            today: row.today.max(0) as u64,
            delivery_rate,
        })
    }
}

#[derive(Clone)]
pub struct PgPreferenceStore {
    pool: PgPool,
}

impl PgPreferenceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PreferenceStore for PgPreferenceStore {
    async fn get(&self, user_id: &str) -> Result<Option<AlertPreferences>, StoreError> {
        queries::preferences::get(&self.pool, user_id)
            .await
            .map_err(StoreError::backend)?
            .map(|row| row.into_domain())
            .transpose()
    }

    async fn put(&self, preferences: AlertPreferences) -> Result<AlertPreferences, StoreError> {
        queries::preferences::upsert(&self.pool, &preferences)
            .await
            .map_err(StoreError::backend)?
            .into_domain()
    }
}
