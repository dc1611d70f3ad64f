//! End-to-end engine tests over the in-memory stores: evaluation, cooldown,
//! dispatch fan-out, lifecycle and stats, with scripted channel providers.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use alert_core::severity::SeverityPolicy;
use alert_core::store::{AlertFilter, AlertLedger, PreferenceStore};
use alert_core::types::{
    Alert, AlertChannel, AlertCondition, AlertData, AlertPreferences, AlertStatus, ChannelConfig,
    ChannelKind, ConditionField, ConditionOperator, CreateRuleRequest, DeliveryOutcome,
    MarketTick, QuietHours, RuleType, Severity,
};
use alert_engine::dispatch::{DispatchConfig, Dispatcher};
use alert_engine::events::EventBus;
use alert_engine::memory::{MemoryAlertLedger, MemoryPreferenceStore, MemoryRuleStore};
use alert_engine::senders::{ChannelSender, InAppSender, SendError};
use alert_engine::service::AlertEngine;
use async_trait::async_trait;
use chrono::Utc;

const USER: &str = "usr_1";

/// A provider stand-in that fails its first `failures` calls and succeeds
/// afterwards.
struct ScriptedSender {
    kind: ChannelKind,
    failures: u32,
    calls: AtomicU32,
}

impl ScriptedSender {
    fn reliable(kind: ChannelKind) -> Arc<Self> {
        Arc::new(Self {
            kind,
            failures: 0,
            calls: AtomicU32::new(0),
        })
    }

    fn failing_first(kind: ChannelKind, failures: u32) -> Arc<Self> {
        Arc::new(Self {
            kind,
            failures,
            calls: AtomicU32::new(0),
        })
    }

    fn broken(kind: ChannelKind) -> Arc<Self> {
        Arc::new(Self {
            kind,
            failures: u32::MAX,
            calls: AtomicU32::new(0),
        })
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChannelSender for ScriptedSender {
    fn kind(&self) -> ChannelKind {
        self.kind
    }

    async fn send(&self, _alert: &Alert, _config: &ChannelConfig) -> Result<(), SendError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call <= self.failures {
            Err(SendError::Provider { status: 503 })
        } else {
            Ok(())
        }
    }
}

struct Harness {
    engine: Arc<AlertEngine>,
    ledger: Arc<MemoryAlertLedger>,
    preferences: Arc<MemoryPreferenceStore>,
}

fn harness(extra_senders: Vec<Arc<dyn ChannelSender>>) -> Harness {
    let rules = Arc::new(MemoryRuleStore::new());
    let ledger = Arc::new(MemoryAlertLedger::new());
    let preferences = Arc::new(MemoryPreferenceStore::new());
    let events = EventBus::new(64);

    let mut senders: Vec<Arc<dyn ChannelSender>> =
        vec![Arc::new(InAppSender::new(events.clone()))];
    senders.extend(extra_senders);

    let dispatcher = Dispatcher::new(
        senders,
        DispatchConfig {
            concurrency: 4,
            attempt_timeout: Duration::from_secs(2),
            retry_backoff: Duration::from_millis(20),
        },
    );

    let engine = Arc::new(AlertEngine::new(
        rules,
        ledger.clone(),
        preferences.clone(),
        dispatcher,
        events,
        SeverityPolicy::default(),
    ));

    Harness {
        engine,
        ledger,
        preferences,
    }
}

fn channel(kind: ChannelKind, enabled: bool) -> AlertChannel {
    AlertChannel {
        kind,
        enabled,
        config: ChannelConfig {
            email: Some("trader@example.com".to_string()),
            phone: Some("+233200000000".to_string()),
            push_token: Some("tok_abc".to_string()),
        },
    }
}

fn price_rule(channels: Vec<AlertChannel>) -> CreateRuleRequest {
    CreateRuleRequest {
        name: "Maize above 1800".to_string(),
        description: None,
        kind: RuleType::Threshold,
        conditions: vec![AlertCondition {
            field: ConditionField::Price,
            operator: ConditionOperator::Gt,
            value: 1800.0,
            symbol: Some("GAPWM2".to_string()),
            region: None,
            timeframe: None,
        }],
        channels,
        cooldown: 30,
    }
}

fn maize_tick(price: f64) -> MarketTick {
    MarketTick {
        symbol: "GAPWM2".to_string(),
        commodity: "Maize".to_string(),
        region: "Greater Accra".to_string(),
        price,
        previous_price: Some(1795.0),
        change_percent: Some(4.76),
        volume: Some(52_000.0),
        trade_count: Some(18),
        timestamp: Utc::now(),
    }
}

async fn wait_for_status(
    ledger: &MemoryAlertLedger,
    id: &str,
    status: AlertStatus,
) -> Alert {
    for _ in 0..300 {
        if let Some(alert) = ledger.get(USER, id).await.unwrap() {
            if alert.status == status {
                return alert;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("alert {id} never reached {status:?}");
}

#[tokio::test]
async fn scenario_threshold_rule_fires_once_with_email_delivery() {
    let email = ScriptedSender::reliable(ChannelKind::Email);
    let h = harness(vec![email.clone()]);

    h.engine
        .create_rule(USER, price_rule(vec![channel(ChannelKind::Email, true)]))
        .await
        .unwrap();

    let fired = h.engine.handle_tick(maize_tick(1880.5)).await.unwrap();
    assert_eq!(fired.len(), 1);

    let alert = &fired[0];
    assert_eq!(
        alert.message,
        "GAPWM2 (Maize) price is above threshold of 1800"
    );
    assert_eq!(alert.severity, Severity::Low);
    assert_eq!(alert.channels, vec![ChannelKind::Email]);
    assert_eq!(alert.data.current_price, Some(1880.5));
    assert_eq!(alert.data.threshold, Some(1800.0));

    let delivered = wait_for_status(&h.ledger, &alert.id, AlertStatus::Delivered).await;
    assert!(delivered.delivered_at.is_some());
    assert_eq!(email.calls(), 1);

    let records = h.ledger.deliveries(&alert.id).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].channel, ChannelKind::Email);
    assert_eq!(records[0].outcome, DeliveryOutcome::Delivered);
    assert_eq!(records[0].attempt, 1);
}

#[tokio::test]
async fn scenario_cooldown_suppresses_the_second_match() {
    let email = ScriptedSender::reliable(ChannelKind::Email);
    let h = harness(vec![email]);

    h.engine
        .create_rule(USER, price_rule(vec![channel(ChannelKind::Email, true)]))
        .await
        .unwrap();

    let first = h.engine.handle_tick(maize_tick(1880.5)).await.unwrap();
    let second = h.engine.handle_tick(maize_tick(1890.0)).await.unwrap();

    assert_eq!(first.len(), 1);
    assert_eq!(second.len(), 0);

    let page = h
        .ledger
        .list(USER, &AlertFilter::default())
        .await
        .unwrap();
    assert_eq!(page.total, 1);
}

#[tokio::test]
async fn scenario_one_failing_channel_does_not_fail_the_alert() {
    let email = ScriptedSender::reliable(ChannelKind::Email);
    let sms = ScriptedSender::broken(ChannelKind::Sms);
    let h = harness(vec![email, sms.clone()]);

    h.engine
        .create_rule(
            USER,
            price_rule(vec![
                channel(ChannelKind::Email, true),
                channel(ChannelKind::Sms, true),
            ]),
        )
        .await
        .unwrap();

    let fired = h.engine.handle_tick(maize_tick(1880.5)).await.unwrap();
    let alert = wait_for_status(&h.ledger, &fired[0].id, AlertStatus::Delivered).await;
    assert_eq!(alert.status, AlertStatus::Delivered);

    // SMS exhausted its retry; two failed attempts on record.
    assert_eq!(sms.calls(), 2);
    let records = h.ledger.deliveries(&alert.id).await.unwrap();
    let sms_records: Vec<_> = records
        .iter()
        .filter(|r| r.channel == ChannelKind::Sms)
        .collect();
    assert_eq!(sms_records.len(), 2);
    assert!(sms_records
        .iter()
        .all(|r| r.outcome == DeliveryOutcome::Failed));
}

#[tokio::test]
async fn scenario_no_enabled_channels_leaves_the_alert_sent() {
    let h = harness(vec![]);

    h.engine
        .create_rule(USER, price_rule(vec![channel(ChannelKind::Email, false)]))
        .await
        .unwrap();

    let fired = h.engine.handle_tick(maize_tick(1880.5)).await.unwrap();
    assert_eq!(fired.len(), 1);
    assert!(fired[0].channels.is_empty());

    tokio::time::sleep(Duration::from_millis(150)).await;
    let alert = h.ledger.get(USER, &fired[0].id).await.unwrap().unwrap();
    assert_eq!(alert.status, AlertStatus::Sent);
    assert!(h.ledger.deliveries(&alert.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn scenario_read_all_clears_every_unread_alert() {
    let h = harness(vec![]);

    for i in 0..5 {
        let alert = Alert {
            id: format!("alr_{i}"),
            rule_id: "rul_1".to_string(),
            rule_name: "maize watch".to_string(),
            user_id: USER.to_string(),
            symbol: "GAPWM2".to_string(),
            commodity: "Maize".to_string(),
            region: "Greater Accra".to_string(),
            kind: RuleType::Threshold,
            severity: Severity::Low,
            message: "test".to_string(),
            data: AlertData::default(),
            status: if i % 2 == 0 {
                AlertStatus::Sent
            } else {
                AlertStatus::Delivered
            },
            channels: vec![],
            created_at: Utc::now(),
            delivered_at: None,
            read_at: None,
        };
        h.ledger.insert(&alert).await.unwrap();
    }

    let marked = h.engine.mark_all_alerts_read(USER).await.unwrap();
    assert_eq!(marked, 5);

    let stats = h.engine.stats(USER).await.unwrap();
    assert_eq!(stats.unread_alerts, 0);
    assert_eq!(stats.total_alerts, 5);

    // Read is terminal: repeating the sweep changes nothing.
    assert_eq!(h.engine.mark_all_alerts_read(USER).await.unwrap(), 0);
}

#[tokio::test]
async fn a_failed_attempt_is_retried_once_then_succeeds() {
    let email = ScriptedSender::failing_first(ChannelKind::Email, 1);
    let h = harness(vec![email.clone()]);

    h.engine
        .create_rule(USER, price_rule(vec![channel(ChannelKind::Email, true)]))
        .await
        .unwrap();

    let fired = h.engine.handle_tick(maize_tick(1880.5)).await.unwrap();
    let alert = wait_for_status(&h.ledger, &fired[0].id, AlertStatus::Delivered).await;

    assert_eq!(email.calls(), 2);
    let records = h.ledger.deliveries(&alert.id).await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].outcome, DeliveryOutcome::Failed);
    assert_eq!(records[1].outcome, DeliveryOutcome::Delivered);
    assert_eq!(records[1].attempt, 2);
}

#[tokio::test]
async fn a_channel_that_keeps_failing_fails_the_alert_after_two_attempts() {
    let email = ScriptedSender::broken(ChannelKind::Email);
    let h = harness(vec![email.clone()]);

    h.engine
        .create_rule(USER, price_rule(vec![channel(ChannelKind::Email, true)]))
        .await
        .unwrap();

    let fired = h.engine.handle_tick(maize_tick(1880.5)).await.unwrap();
    let alert = wait_for_status(&h.ledger, &fired[0].id, AlertStatus::Failed).await;

    // One retry, then terminal; never a third call.
    assert_eq!(email.calls(), 2);
    assert!(alert.delivered_at.is_none());
}

#[tokio::test]
async fn a_bad_tick_skips_only_the_rule_that_needs_the_missing_field() {
    let email = ScriptedSender::reliable(ChannelKind::Email);
    let h = harness(vec![email]);

    let mut trade_rule = price_rule(vec![channel(ChannelKind::Email, true)]);
    trade_rule.name = "busy tape".to_string();
    trade_rule.kind = RuleType::Pattern;
    trade_rule.conditions = vec![AlertCondition {
        field: ConditionField::TradeCount,
        operator: ConditionOperator::Gte,
        value: 10.0,
        symbol: Some("GAPWM2".to_string()),
        region: None,
        timeframe: Some(15),
    }];
    h.engine.create_rule(USER, trade_rule).await.unwrap();
    h.engine
        .create_rule(USER, price_rule(vec![channel(ChannelKind::Email, true)]))
        .await
        .unwrap();

    let mut tick = maize_tick(1880.5);
    tick.trade_count = None;

    let fired = h.engine.handle_tick(tick).await.unwrap();
    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0].kind, RuleType::Threshold);
}

#[tokio::test]
async fn deleting_a_rule_mid_flight_does_not_lose_the_alert() {
    let email = ScriptedSender::failing_first(ChannelKind::Email, 1);
    let h = harness(vec![email]);

    let rule = h
        .engine
        .create_rule(USER, price_rule(vec![channel(ChannelKind::Email, true)]))
        .await
        .unwrap();

    let fired = h.engine.handle_tick(maize_tick(1880.5)).await.unwrap();
    assert_eq!(fired.len(), 1);

    // Delete while the retry backoff is still pending.
    h.engine.delete_rule(USER, &rule.id).await.unwrap();

    let alert = wait_for_status(&h.ledger, &fired[0].id, AlertStatus::Delivered).await;
    assert!(alert.delivered_at.is_some());

    // Future ticks no longer evaluate against the deleted rule.
    let later = h.engine.handle_tick(maize_tick(1990.0)).await.unwrap();
    assert!(later.is_empty());
}

#[tokio::test]
async fn globally_disabled_preferences_attempt_nothing() {
    let email = ScriptedSender::reliable(ChannelKind::Email);
    let h = harness(vec![email.clone()]);

    let mut prefs = AlertPreferences::defaults_for(USER);
    prefs.global_enabled = false;
    h.preferences.put(prefs).await.unwrap();

    h.engine
        .create_rule(USER, price_rule(vec![channel(ChannelKind::Email, true)]))
        .await
        .unwrap();

    let fired = h.engine.handle_tick(maize_tick(1880.5)).await.unwrap();
    assert_eq!(fired.len(), 1);

    tokio::time::sleep(Duration::from_millis(150)).await;
    let alert = h.ledger.get(USER, &fired[0].id).await.unwrap().unwrap();
    assert_eq!(alert.status, AlertStatus::Sent);
    assert_eq!(email.calls(), 0);
}

#[tokio::test]
async fn quiet_hours_defer_email_but_never_in_app() {
    let email = ScriptedSender::reliable(ChannelKind::Email);
    let h = harness(vec![email.clone()]);

    // A window that brackets "now" by an hour on each side.
    let now = Utc::now();
    let mut prefs = AlertPreferences::defaults_for(USER);
    prefs.quiet_hours = QuietHours {
        enabled: true,
        start: (now - chrono::Duration::hours(1)).format("%H:%M").to_string(),
        end: (now + chrono::Duration::hours(1)).format("%H:%M").to_string(),
        timezone: "UTC".to_string(),
    };
    h.preferences.put(prefs).await.unwrap();

    let mut in_app_rule = price_rule(vec![channel(ChannelKind::InApp, true)]);
    in_app_rule.name = "in-app watch".to_string();
    h.engine.create_rule(USER, in_app_rule).await.unwrap();
    h.engine
        .create_rule(USER, price_rule(vec![channel(ChannelKind::Email, true)]))
        .await
        .unwrap();

    let fired = h.engine.handle_tick(maize_tick(1880.5)).await.unwrap();
    assert_eq!(fired.len(), 2);

    let in_app_alert = fired
        .iter()
        .find(|a| a.channels == vec![ChannelKind::InApp])
        .unwrap();
    let email_alert = fired
        .iter()
        .find(|a| a.channels == vec![ChannelKind::Email])
        .unwrap();

    // In-app ignores quiet hours entirely.
    wait_for_status(&h.ledger, &in_app_alert.id, AlertStatus::Delivered).await;

    // Email is queued for the window's end, not dropped and not sent yet.
    tokio::time::sleep(Duration::from_millis(200)).await;
    let deferred = h.ledger.get(USER, &email_alert.id).await.unwrap().unwrap();
    assert_eq!(deferred.status, AlertStatus::Sent);
    assert_eq!(email.calls(), 0);
}

#[tokio::test]
async fn lifecycle_never_moves_backwards() {
    let h = harness(vec![]);

    let alert = Alert {
        id: "alr_lifecycle".to_string(),
        rule_id: "rul_1".to_string(),
        rule_name: "maize watch".to_string(),
        user_id: USER.to_string(),
        symbol: "GAPWM2".to_string(),
        commodity: "Maize".to_string(),
        region: "Greater Accra".to_string(),
        kind: RuleType::Threshold,
        severity: Severity::Low,
        message: "test".to_string(),
        data: AlertData::default(),
        status: AlertStatus::Sent,
        channels: vec![ChannelKind::Email],
        created_at: Utc::now(),
        delivered_at: None,
        read_at: None,
    };
    h.ledger.insert(&alert).await.unwrap();

    let read = h.engine.mark_alert_read(USER, "alr_lifecycle").await.unwrap();
    assert_eq!(read.status, AlertStatus::Read);

    // A late delivery finalization must not rewind a read alert.
    let changed = h
        .ledger
        .advance_status("alr_lifecycle", AlertStatus::Delivered, Utc::now())
        .await
        .unwrap();
    assert!(!changed);
    let after = h.ledger.get(USER, "alr_lifecycle").await.unwrap().unwrap();
    assert_eq!(after.status, AlertStatus::Read);

    // Marking read twice is a quiet no-op.
    let again = h.engine.mark_alert_read(USER, "alr_lifecycle").await.unwrap();
    assert_eq!(again.status, AlertStatus::Read);
}

#[tokio::test]
async fn test_cycle_reports_outcomes_without_persisting() {
    let sms = ScriptedSender::broken(ChannelKind::Sms);
    let h = harness(vec![sms]);

    let rule = h
        .engine
        .create_rule(USER, price_rule(vec![channel(ChannelKind::Sms, true)]))
        .await
        .unwrap();

    let report = h.engine.test_rule(USER, &rule.id).await.unwrap();
    assert!(report.matched);
    assert_eq!(
        report.message,
        "GAPWM2 (Test Commodity) price is above threshold of 1800"
    );
    assert_eq!(report.channels.len(), 1);
    assert_eq!(report.channels[0].outcome, DeliveryOutcome::Failed);

    // Nothing persisted: no alerts, no delivery records.
    let page = h
        .ledger
        .list(USER, &AlertFilter::default())
        .await
        .unwrap();
    assert_eq!(page.total, 0);

    // And the real cooldown is untouched: a genuine tick still fires.
    let fired = h.engine.handle_tick(maize_tick(1880.5)).await.unwrap();
    assert_eq!(fired.len(), 1);
}

#[tokio::test]
async fn stats_delivery_rate_counts_only_attempted_alerts() {
    let email = ScriptedSender::reliable(ChannelKind::Email);
    let h = harness(vec![email]);

    h.engine
        .create_rule(USER, price_rule(vec![channel(ChannelKind::Email, true)]))
        .await
        .unwrap();
    let mut silent_rule = price_rule(vec![channel(ChannelKind::Sms, false)]);
    silent_rule.name = "silent watch".to_string();
    h.engine.create_rule(USER, silent_rule).await.unwrap();

    let fired = h.engine.handle_tick(maize_tick(1880.5)).await.unwrap();
    assert_eq!(fired.len(), 2);

    let attempted = fired.iter().find(|a| !a.channels.is_empty()).unwrap();
    wait_for_status(&h.ledger, &attempted.id, AlertStatus::Delivered).await;

    let stats = h.engine.stats(USER).await.unwrap();
    assert_eq!(stats.total_alerts, 2);
    assert_eq!(stats.active_rules, 2);
    assert_eq!(stats.today_alerts, 2);
    // The channel-less alert is excluded from the rate's denominator.
    assert_eq!(stats.delivery_rate, 100.0);
}

#[tokio::test]
async fn validation_rejects_bad_rules_with_every_violation() {
    let h = harness(vec![]);

    let request = CreateRuleRequest {
        name: " ".to_string(),
        description: None,
        kind: RuleType::Threshold,
        conditions: vec![],
        channels: vec![],
        cooldown: 0,
    };

    let err = h.engine.create_rule(USER, request).await.unwrap_err();
    match err {
        alert_engine::EngineError::Validation(validation) => {
            assert_eq!(validation.violations.len(), 3);
        }
        other => panic!("expected validation error, got {other}"),
    }

    let page = h.engine.list_rules(USER).await.unwrap();
    assert!(page.is_empty());
}
