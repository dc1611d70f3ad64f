//! Notification fan-out.
//!
//! Every enabled channel of a fired alert becomes an independent task on a
//! bounded worker pool. A slow or failing provider affects only its own
//! channel: attempts are timed out individually, retried once after a fixed
//! backoff, and recorded per attempt in the ledger.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use alert_core::store::AlertLedger;
use alert_core::types::{
    Alert, AlertChannel, AlertPreferences, AlertStatus, ChannelKind, DeliveryOutcome,
    DeliveryRecord, QuietHours,
};
use chrono::{DateTime, Duration, FixedOffset, NaiveTime, Offset, Utc};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, warn};

use crate::senders::ChannelSender;

#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Concurrent channel sends across all alerts.
    pub concurrency: usize,
    /// Per-attempt budget against a provider.
    pub attempt_timeout: StdDuration,
    /// Pause before the single retry of a failed attempt.
    pub retry_backoff: StdDuration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            concurrency: 8,
            attempt_timeout: StdDuration::from_secs(10),
            retry_backoff: StdDuration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChannelOutcome {
    pub channel: ChannelKind,
    pub outcome: DeliveryOutcome,
    pub attempts: u32,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DispatchSummary {
    pub outcomes: Vec<ChannelOutcome>,
    /// `None` when nothing was attempted; the alert stays `sent`.
    pub final_status: Option<AlertStatus>,
}

pub struct Dispatcher {
    senders: HashMap<ChannelKind, Arc<dyn ChannelSender>>,
    limiter: Arc<Semaphore>,
    config: DispatchConfig,
}

impl Dispatcher {
    pub fn new(senders: Vec<Arc<dyn ChannelSender>>, config: DispatchConfig) -> Self {
        let limiter = Arc::new(Semaphore::new(config.concurrency.max(1)));
        let senders = senders.into_iter().map(|s| (s.kind(), s)).collect();
        Self {
            senders,
            limiter,
            config,
        }
    }

    pub fn sender(&self, kind: ChannelKind) -> Option<&Arc<dyn ChannelSender>> {
        self.senders.get(&kind)
    }

    pub fn attempt_timeout(&self) -> StdDuration {
        self.config.attempt_timeout
    }

    /// Fan an alert out to its enabled channels and wait for every channel
    /// to settle. The caller applies `final_status` to the ledger.
    pub async fn dispatch(
        &self,
        ledger: Arc<dyn AlertLedger>,
        alert: &Alert,
        channels: &[AlertChannel],
        preferences: &AlertPreferences,
    ) -> DispatchSummary {
        if !preferences.global_enabled {
            debug!(alert_id = %alert.id, "notifications globally disabled, nothing attempted");
            return DispatchSummary {
                outcomes: vec![],
                final_status: None,
            };
        }

        let now = Utc::now();
        let mut tasks: JoinSet<ChannelOutcome> = JoinSet::new();

        for channel in channels.iter().filter(|c| c.enabled) {
            let Some(sender) = self.senders.get(&channel.kind) else {
                warn!(alert_id = %alert.id, channel = ?channel.kind, "no sender registered");
                continue;
            };

            // Quiet hours defer delivery to the window's end; in-app goes
            // out immediately no matter what.
            let defer = if channel.kind == ChannelKind::InApp {
                None
            } else {
                quiet_hours_delay(&preferences.quiet_hours, now)
            };

            tasks.spawn(run_channel(
                Arc::clone(sender),
                Arc::clone(&self.limiter),
                Arc::clone(&ledger),
                alert.clone(),
                channel.config.clone(),
                defer,
                self.config.attempt_timeout,
                self.config.retry_backoff,
            ));
        }

        let mut outcomes = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(err) => warn!(alert_id = %alert.id, error = %err, "delivery task panicked"),
            }
        }

        let final_status = aggregate_status(&outcomes);
        DispatchSummary {
            outcomes,
            final_status,
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_channel(
    sender: Arc<dyn ChannelSender>,
    limiter: Arc<Semaphore>,
    ledger: Arc<dyn AlertLedger>,
    alert: Alert,
    config: alert_core::types::ChannelConfig,
    defer: Option<StdDuration>,
    attempt_timeout: StdDuration,
    retry_backoff: StdDuration,
) -> ChannelOutcome {
    if let Some(delay) = defer {
        debug!(
            alert_id = %alert.id,
            channel = ?sender.kind(),
            delay_secs = delay.as_secs(),
            "deferring delivery until quiet hours end"
        );
        sleep(delay).await;
    }

    let _permit = limiter.acquire_owned().await.ok();

    let mut last_error = None;
    for attempt in 1..=2u32 {
        let started = Instant::now();
        let result = timeout(attempt_timeout, sender.send(&alert, &config)).await;
        let latency_ms = started.elapsed().as_millis() as i64;

        let error = match result {
            Ok(Ok(())) => None,
            Ok(Err(err)) => Some(err.to_string()),
            Err(_) => Some(format!(
                "attempt timed out after {}s",
                attempt_timeout.as_secs()
            )),
        };

        let record = DeliveryRecord {
            id: format!("del_{}", nanoid::nanoid!(12)),
            alert_id: alert.id.clone(),
            channel: sender.kind(),
            attempt,
            outcome: if error.is_none() {
                DeliveryOutcome::Delivered
            } else {
                DeliveryOutcome::Failed
            },
            error: error.clone(),
            latency_ms: Some(latency_ms),
            created_at: Utc::now(),
        };
        if let Err(err) = ledger.record_delivery(&record).await {
            warn!(alert_id = %alert.id, error = %err, "failed to record delivery attempt");
        }

        match error {
            None => {
                return ChannelOutcome {
                    channel: sender.kind(),
                    outcome: DeliveryOutcome::Delivered,
                    attempts: attempt,
                    error: None,
                }
            }
            Some(err) => {
                warn!(
                    alert_id = %alert.id,
                    channel = ?sender.kind(),
                    attempt,
                    error = %err,
                    "delivery attempt failed"
                );
                last_error = Some(err);
                if attempt == 1 {
                    sleep(retry_backoff).await;
                }
            }
        }
    }

    ChannelOutcome {
        channel: sender.kind(),
        outcome: DeliveryOutcome::Failed,
        attempts: 2,
        error: last_error,
    }
}

/// Overall alert status from the per-channel results: delivered if anything
/// got through, failed only when every attempted channel failed, untouched
/// when nothing was attempted.
pub fn aggregate_status(outcomes: &[ChannelOutcome]) -> Option<AlertStatus> {
    if outcomes.is_empty() {
        None
    } else if outcomes
        .iter()
        .any(|o| o.outcome == DeliveryOutcome::Delivered)
    {
        Some(AlertStatus::Delivered)
    } else {
        Some(AlertStatus::Failed)
    }
}

/// How long a delivery must wait out the user's quiet window, or `None`
/// when it may go now. Deliveries are deferred, never dropped.
pub fn quiet_hours_delay(quiet: &QuietHours, now: DateTime<Utc>) -> Option<StdDuration> {
    if !quiet.enabled {
        return None;
    }
    let start = parse_hhmm(&quiet.start)?;
    let end = parse_hhmm(&quiet.end)?;
    if start == end {
        return None;
    }

    let offset = parse_utc_offset(&quiet.timezone);
    let time = now.with_timezone(&offset).time();

    let in_window = if start < end {
        time >= start && time < end
    } else {
        // Window wraps midnight, e.g. 22:00 - 06:00.
        time >= start || time < end
    };
    if !in_window {
        return None;
    }

    let until_end = if time < end {
        end - time
    } else {
        Duration::hours(24) - (time - end)
    };
    until_end.to_std().ok()
}

fn parse_hhmm(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").ok()
}

/// Fixed-offset timezones only: "UTC", "GMT", "UTC+5", "UTC+05:30",
/// "+03:00", "-04:00". Anything else falls back to UTC.
fn parse_utc_offset(timezone: &str) -> FixedOffset {
    try_parse_utc_offset(timezone).unwrap_or_else(|| Utc.fix())
}

fn try_parse_utc_offset(timezone: &str) -> Option<FixedOffset> {
    let trimmed = timezone.trim();
    let rest = trimmed
        .strip_prefix("UTC")
        .or_else(|| trimmed.strip_prefix("GMT"))
        .unwrap_or(trimmed);
    if rest.is_empty() {
        return Some(Utc.fix());
    }

    let (sign, digits) = match rest.strip_prefix('+') {
        Some(digits) => (1i32, digits),
        None => (-1i32, rest.strip_prefix('-')?),
    };
    let (hours, minutes) = match digits.split_once(':') {
        Some((h, m)) => (h.parse::<i32>().ok()?, m.parse::<i32>().ok()?),
        None => (digits.parse::<i32>().ok()?, 0),
    };
    if !(0..=14).contains(&hours) || !(0..60).contains(&minutes) {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}
