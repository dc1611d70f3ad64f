//! Priority scoring for alert listings.
//!
//! The score is a sort key only; it is never persisted. Weights: severity
//! (critical 100 / high 75 / medium 50 / low 25), type (threshold 20 /
//! pattern 15 / volume 10 / price_change 5), +30 while unread, and a
//! recency bonus (25 under an hour, 15 under a day, 5 under a week).

use chrono::{DateTime, Utc};

use crate::types::{Alert, AlertStatus, RuleType, Severity};

pub fn score(alert: &Alert, now: DateTime<Utc>) -> i64 {
    let mut score = match alert.severity {
        Severity::Critical => 100,
        Severity::High => 75,
        Severity::Medium => 50,
        Severity::Low => 25,
    };

    score += match alert.kind {
        RuleType::Threshold => 20,
        RuleType::Pattern => 15,
        RuleType::Volume => 10,
        RuleType::PriceChange => 5,
    };

    if matches!(alert.status, AlertStatus::Sent | AlertStatus::Delivered) {
        score += 30;
    }

    let age_hours = (now - alert.created_at).num_minutes() as f64 / 60.0;
    if age_hours < 1.0 {
        score += 25;
    } else if age_hours < 24.0 {
        score += 15;
    } else if age_hours < 168.0 {
        score += 5;
    }

    score
}

/// Highest score first; equal scores break toward the newest alert.
pub fn sort_by_priority(alerts: &mut [Alert], now: DateTime<Utc>) {
    alerts.sort_by(|a, b| {
        score(b, now)
            .cmp(&score(a, now))
            .then(b.created_at.cmp(&a.created_at))
    });
}
