//! Per-rule cooldown gate.
//!
//! Holds the last-fired timestamp per rule and decides, atomically, whether
//! a new match may fire. The check and the timestamp write happen under one
//! short-lived lock so two concurrently-matching ticks can never both pass.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};

#[derive(Debug, Default)]
pub struct CooldownTracker {
    last_fired: Mutex<HashMap<String, DateTime<Utc>>>,
}

/// Outcome of a cooldown check. When `allowed` is false the caller must not
/// create an alert; `next_eligible_at` says when the rule opens up again.
#[derive(Debug, Clone)]
pub struct FireDecision {
    pub allowed: bool,
    pub next_eligible_at: DateTime<Utc>,
    stamped: DateTime<Utc>,
    previous: Option<DateTime<Utc>>,
}

impl CooldownTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check-and-set: if the rule is outside its cooldown window, record
    /// `now` as its last fire time in the same critical section.
    pub fn try_fire(&self, rule_id: &str, cooldown_minutes: u32, now: DateTime<Utc>) -> FireDecision {
        let cooldown = Duration::minutes(i64::from(cooldown_minutes));
        let mut last_fired = self
            .last_fired
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        match last_fired.get(rule_id).copied() {
            Some(last) if now - last < cooldown => FireDecision {
                allowed: false,
                next_eligible_at: last + cooldown,
                stamped: now,
                previous: Some(last),
            },
            previous => {
                last_fired.insert(rule_id.to_string(), now);
                FireDecision {
                    allowed: true,
                    next_eligible_at: now + cooldown,
                    stamped: now,
                    previous,
                }
            }
        }
    }

    /// Undo a successful `try_fire` whose alert could not be durably
    /// recorded, so the suppression window does not hide an unrecorded
    /// match. A no-op if another fire has since overwritten the entry.
    pub fn revert(&self, rule_id: &str, decision: &FireDecision) {
        if !decision.allowed {
            return;
        }
        let mut last_fired = self
            .last_fired
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if last_fired.get(rule_id) == Some(&decision.stamped) {
            match decision.previous {
                Some(previous) => last_fired.insert(rule_id.to_string(), previous),
                None => last_fired.remove(rule_id),
            };
        }
    }
}
