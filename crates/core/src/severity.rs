//! Severity derivation for fired alerts.
//!
//! The bucket cutoffs are an engine policy, not a market fact. Severity is
//! monotone in the relative deviation `|actual - reference| / |reference|`,
//! where the reference is the rule's threshold value. Defaults:
//!
//! * ratio <  0.05          -> low
//! * 0.05 <= ratio < 0.15   -> medium
//! * 0.15 <= ratio < 0.30   -> high
//! * ratio >= 0.30          -> critical
//!
//! Percent-change rules without a usable reference fall back to the change
//! magnitude over 100, so an 8% move lands in the same scale.

use serde::{Deserialize, Serialize};

use crate::types::{AlertData, RuleType, Severity};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeverityPolicy {
    pub medium: f64,
    pub high: f64,
    pub critical: f64,
}

impl Default for SeverityPolicy {
    fn default() -> Self {
        Self {
            medium: 0.05,
            high: 0.15,
            critical: 0.30,
        }
    }
}

impl SeverityPolicy {
    pub fn classify(&self, ratio: f64) -> Severity {
        if ratio >= self.critical {
            Severity::Critical
        } else if ratio >= self.high {
            Severity::High
        } else if ratio >= self.medium {
            Severity::Medium
        } else {
            Severity::Low
        }
    }

    /// Severity for a fired rule from its triggering snapshot.
    pub fn derive(&self, kind: RuleType, data: &AlertData) -> Severity {
        self.classify(deviation_ratio(kind, data))
    }
}

/// Relative deviation of the triggering value from the rule's threshold.
/// Missing data never panics; it degrades to zero deviation (low severity).
fn deviation_ratio(kind: RuleType, data: &AlertData) -> f64 {
    let actual = match kind {
        RuleType::Threshold => data.current_price,
        RuleType::Pattern => data.trade_count.map(f64::from),
        RuleType::Volume => data.volume,
        RuleType::PriceChange => data.change_percent,
    };

    let Some(actual) = actual else { return 0.0 };

    match data.threshold {
        Some(reference) if reference != 0.0 => (actual - reference).abs() / reference.abs(),
        _ if kind == RuleType::PriceChange => actual.abs() / 100.0,
        _ => 0.0,
    }
}
