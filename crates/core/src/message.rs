//! Human-readable alert messages, one sentence per rule type.
//!
//! Missing snapshot fields fall back to a generic per-type sentence rather
//! than failing: a fired alert always gets a message.

use crate::types::{AlertData, RuleType};

pub fn render(kind: RuleType, symbol: &str, commodity: &str, data: &AlertData) -> String {
    match kind {
        RuleType::Threshold => match (data.current_price, data.threshold) {
            (Some(current), Some(threshold)) => {
                let direction = if current > threshold { "above" } else { "below" };
                format!("{symbol} ({commodity}) price is {direction} threshold of {threshold}")
            }
            _ => fallback(kind, symbol, commodity),
        },
        RuleType::Pattern => match (data.trade_count, data.timeframe) {
            (Some(trades), Some(timeframe)) => {
                format!("{symbol} ({commodity}) detected {trades} trades in {timeframe} minutes")
            }
            _ => fallback(kind, symbol, commodity),
        },
        RuleType::Volume => match data.volume {
            Some(volume) => format!("{symbol} ({commodity}) volume spike detected: {volume}"),
            None => fallback(kind, symbol, commodity),
        },
        RuleType::PriceChange => match data.change_percent {
            Some(change) if change != 0.0 => {
                let direction = if change > 0.0 { "increased" } else { "decreased" };
                format!(
                    "{symbol} ({commodity}) price {direction} by {:.2}%",
                    change.abs()
                )
            }
            _ => fallback(kind, symbol, commodity),
        },
    }
}

fn fallback(kind: RuleType, symbol: &str, commodity: &str) -> String {
    format!("{symbol} ({commodity}) {} alert triggered", kind.label())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_message_states_the_direction() {
        let data = AlertData {
            current_price: Some(1880.5),
            threshold: Some(1800.0),
            ..AlertData::default()
        };
        assert_eq!(
            render(RuleType::Threshold, "GAPWM2", "Maize", &data),
            "GAPWM2 (Maize) price is above threshold of 1800"
        );

        let data = AlertData {
            current_price: Some(1750.0),
            threshold: Some(1800.0),
            ..AlertData::default()
        };
        assert_eq!(
            render(RuleType::Threshold, "GAPWM2", "Maize", &data),
            "GAPWM2 (Maize) price is below threshold of 1800"
        );
    }

    #[test]
    fn pattern_message_reports_the_window() {
        let data = AlertData {
            trade_count: Some(57),
            timeframe: Some(15),
            ..AlertData::default()
        };
        assert_eq!(
            render(RuleType::Pattern, "GSRIW1", "Rice", &data),
            "GSRIW1 (Rice) detected 57 trades in 15 minutes"
        );
    }

    #[test]
    fn volume_message_includes_the_spike() {
        let data = AlertData {
            volume: Some(125_000.0),
            ..AlertData::default()
        };
        assert_eq!(
            render(RuleType::Volume, "GSRIW1", "Rice", &data),
            "GSRIW1 (Rice) volume spike detected: 125000"
        );
    }

    #[test]
    fn price_change_direction_follows_the_sign() {
        let data = AlertData {
            change_percent: Some(-8.0),
            ..AlertData::default()
        };
        assert_eq!(
            render(RuleType::PriceChange, "GSSBW1", "Soybeans", &data),
            "GSSBW1 (Soybeans) price decreased by 8.00%"
        );

        let data = AlertData {
            change_percent: Some(3.456),
            ..AlertData::default()
        };
        assert_eq!(
            render(RuleType::PriceChange, "GSSBW1", "Soybeans", &data),
            "GSSBW1 (Soybeans) price increased by 3.46%"
        );
    }

    #[test]
    fn missing_data_never_panics() {
        let empty = AlertData::default();
        assert_eq!(
            render(RuleType::Threshold, "GAPWM2", "Maize", &empty),
            "GAPWM2 (Maize) threshold alert triggered"
        );
        assert_eq!(
            render(RuleType::Pattern, "GAPWM2", "Maize", &empty),
            "GAPWM2 (Maize) pattern alert triggered"
        );
        assert_eq!(
            render(RuleType::Volume, "GAPWM2", "Maize", &empty),
            "GAPWM2 (Maize) volume alert triggered"
        );
        assert_eq!(
            render(RuleType::PriceChange, "GAPWM2", "Maize", &empty),
            "GAPWM2 (Maize) price change alert triggered"
        );
    }
}
