//! Rule validation. All violations are collected and reported together so a
//! caller can surface every problem in one round trip.

use crate::error::{ValidationError, Violation};
use crate::types::{AlertChannel, AlertCondition, AlertRule, CreateRuleRequest};

pub fn validate_create(request: &CreateRuleRequest) -> Result<(), ValidationError> {
    validate_parts(&request.name, &request.conditions, &request.channels)
}

pub fn validate_rule(rule: &AlertRule) -> Result<(), ValidationError> {
    validate_parts(&rule.name, &rule.conditions, &rule.channels)
}

fn validate_parts(
    name: &str,
    conditions: &[AlertCondition],
    channels: &[AlertChannel],
) -> Result<(), ValidationError> {
    let mut violations = Vec::new();

    if name.trim().is_empty() {
        violations.push(Violation::new("name", "Rule name is required"));
    }

    if conditions.is_empty() {
        violations.push(Violation::new(
            "conditions",
            "At least one condition is required",
        ));
    }
    for (index, condition) in conditions.iter().enumerate() {
        if !condition.value.is_finite() {
            violations.push(Violation::new(
                format!("conditions[{index}].value"),
                "Condition value must be a finite number",
            ));
        }
        if let Some(timeframe) = condition.timeframe {
            if timeframe < 1 {
                violations.push(Violation::new(
                    format!("conditions[{index}].timeframe"),
                    "Timeframe must be at least 1 minute",
                ));
            }
        }
    }

    if channels.is_empty() {
        violations.push(Violation::new(
            "channels",
            "At least one delivery channel is required",
        ));
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ValidationError { violations })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        ChannelConfig, ChannelKind, ConditionField, ConditionOperator, RuleType,
    };

    fn valid_request() -> CreateRuleRequest {
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
            channels: vec![AlertChannel {
                kind: ChannelKind::Email,
                enabled: true,
                config: ChannelConfig {
                    email: Some("trader@example.com".to_string()),
                    ..ChannelConfig::default()
                },
            }],
            cooldown: 30,
        }
    }

    #[test]
    fn a_well_formed_rule_passes() {
        assert!(validate_create(&valid_request()).is_ok());
    }

    #[test]
    fn all_violations_are_reported_together() {
        let mut request = valid_request();
        request.name = "   ".to_string();
        request.conditions.clear();
        request.channels.clear();

        let err = validate_create(&request).unwrap_err();
        let fields: Vec<_> = err.violations.iter().map(|v| v.field.as_str()).collect();
        assert_eq!(fields, vec!["name", "conditions", "channels"]);
    }

    #[test]
    fn zero_timeframe_is_rejected_with_its_index() {
        let mut request = valid_request();
        request.conditions[0].timeframe = Some(0);

        let err = validate_create(&request).unwrap_err();
        assert_eq!(err.violations.len(), 1);
        assert_eq!(err.violations[0].field, "conditions[0].timeframe");
    }

    #[test]
    fn non_finite_values_are_rejected() {
        let mut request = valid_request();
        request.conditions[0].value = f64::NAN;

        let err = validate_create(&request).unwrap_err();
        assert_eq!(err.violations[0].field, "conditions[0].value");
    }
}
