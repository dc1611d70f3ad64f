//! Built-in alert templates: one-click starting points a user customizes
//! into a rule of their own.

use alert_core::types::{
    AlertChannel, AlertCondition, AlertTemplate, ChannelConfig, ChannelKind, ConditionField,
    ConditionOperator, CreateRuleRequest, RuleType,
};
use serde::Deserialize;

/// Caller overrides applied on top of a template when creating a rule.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateCustomizations {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub conditions: Option<Vec<AlertCondition>>,
    #[serde(default)]
    pub channels: Option<Vec<AlertChannel>>,
    #[serde(default)]
    pub cooldown: Option<u32>,
}

fn in_app_channel() -> AlertChannel {
    AlertChannel {
        kind: ChannelKind::InApp,
        enabled: true,
        config: ChannelConfig::default(),
    }
}

pub fn builtin_templates() -> Vec<AlertTemplate> {
    vec![
        AlertTemplate {
            id: "tmpl_price_threshold".to_string(),
            name: "Price threshold".to_string(),
            description: "Fire when a commodity trades above a price you set".to_string(),
            kind: RuleType::Threshold,
            conditions: vec![AlertCondition {
                field: ConditionField::Price,
                operator: ConditionOperator::Gt,
                value: 1800.0,
                symbol: None,
                region: None,
                timeframe: None,
            }],
            channels: vec![in_app_channel()],
            cooldown: 30,
            is_default: true,
        },
        AlertTemplate {
            id: "tmpl_volume_spike".to_string(),
            name: "Volume spike".to_string(),
            description: "Fire on unusually heavy trading volume over the last hour".to_string(),
            kind: RuleType::Volume,
            conditions: vec![AlertCondition {
                field: ConditionField::Volume,
                operator: ConditionOperator::Gte,
                value: 100_000.0,
                symbol: None,
                region: None,
                timeframe: Some(60),
            }],
            channels: vec![in_app_channel()],
            cooldown: 60,
            is_default: true,
        },
        AlertTemplate {
            id: "tmpl_price_swing".to_string(),
            name: "Daily price swing".to_string(),
            description: "Fire when the day's price moves more than 5%".to_string(),
            kind: RuleType::PriceChange,
            conditions: vec![AlertCondition {
                field: ConditionField::ChangePercent,
                operator: ConditionOperator::Gte,
                value: 5.0,
                symbol: None,
                region: None,
                timeframe: None,
            }],
            channels: vec![in_app_channel()],
            cooldown: 120,
            is_default: true,
        },
        AlertTemplate {
            id: "tmpl_rapid_trading".to_string(),
            name: "Rapid trading pattern".to_string(),
            description: "Fire when trades cluster tightly inside fifteen minutes".to_string(),
            kind: RuleType::Pattern,
            conditions: vec![AlertCondition {
                field: ConditionField::TradeCount,
                operator: ConditionOperator::Gte,
                value: 50.0,
                symbol: None,
                region: None,
                timeframe: Some(15),
            }],
            channels: vec![in_app_channel()],
            cooldown: 30,
            is_default: false,
        },
    ]
}

pub fn find_template(id: &str) -> Option<AlertTemplate> {
    builtin_templates().into_iter().find(|t| t.id == id)
}

/// Merge a template with caller overrides into a create request.
pub fn instantiate(
    template: AlertTemplate,
    customizations: TemplateCustomizations,
) -> CreateRuleRequest {
    CreateRuleRequest {
        name: customizations.name.unwrap_or(template.name),
        description: customizations
            .description
            .or(Some(template.description)),
        kind: template.kind,
        conditions: customizations.conditions.unwrap_or(template.conditions),
        channels: customizations.channels.unwrap_or(template.channels),
        cooldown: customizations.cooldown.unwrap_or(template.cooldown),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_template_would_pass_rule_validation() {
        for template in builtin_templates() {
            let request = instantiate(template, TemplateCustomizations::default());
            assert!(alert_core::validate::validate_create(&request).is_ok());
        }
    }

    #[test]
    fn customizations_override_template_fields() {
        let template = find_template("tmpl_price_threshold").unwrap();
        let request = instantiate(
            template,
            TemplateCustomizations {
                name: Some("Maize above 2000".to_string()),
                cooldown: Some(15),
                ..TemplateCustomizations::default()
            },
        );

        assert_eq!(request.name, "Maize above 2000");
        assert_eq!(request.cooldown, 15);
        assert_eq!(request.kind, RuleType::Threshold);
    }

    #[test]
    fn unknown_template_is_none() {
        assert!(find_template("tmpl_nope").is_none());
    }
}
