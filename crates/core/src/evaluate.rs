//! Pure condition evaluation: a rule's conditions against one market tick.
//!
//! Evaluation is deterministic and side-effect free. The same conditions and
//! the same tick always produce the same answer.

use thiserror::Error;

use crate::types::{AlertCondition, ConditionField, ConditionOperator, MarketTick};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvaluateError {
    /// A condition references a field the tick did not supply. The caller
    /// skips this rule for this tick only; other rules keep evaluating.
    #[error("tick is missing field {0:?}")]
    MissingField(ConditionField),
}

/// Evaluate the conjunction of `conditions` against `tick`.
///
/// All conditions must hold independently. An empty list never matches:
/// validation rejects rules without conditions, but the engine must not
/// treat a slipped-through empty rule as match-everything.
pub fn evaluate(conditions: &[AlertCondition], tick: &MarketTick) -> Result<bool, EvaluateError> {
    if conditions.is_empty() {
        return Ok(false);
    }

    for condition in conditions {
        if !matches_scope(condition, tick) {
            return Ok(false);
        }

        let actual = field_value(condition.field, tick)
            .ok_or(EvaluateError::MissingField(condition.field))?;

        if !compare(condition.operator, actual, condition.value) {
            return Ok(false);
        }
    }

    Ok(true)
}

/// Scope restriction: a set symbol/region must equal the tick's; absent means wildcard.
fn matches_scope(condition: &AlertCondition, tick: &MarketTick) -> bool {
    if let Some(symbol) = condition.symbol.as_deref() {
        if symbol != tick.symbol {
            return false;
        }
    }
    if let Some(region) = condition.region.as_deref() {
        if region != tick.region {
            return false;
        }
    }
    true
}

/// The tick value a condition field reads. Aggregates over a timeframe
/// (volume delta, trade count) arrive precomputed on the tick, so every
/// field is just a number here.
fn field_value(field: ConditionField, tick: &MarketTick) -> Option<f64> {
    match field {
        ConditionField::Price => Some(tick.price),
        ConditionField::Volume => tick.volume,
        ConditionField::ChangePercent => tick.change_percent,
        ConditionField::TradeCount => tick.trade_count.map(f64::from),
    }
}

/// Exact numeric comparison, no epsilon.
fn compare(operator: ConditionOperator, actual: f64, value: f64) -> bool {
    match operator {
        ConditionOperator::Gt => actual > value,
        ConditionOperator::Gte => actual >= value,
        ConditionOperator::Lt => actual < value,
        ConditionOperator::Lte => actual <= value,
        ConditionOperator::Eq => actual == value,
        ConditionOperator::Neq => actual != value,
    }
}
