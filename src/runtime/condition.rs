/// Trigger condition evaluation
///
/// A workflow's trigger_config may hold a single flat condition:
/// `{ "condition": { "field": "priority", "operator": "equals", "value": "high" } }`.
/// No condition means the workflow fires for every event of its trigger type.

use crate::error::{Error, Result};
use crate::runtime::interpolate::render_value;
use crate::workflow::{ConfigMap, EventContext};
use serde_json::Value;

/// How to treat operators the evaluator does not recognize
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OperatorPolicy {
    /// Raise `UnknownTriggerOperator`
    #[default]
    Strict,
    /// Legacy behaviour: an unknown operator always matches
    Permissive,
}

impl OperatorPolicy {
    pub fn from_permissive_flag(permissive: bool) -> Self {
        if permissive {
            OperatorPolicy::Permissive
        } else {
            OperatorPolicy::Strict
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionOperator {
    Equals,
    NotEquals,
    Contains,
    Unknown(String),
}

impl From<&str> for ConditionOperator {
    fn from(op: &str) -> Self {
        match op {
            "equals" => ConditionOperator::Equals,
            "not_equals" => ConditionOperator::NotEquals,
            "contains" => ConditionOperator::Contains,
            other => ConditionOperator::Unknown(other.to_string()),
        }
    }
}

/// A single field/operator/value predicate
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerCondition {
    pub field: String,
    pub operator: ConditionOperator,
    /// Expected value; `None` when the config omits it
    pub value: Option<Value>,
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => true,
        Value::String(s) => s.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
        _ => false,
    }
}

impl TriggerCondition {
    /// Extract the condition block from a trigger config
    ///
    /// Returns `Ok(None)` when there is no block or it is falsy (`null`,
    /// `false`, `""`, `0`). Any other non-object, or a block lacking a string
    /// `field`/`operator`, is a validation error.
    pub fn from_trigger_config(config: &ConfigMap) -> Result<Option<Self>> {
        let block = match config.get("condition") {
            None => return Ok(None),
            Some(value) if is_falsy(value) => return Ok(None),
            Some(Value::Object(block)) => block,
            Some(other) => {
                return Err(Error::Validation(format!(
                    "trigger_config.condition must be an object, got {}",
                    other
                )))
            }
        };

        let field = block
            .get("field")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Validation("trigger_config.condition.field must be a string".to_string()))?;
        let operator = block
            .get("operator")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Validation("trigger_config.condition.operator must be a string".to_string()))?;

        Ok(Some(Self {
            field: field.to_string(),
            operator: ConditionOperator::from(operator),
            value: block.get("value").cloned(),
        }))
    }

    /// Decide whether the condition holds for `context`
    pub fn evaluate(&self, context: &EventContext, policy: OperatorPolicy) -> Result<bool> {
        let actual = context.get(&self.field);
        let expected = self.value.as_ref();

        match &self.operator {
            ConditionOperator::Equals => Ok(equals(actual, expected)),
            ConditionOperator::NotEquals => Ok(!equals(actual, expected)),
            ConditionOperator::Contains => Ok(contains(actual, expected)),
            ConditionOperator::Unknown(op) => match policy {
                OperatorPolicy::Permissive => {
                    tracing::warn!("⚠️ Unknown condition operator '{}' treated as a match", op);
                    Ok(true)
                }
                OperatorPolicy::Strict => Err(Error::UnknownTriggerOperator(op.clone())),
            },
        }
    }
}

/// Evaluate the trigger config of a workflow against an event context
pub fn should_trigger(config: &ConfigMap, context: &EventContext, policy: OperatorPolicy) -> Result<bool> {
    match TriggerCondition::from_trigger_config(config)? {
        Some(condition) => condition.evaluate(context, policy),
        None => Ok(true),
    }
}

/// Strict equality; an absent value only equals another absent value
fn equals(actual: Option<&Value>, expected: Option<&Value>) -> bool {
    match (actual, expected) {
        (Some(a), Some(b)) => strict_eq(a, b),
        (None, None) => true,
        _ => false,
    }
}

/// Same-type equality with numbers compared by value (1 == 1.0)
fn strict_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// Substring test for strings, membership test for arrays
///
/// Absent and falsy context values (null, false, 0, "") never contain anything.
fn contains(actual: Option<&Value>, expected: Option<&Value>) -> bool {
    let (Some(actual), Some(expected)) = (actual, expected) else {
        return false;
    };

    match actual {
        Value::String(s) if !s.is_empty() => s.contains(render_value(expected).as_str()),
        Value::Array(items) => items.iter().any(|item| strict_eq(item, expected)),
        _ => false,
    }
}
