//! Generic field conditions: field + operator + value triples.
//!
//! Comparison semantics are strict per field type — no coercion across
//! types. A mismatched type is a configuration error, reported, never
//! auto-converted and never silently passed.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::fields::{ConditionFieldRegistry, FieldType, Operator, operators_for};
use crate::error::{AdmitrError, Result};

/// A condition expressed against a record field rather than one of the
/// fixed trigger types.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldCondition {
    pub field: String,
    pub operator: Operator,
    /// Expected value. For `between` an array of two values, for
    /// `in_list` an array of candidates.
    pub value: Value,
}

impl FieldCondition {
    pub fn new(field: &str, operator: Operator, value: Value) -> Self {
        Self {
            field: field.to_string(),
            operator,
            value,
        }
    }

    /// Check this condition against the registry: the field must exist,
    /// the operator must be legal for its type, and the expected value
    /// must have the right shape.
    pub fn validate(&self, registry: &ConditionFieldRegistry) -> Result<()> {
        let field = registry.require_field(&self.field)?;

        if !registry.is_operator_legal(field.field_type, self.operator) {
            return Err(AdmitrError::TriggerConfig(format!(
                "operator {} is not legal for {} field {}",
                self.operator,
                type_name(field.field_type),
                self.field
            )));
        }

        // Emptiness checks compare against nothing
        if matches!(self.operator, Operator::IsEmpty | Operator::IsNotEmpty) {
            return Ok(());
        }

        match self.operator {
            Operator::Between => {
                expect_pair(&self.value)?;
            }
            Operator::InList => {
                if !self.value.is_array() {
                    return Err(AdmitrError::TriggerConfig(
                        "in_list requires an array of candidates".to_string(),
                    ));
                }
            }
            _ => {
                check_value_type(field.field_type, &self.value, "expected value")?;
            }
        }

        // Select fields only accept catalogued options
        if field.field_type == FieldType::Select
            && matches!(self.operator, Operator::Equals | Operator::NotEquals)
            && let Some(s) = self.value.as_str()
            && !field.options.contains(&s)
        {
            return Err(AdmitrError::TriggerConfig(format!(
                "{} is not a valid option for select field {}",
                s, self.field
            )));
        }

        Ok(())
    }

    /// Evaluate this condition against the record's actual field value.
    ///
    /// A missing value satisfies only `is_empty` — everything else is
    /// "requirement not found ⇒ condition not met".
    pub fn evaluate(&self, field_type: FieldType, actual: Option<&Value>) -> Result<bool> {
        if !operators_for(field_type).contains(&self.operator) {
            return Err(AdmitrError::TriggerConfig(format!(
                "operator {} is not legal for {} field {}",
                self.operator,
                type_name(field_type),
                self.field
            )));
        }

        let empty = is_empty(actual);
        match self.operator {
            Operator::IsEmpty => return Ok(empty),
            Operator::IsNotEmpty => return Ok(!empty),
            _ => {}
        }

        let Some(actual) = actual.filter(|v| !v.is_null()) else {
            return Ok(false);
        };

        match field_type {
            FieldType::Text => self.evaluate_text(actual),
            FieldType::Number => self.evaluate_number(actual),
            FieldType::Date => self.evaluate_date(actual),
            FieldType::Boolean => self.evaluate_boolean(actual),
            FieldType::Select => self.evaluate_select(actual),
            FieldType::Array => self.evaluate_array(actual),
        }
    }

    fn evaluate_text(&self, actual: &Value) -> Result<bool> {
        let a = expect_text(actual, &self.field)?;
        let e = expect_text(&self.value, "expected value")?;
        Ok(match self.operator {
            Operator::Equals => a == e,
            Operator::NotEquals => a != e,
            Operator::Contains => a.contains(e),
            Operator::NotContains => !a.contains(e),
            Operator::StartsWith => a.starts_with(e),
            Operator::EndsWith => a.ends_with(e),
            _ => unreachable!("legality checked above"),
        })
    }

    fn evaluate_number(&self, actual: &Value) -> Result<bool> {
        let a = expect_number(actual, &self.field)?;
        Ok(match self.operator {
            Operator::Equals => a == expect_number(&self.value, "expected value")?,
            Operator::NotEquals => a != expect_number(&self.value, "expected value")?,
            Operator::GreaterThan => a > expect_number(&self.value, "expected value")?,
            Operator::LessThan => a < expect_number(&self.value, "expected value")?,
            Operator::Between => {
                let (lo, hi) = expect_pair(&self.value)?;
                let lo = expect_number(lo, "lower bound")?;
                let hi = expect_number(hi, "upper bound")?;
                a >= lo && a <= hi
            }
            _ => unreachable!("legality checked above"),
        })
    }

    fn evaluate_date(&self, actual: &Value) -> Result<bool> {
        let a = parse_date(expect_text(actual, &self.field)?)?;
        Ok(match self.operator {
            Operator::Equals => a == parse_date(expect_text(&self.value, "expected value")?)?,
            Operator::NotEquals => a != parse_date(expect_text(&self.value, "expected value")?)?,
            Operator::GreaterThan => a > parse_date(expect_text(&self.value, "expected value")?)?,
            Operator::LessThan => a < parse_date(expect_text(&self.value, "expected value")?)?,
            Operator::Between => {
                let (lo, hi) = expect_pair(&self.value)?;
                let lo = parse_date(expect_text(lo, "lower bound")?)?;
                let hi = parse_date(expect_text(hi, "upper bound")?)?;
                a >= lo && a <= hi
            }
            _ => unreachable!("legality checked above"),
        })
    }

    fn evaluate_boolean(&self, actual: &Value) -> Result<bool> {
        let a = actual.as_bool().ok_or_else(|| {
            AdmitrError::TriggerConfig(format!("field {} is not a boolean", self.field))
        })?;
        let e = self.value.as_bool().ok_or_else(|| {
            AdmitrError::TriggerConfig("expected value is not a boolean".to_string())
        })?;
        Ok(match self.operator {
            Operator::Equals => a == e,
            Operator::NotEquals => a != e,
            _ => unreachable!("legality checked above"),
        })
    }

    fn evaluate_select(&self, actual: &Value) -> Result<bool> {
        let a = expect_text(actual, &self.field)?;
        Ok(match self.operator {
            Operator::Equals => a == expect_text(&self.value, "expected value")?,
            Operator::NotEquals => a != expect_text(&self.value, "expected value")?,
            Operator::InList => {
                let candidates = self.value.as_array().ok_or_else(|| {
                    AdmitrError::TriggerConfig(
                        "in_list requires an array of candidates".to_string(),
                    )
                })?;
                candidates.iter().any(|c| c.as_str() == Some(a))
            }
            _ => unreachable!("legality checked above"),
        })
    }

    fn evaluate_array(&self, actual: &Value) -> Result<bool> {
        let items = actual.as_array().ok_or_else(|| {
            AdmitrError::TriggerConfig(format!("field {} is not an array", self.field))
        })?;
        Ok(match self.operator {
            Operator::Contains => items.contains(&self.value),
            Operator::NotContains => !items.contains(&self.value),
            _ => unreachable!("legality checked above"),
        })
    }
}

fn check_value_type(field_type: FieldType, value: &Value, what: &str) -> Result<()> {
    let ok = match field_type {
        FieldType::Text | FieldType::Select => value.is_string(),
        FieldType::Date => value.as_str().is_some_and(|s| parse_date(s).is_ok()),
        FieldType::Number => value.is_number(),
        FieldType::Boolean => value.is_boolean(),
        // Array contains-checks compare against a scalar element
        FieldType::Array => !value.is_null(),
    };
    if ok {
        Ok(())
    } else {
        Err(AdmitrError::TriggerConfig(format!(
            "{} does not match {} field type",
            what,
            type_name(field_type)
        )))
    }
}

fn type_name(field_type: FieldType) -> &'static str {
    match field_type {
        FieldType::Text => "text",
        FieldType::Number => "number",
        FieldType::Date => "date",
        FieldType::Boolean => "boolean",
        FieldType::Select => "select",
        FieldType::Array => "array",
    }
}

fn is_empty(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Array(a)) => a.is_empty(),
        Some(_) => false,
    }
}

fn expect_text<'a>(value: &'a Value, what: &str) -> Result<&'a str> {
    value
        .as_str()
        .ok_or_else(|| AdmitrError::TriggerConfig(format!("{} is not text", what)))
}

fn expect_number(value: &Value, what: &str) -> Result<f64> {
    value
        .as_f64()
        .ok_or_else(|| AdmitrError::TriggerConfig(format!("{} is not a number", what)))
}

fn expect_pair(value: &Value) -> Result<(&Value, &Value)> {
    match value.as_array().map(|a| a.as_slice()) {
        Some([lo, hi]) => Ok((lo, hi)),
        _ => Err(AdmitrError::TriggerConfig(
            "between requires an array of exactly two values".to_string(),
        )),
    }
}

/// Parse an RFC 3339 timestamp or a plain `YYYY-MM-DD` date (midnight UTC).
fn parse_date(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        // Dates without a time component compare at midnight UTC
        return Ok(date.and_time(NaiveTime::MIN).and_utc());
    }
    Err(AdmitrError::TriggerConfig(format!(
        "{} is not a valid date (expected RFC 3339 or YYYY-MM-DD)",
        s
    )))
}
