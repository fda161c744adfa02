use std::cmp::Ordering;

use serde_json::{Map, Number, Value};

use super::error::FilterError;
use super::types::{Condition, FilterOp};
use crate::database::document::{get_path, Document};

pub struct FilterWhere {
    param_values: Vec<Value>,
    param_index: usize,
}

impl FilterWhere {
    pub fn new(starting_param_index: usize) -> Self {
        Self {
            param_values: vec![],
            param_index: starting_param_index,
        }
    }

    /// Rewrite every bare comparison keyword (`gt`, `gte`, `lt`, `lte`, `in`) used as an
    /// object key into the store's operator syntax (`$gt`, ...), at any depth.
    pub fn translate(raw: &Value) -> Value {
        match raw {
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(key, value)| {
                        let key = match FilterOp::from_keyword(key) {
                            Some(op) => op.operator().to_string(),
                            None => key.clone(),
                        };
                        (key, Self::translate(value))
                    })
                    .collect(),
            ),
            Value::Array(items) => Value::Array(items.iter().map(Self::translate).collect()),
            other => other.clone(),
        }
    }

    /// Turn a translated filter document into typed conditions
    pub fn parse(translated: &Value) -> Result<Vec<Condition>, FilterError> {
        let obj = match translated {
            Value::Null => return Ok(vec![]),
            Value::Object(obj) => obj,
            _ => return Err(FilterError::InvalidWhereClause("filter must be an object".to_string())),
        };

        let mut conditions = Vec::with_capacity(obj.len());
        for (field, value) in obj {
            if field.starts_with('$') {
                return Err(FilterError::UnsupportedOperator(format!("{} requires a field", field)));
            }
            validate_field(field)?;
            match value {
                Value::Object(ops) if ops.keys().any(|k| k.starts_with('$')) => {
                    Self::parse_operators(field, ops, &mut conditions)?;
                }
                // Implicit equality: { field: value }
                other => conditions.push(Condition::new(field.as_str(), FilterOp::Eq, other.clone())),
            }
        }
        Ok(conditions)
    }

    fn parse_operators(field: &str, ops: &Map<String, Value>, out: &mut Vec<Condition>) -> Result<(), FilterError> {
        for (op_key, op_value) in ops {
            let op = FilterOp::from_operator(op_key)
                .ok_or_else(|| FilterError::UnsupportedOperator(op_key.clone()))?;
            let data = match (op, op_value) {
                (FilterOp::In, Value::Array(items)) => Value::Array(items.clone()),
                (FilterOp::In, Value::String(s)) => {
                    Value::Array(s.split(',').map(|part| coerce_scalar(part.trim())).collect())
                }
                (FilterOp::In, other) => Value::Array(vec![other.clone()]),
                (_, Value::Array(_)) | (_, Value::Object(_)) => {
                    return Err(FilterError::InvalidOperatorData(format!(
                        "{} on '{}' requires a scalar value",
                        op.operator(),
                        field
                    )));
                }
                (_, other) => other.clone(),
            };
            out.push(Condition::new(field, op, data));
        }
        Ok(())
    }

    /// Build a parameterized WHERE clause over the `data` JSONB column
    pub fn generate(conditions: &[Condition], starting_param_index: usize) -> Result<(String, Vec<Value>), FilterError> {
        let mut filter_where = Self::new(starting_param_index);
        filter_where.build(conditions)
    }

    fn build(&mut self, conditions: &[Condition]) -> Result<(String, Vec<Value>), FilterError> {
        let mut sql_conditions = Vec::with_capacity(conditions.len());
        for condition in conditions {
            sql_conditions.push(self.build_sql_condition(condition)?);
        }
        let where_clause = if sql_conditions.is_empty() {
            "1=1".to_string()
        } else {
            sql_conditions.join(" AND ")
        };
        Ok((where_clause, self.param_values.clone()))
    }

    fn build_sql_condition(&mut self, condition: &Condition) -> Result<String, FilterError> {
        let column = json_path(&condition.field)?;
        Ok(match condition.op {
            FilterOp::Eq => {
                if condition.value.is_null() {
                    format!("{} IS NULL", column)
                } else {
                    // jsonb containment also matches a scalar inside an array field
                    format!("{} @> {}", column, self.param(condition.value.clone()))
                }
            }
            FilterOp::Gt => format!("{} > {}", column, self.param(condition.value.clone())),
            FilterOp::Gte => format!("{} >= {}", column, self.param(condition.value.clone())),
            FilterOp::Lt => format!("{} < {}", column, self.param(condition.value.clone())),
            FilterOp::Lte => format!("{} <= {}", column, self.param(condition.value.clone())),
            FilterOp::In => {
                let values = match &condition.value {
                    Value::Array(values) => values.clone(),
                    other => vec![other.clone()],
                };
                if values.is_empty() {
                    return Ok("1=0".to_string());
                }
                let parts: Vec<String> = values
                    .into_iter()
                    .map(|v| format!("{} @> {}", column, self.param(v)))
                    .collect();
                format!("({})", parts.join(" OR "))
            }
        })
    }

    fn param(&mut self, value: Value) -> String {
        self.param_values.push(value);
        self.param_index += 1;
        format!("${}", self.param_index)
    }
}

impl Condition {
    /// Evaluate the condition against a document
    pub fn matches(&self, doc: &Document) -> bool {
        let actual = get_path(doc, &self.field);
        match self.op {
            FilterOp::Eq => match actual {
                None | Some(Value::Null) => self.value.is_null(),
                Some(Value::Array(items)) if !self.value.is_array() => {
                    items.iter().any(|item| values_equal(item, &self.value))
                }
                Some(v) => values_equal(v, &self.value),
            },
            FilterOp::In => {
                let candidates = match &self.value {
                    Value::Array(items) => items.as_slice(),
                    other => std::slice::from_ref(other),
                };
                match actual {
                    Some(Value::Array(items)) => items
                        .iter()
                        .any(|item| candidates.iter().any(|c| values_equal(item, c))),
                    Some(v) => candidates.iter().any(|c| values_equal(v, c)),
                    None => false,
                }
            }
            FilterOp::Gt | FilterOp::Gte | FilterOp::Lt | FilterOp::Lte => {
                let Some(ordering) = actual.and_then(|v| compare_values(v, &self.value)) else {
                    return false;
                };
                match self.op {
                    FilterOp::Gt => ordering == Ordering::Greater,
                    FilterOp::Gte => ordering != Ordering::Less,
                    FilterOp::Lt => ordering == Ordering::Less,
                    _ => ordering != Ordering::Greater,
                }
            }
        }
    }
}

/// Field names are letters, digits and underscores; dots address nested fields
pub fn validate_field(field: &str) -> Result<(), FilterError> {
    if field.is_empty() {
        return Err(FilterError::InvalidField("field name cannot be empty".to_string()));
    }
    for segment in field.split('.') {
        let mut chars = segment.chars();
        let valid_start = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
        if !valid_start || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(FilterError::InvalidField(field.to_string()));
        }
    }
    Ok(())
}

/// `"data" #> '{location,state}'` for a validated dotted field
pub fn json_path(field: &str) -> Result<String, FilterError> {
    validate_field(field)?;
    Ok(format!("\"data\" #> '{{{}}}'", field.replace('.', ",")))
}

/// Interpret a raw query-string value: numbers and booleans become typed JSON,
/// everything else stays a string. Leading zeros and signs keep strings intact
/// (zipcodes, phone numbers).
pub fn coerce_scalar(raw: &str) -> Value {
    match raw {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    let leading_zero = raw.len() > 1 && raw.starts_with('0') && !raw.starts_with("0.");
    if raw.is_empty() || raw.starts_with('+') || leading_zero {
        return Value::String(raw.to_string());
    }
    if let Ok(i) = raw.parse::<i64>() {
        return Value::Number(i.into());
    }
    if let Some(n) = raw.parse::<f64>().ok().filter(|f| f.is_finite()).and_then(Number::from_f64) {
        return Value::Number(n);
    }
    Value::String(raw.to_string())
}

pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}
