use std::cmp::Ordering;

use serde_json::Value;

use super::error::FilterError;
use super::filter_where::{compare_values, json_path, validate_field};
use super::types::{SortDirection, SortKey};
use crate::database::document::{get_path, Document, ID_FIELD};

pub struct FilterOrder;

impl FilterOrder {
    /// Newest first
    pub fn default_order() -> Vec<SortKey> {
        vec![SortKey::desc("createdAt")]
    }

    /// Parse `-averageCost,name`: a `-` prefix sorts descending, no prefix (or `+`) ascending
    pub fn parse(sort: &str) -> Result<Vec<SortKey>, FilterError> {
        let mut out = Vec::new();
        for part in sort.split(',') {
            let trimmed = part.trim();
            if trimmed.is_empty() {
                continue;
            }
            let (field, direction) = if let Some(field) = trimmed.strip_prefix('-') {
                (field, SortDirection::Desc)
            } else if let Some(field) = trimmed.strip_prefix('+') {
                (field, SortDirection::Asc)
            } else {
                (trimmed, SortDirection::Asc)
            };
            validate_field(field).map_err(|_| FilterError::InvalidSort(trimmed.to_string()))?;
            out.push(SortKey { field: field.to_string(), direction });
        }
        Ok(out)
    }

    /// Compare two documents by the sort keys, then by ascending `_id` so ties have one
    /// order. Missing values sort before present ones.
    pub fn compare(a: &Document, b: &Document, keys: &[SortKey]) -> Ordering {
        for key in keys {
            let ordering = match (get_path(a, &key.field), get_path(b, &key.field)) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (Some(x), Some(y)) => compare_values(x, y).unwrap_or_else(|| type_rank(x).cmp(&type_rank(y))),
            };
            let ordering = match key.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        let id = |doc: &Document| doc.get(ID_FIELD).and_then(Value::as_str).map(str::to_string);
        id(a).cmp(&id(b))
    }

    /// `ORDER BY` over the `data` column, always ending with the primary key
    pub fn generate(keys: &[SortKey]) -> Result<String, FilterError> {
        let mut parts = keys
            .iter()
            .map(|k| Ok(format!("{} {}", json_path(&k.field)?, k.direction.to_sql())))
            .collect::<Result<Vec<_>, FilterError>>()?;
        parts.push(r#""id" ASC"#.to_string());
        Ok(format!("ORDER BY {}", parts.join(", ")))
    }
}

fn type_rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Number(_) => 1,
        Value::String(_) => 2,
        Value::Object(_) => 3,
        Value::Array(_) => 4,
        Value::Bool(_) => 5,
    }
}
