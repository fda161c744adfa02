use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::Collection;

/// Comparison operators understood by the document store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOp {
    #[serde(rename = "$eq")] Eq,
    #[serde(rename = "$gt")] Gt,
    #[serde(rename = "$gte")] Gte,
    #[serde(rename = "$lt")] Lt,
    #[serde(rename = "$lte")] Lte,
    #[serde(rename = "$in")] In,
}

impl FilterOp {
    /// Keywords accepted in the query string form `field[gt]=value`
    pub const KEYWORDS: [&'static str; 5] = ["gt", "gte", "lt", "lte", "in"];

    /// Parse a bare keyword (`gt`) as it appears in request criteria
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Some(match keyword {
            "gt" => FilterOp::Gt,
            "gte" => FilterOp::Gte,
            "lt" => FilterOp::Lt,
            "lte" => FilterOp::Lte,
            "in" => FilterOp::In,
            _ => return None,
        })
    }

    /// Parse the store's native operator syntax (`$gt`)
    pub fn from_operator(operator: &str) -> Option<Self> {
        Some(match operator {
            "$eq" => FilterOp::Eq,
            "$gt" => FilterOp::Gt,
            "$gte" => FilterOp::Gte,
            "$lt" => FilterOp::Lt,
            "$lte" => FilterOp::Lte,
            "$in" => FilterOp::In,
            _ => return None,
        })
    }

    pub fn operator(&self) -> &'static str {
        match self {
            FilterOp::Eq => "$eq",
            FilterOp::Gt => "$gt",
            FilterOp::Gte => "$gte",
            FilterOp::Lt => "$lt",
            FilterOp::Lte => "$lte",
            FilterOp::In => "$in",
        }
    }
}

/// A single translated predicate: `field <op> value`
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Condition {
    pub fn new(field: impl Into<String>, op: FilterOp, value: Value) -> Self {
        Self { field: field.into(), op, value }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Eq, value.into())
    }
}

/// Validated filter criteria, the typed boundary between a request and the translator
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterCriteria {
    pub conditions: Vec<Condition>,
}

impl FilterCriteria {
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC NULLS FIRST",
            SortDirection::Desc => "DESC NULLS LAST",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn asc(field: impl Into<String>) -> Self {
        Self { field: field.into(), direction: SortDirection::Asc }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self { field: field.into(), direction: SortDirection::Desc }
    }
}

/// 1-indexed page window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    pub fn start_index(&self) -> u64 {
        (self.page as u64 - 1) * self.limit as u64
    }

    pub fn end_index(&self) -> u64 {
        self.page as u64 * self.limit as u64
    }
}

/// Fully parsed request parameters for an advanced-results listing
#[derive(Debug, Clone, PartialEq)]
pub struct QueryParams {
    pub criteria: FilterCriteria,
    pub select: Option<Vec<String>>,
    pub sort: Vec<SortKey>,
    pub page: PageRequest,
}

/// Related entities to attach to each result
#[derive(Debug, Clone, PartialEq)]
pub enum Populate {
    /// Replace a reference field with selected fields of the referenced document
    Parent {
        field: &'static str,
        collection: Collection,
        select: &'static [&'static str],
    },
    /// Attach every document of `collection` whose `foreign_field` references this one
    Children {
        as_field: &'static str,
        collection: Collection,
        foreign_field: &'static str,
    },
}

impl Populate {
    /// Child listings show the bootcamp they belong to
    pub fn bootcamp_summary() -> Self {
        Populate::Parent {
            field: "bootcamp",
            collection: Collection::Bootcamps,
            select: &["name", "description"],
        }
    }

    /// Bootcamp listings carry their courses
    pub fn bootcamp_courses() -> Self {
        Populate::Children {
            as_field: "courses",
            collection: Collection::Courses,
            foreign_field: "bootcamp",
        }
    }
}

/// Translated query ready for a document store
#[derive(Debug, Clone, PartialEq)]
pub struct FindQuery {
    pub collection: Collection,
    pub conditions: Vec<Condition>,
    pub select: Option<Vec<String>>,
    pub sort: Vec<SortKey>,
    pub skip: u64,
    pub limit: Option<u64>,
}

impl FindQuery {
    pub fn all(collection: Collection) -> Self {
        Self {
            collection,
            conditions: vec![],
            select: None,
            sort: vec![],
            skip: 0,
            limit: None,
        }
    }

    pub fn matching(collection: Collection, conditions: Vec<Condition>) -> Self {
        Self { conditions, ..Self::all(collection) }
    }
}
