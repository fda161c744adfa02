use serde_json::{Map, Value};

use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::{coerce_scalar, validate_field, FilterWhere};
use super::types::{Condition, FilterCriteria, FilterOp, FindQuery, PageRequest, QueryParams, SortKey};
use crate::config::QueryConfig;
use crate::types::Collection;

#[derive(Debug)]
pub struct Filter {
    collection: Collection,
    conditions: Vec<Condition>,
    select_fields: Option<Vec<String>>,
    order_data: Vec<SortKey>,
    page: Option<PageRequest>,
}

impl Filter {
    pub fn new(collection: Collection) -> Self {
        Self {
            collection,
            conditions: vec![],
            select_fields: None,
            order_data: FilterOrder::default_order(),
            page: None,
        }
    }

    /// Build a filter from parsed request parameters
    pub fn from_params(collection: Collection, params: &QueryParams) -> Self {
        let mut filter = Self::new(collection);
        filter
            .criteria(params.criteria.clone())
            .order(params.sort.clone())
            .page(params.page);
        filter.select_fields = params.select.clone();
        filter
    }

    /// Apply a serialized filter document such as `{"tuition":{"lte":1000}}`.
    /// Bare and `$`-prefixed operators are both accepted.
    pub fn where_json(&mut self, raw: &str) -> Result<&mut Self, FilterError> {
        let parsed: Value = serde_json::from_str(raw)?;
        self.conditions = FilterWhere::parse(&FilterWhere::translate(&parsed))?;
        Ok(self)
    }

    pub fn criteria(&mut self, criteria: FilterCriteria) -> &mut Self {
        self.conditions = criteria.conditions;
        self
    }

    pub fn order(&mut self, keys: Vec<SortKey>) -> &mut Self {
        self.order_data = if keys.is_empty() { FilterOrder::default_order() } else { keys };
        self
    }

    pub fn page(&mut self, page: PageRequest) -> &mut Self {
        self.page = Some(page);
        self
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn to_find_query(&self) -> FindQuery {
        FindQuery {
            collection: self.collection,
            conditions: self.conditions.clone(),
            select: self.select_fields.clone(),
            sort: self.order_data.clone(),
            skip: self.page.map(|p| p.start_index()).unwrap_or(0),
            limit: self.page.map(|p| p.limit as u64),
        }
    }
}

impl QueryParams {
    /// The same query restricted to `field == value`, replacing any criteria on `field`
    pub fn scoped(&self, field: &str, value: impl Into<Value>) -> Self {
        let mut scoped = self.clone();
        scoped.criteria.conditions.retain(|c| c.field != field);
        scoped.criteria.conditions.push(Condition::eq(field, value));
        scoped
    }

    /// Parse decoded query-string pairs such as `tuition[gt]=100&select=name,tuition&page=2`
    pub fn from_pairs<I, K, V>(pairs: I, config: &QueryConfig) -> Result<Self, FilterError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut raw = Map::new();
        let mut select = None;
        let mut sort = None;
        let mut page = None;
        let mut limit = None;

        for (key, value) in pairs {
            let (key, value) = (key.as_ref(), value.as_ref());
            match key {
                "select" => select = Some(value.to_string()),
                "sort" => sort = Some(value.to_string()),
                "page" => page = Some(value.to_string()),
                "limit" => limit = Some(value.to_string()),
                _ => insert_criterion(&mut raw, key, value)?,
            }
        }

        let translated = FilterWhere::translate(&Value::Object(raw));
        let criteria = FilterCriteria { conditions: FilterWhere::parse(&translated)? };

        let select = match select {
            Some(s) => {
                let fields: Vec<String> = s
                    .split(',')
                    .map(str::trim)
                    .filter(|f| !f.is_empty())
                    .map(str::to_string)
                    .collect();
                for field in &fields {
                    validate_field(field)?;
                }
                Some(fields).filter(|f| !f.is_empty())
            }
            None => None,
        };

        let sort = match sort {
            Some(s) => FilterOrder::parse(&s)?,
            None => vec![],
        };
        let sort = if sort.is_empty() { FilterOrder::default_order() } else { sort };

        let page = match page {
            Some(p) => p
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|p| *p >= 1)
                .ok_or_else(|| FilterError::InvalidPage(format!("'{}' is not a positive integer", p)))?,
            None => 1,
        };

        let requested_limit = match limit {
            Some(l) => l
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|l| *l >= 1)
                .ok_or_else(|| FilterError::InvalidLimit(format!("'{}' is not a positive integer", l)))?,
            None => config.default_limit,
        };
        let limit = match config.max_limit {
            Some(max) if requested_limit > max => {
                if config.debug_logging {
                    tracing::debug!("Limit {} exceeds max {}, capping to max", requested_limit, max);
                }
                max
            }
            _ => requested_limit,
        };

        Ok(Self {
            criteria,
            select,
            sort,
            page: PageRequest { page, limit },
        })
    }
}

/// `field=value` or `field[op]=value` into the untranslated filter document
fn insert_criterion(raw: &mut Map<String, Value>, key: &str, value: &str) -> Result<(), FilterError> {
    let Some(open) = key.find('[') else {
        if !raw.get(key).is_some_and(Value::is_object) {
            raw.insert(key.to_string(), coerce_scalar(value));
        }
        return Ok(());
    };

    let field = &key[..open];
    let keyword = key[open + 1..]
        .strip_suffix(']')
        .ok_or_else(|| FilterError::InvalidWhereClause(format!("malformed key '{}'", key)))?;
    if FilterOp::from_keyword(keyword).is_none() {
        return Err(FilterError::UnsupportedOperator(keyword.to_string()));
    }
    validate_field(field)?;

    let entry = raw
        .entry(field.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if !entry.is_object() {
        // A literal and an operator on the same field: the operator form wins
        *entry = Value::Object(Map::new());
    }
    if let Value::Object(ops) = entry {
        let data = if keyword == "in" {
            Value::String(value.to_string())
        } else {
            coerce_scalar(value)
        };
        ops.insert(keyword.to_string(), data);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::types::SortDirection;
    use serde_json::json;

    fn config() -> QueryConfig {
        QueryConfig { default_limit: 100, max_limit: Some(500), debug_logging: false }
    }

    #[test]
    fn strips_reserved_keys_and_translates_all_operators() {
        let params = QueryParams::from_pairs(
            vec![
                ("tuition[gt]", "100"),
                ("weeks[gt]", "4"),
                ("select", "title,tuition"),
                ("sort", "-tuition"),
                ("page", "2"),
                ("limit", "25"),
            ],
            &config(),
        )
        .unwrap();

        assert_eq!(params.criteria.conditions.len(), 2);
        assert!(params.criteria.conditions.contains(&Condition::new("tuition", FilterOp::Gt, json!(100))));
        assert!(params.criteria.conditions.contains(&Condition::new("weeks", FilterOp::Gt, json!(4))));
        assert_eq!(params.select, Some(vec!["title".to_string(), "tuition".to_string()]));
        assert_eq!(params.sort, vec![SortKey::desc("tuition")]);
        assert_eq!(params.page, PageRequest { page: 2, limit: 25 });
    }

    #[test]
    fn defaults_when_no_controls_given() {
        let params = QueryParams::from_pairs(Vec::<(String, String)>::new(), &config()).unwrap();
        assert!(params.criteria.is_empty());
        assert_eq!(params.select, None);
        assert_eq!(params.sort[0].field, "createdAt");
        assert_eq!(params.sort[0].direction, SortDirection::Desc);
        assert_eq!(params.page, PageRequest { page: 1, limit: 100 });
    }

    #[test]
    fn rejects_invalid_pagination_and_operators() {
        for pairs in [
            vec![("page", "0")],
            vec![("page", "abc")],
            vec![("limit", "-5")],
            vec![("tuition[regex]", "1")],
            vec![("tuition[gt", "1")],
            vec![("sort", "-")],
            vec![("select", "name,bad field")],
        ] {
            assert!(QueryParams::from_pairs(pairs.clone(), &config()).is_err(), "{:?}", pairs);
        }
    }

    #[test]
    fn caps_limit_at_configured_max() {
        let params = QueryParams::from_pairs(vec![("limit", "10000")], &config()).unwrap();
        assert_eq!(params.page.limit, 500);
    }

    #[test]
    fn in_operator_splits_values() {
        let params = QueryParams::from_pairs(vec![("careers[in]", "Business,UI/UX")], &config()).unwrap();
        assert_eq!(
            params.criteria.conditions,
            vec![Condition::new("careers", FilterOp::In, json!(["Business", "UI/UX"]))]
        );
    }

    #[test]
    fn builds_find_query_window() {
        let params = QueryParams::from_pairs(vec![("page", "3"), ("limit", "10")], &config()).unwrap();
        let query = Filter::from_params(Collection::Courses, &params).to_find_query();
        assert_eq!(query.skip, 20);
        assert_eq!(query.limit, Some(10));
        assert_eq!(query.sort, FilterOrder::default_order());
    }

    #[test]
    fn accepts_json_filter_documents() {
        let mut filter = Filter::new(Collection::Courses);
        filter
            .where_json(r#"{ "tuition": { "lte": 1000 }, "weeks": { "$gt": 4 }, "minimumSkill": "beginner" }"#)
            .unwrap();
        assert_eq!(filter.conditions().len(), 3);
        assert!(filter.conditions().contains(&Condition::new("tuition", FilterOp::Lte, json!(1000))));

        let err = Filter::new(Collection::Courses).where_json(r#"{"tuition": {"gt": "#).unwrap_err();
        assert!(matches!(err, FilterError::JsonError(_)));
        assert!(Filter::new(Collection::Courses).where_json(r#"{"tuition": {"$regex": 1}}"#).is_err());
    }

    #[test]
    fn operator_beats_literal_and_last_value_wins() {
        for pairs in [
            vec![("tuition", "5"), ("tuition[lte]", "1000")],
            vec![("tuition[lte]", "1000"), ("tuition", "5")],
        ] {
            let params = QueryParams::from_pairs(pairs, &config()).unwrap();
            assert_eq!(params.criteria.conditions, vec![Condition::new("tuition", FilterOp::Lte, json!(1000))]);
        }

        let params = QueryParams::from_pairs(vec![("housing", "false"), ("housing", "true")], &config()).unwrap();
        assert_eq!(params.criteria.conditions, vec![Condition::new("housing", FilterOp::Eq, json!(true))]);
    }
}
