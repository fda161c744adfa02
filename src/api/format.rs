use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::Value;

use crate::database::document::Document;
use crate::database::repository::{AdvancedResults, Pagination};
use crate::types::Collection;

/// Listing response: `{ success, count, pagination?, data }`
#[derive(Debug, Clone, Serialize)]
pub struct QueryResultEnvelope {
    pub success: bool,
    /// Items on this page, not the total match count
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
    pub data: Vec<Value>,
}

impl QueryResultEnvelope {
    pub fn paginated(collection: Collection, results: AdvancedResults) -> Self {
        Self {
            success: true,
            count: results.count,
            pagination: Some(results.pagination),
            data: to_api_values(collection, results.data),
        }
    }

    /// Listing under a parent: same page of results, no pagination object
    pub fn nested(collection: Collection, results: AdvancedResults) -> Self {
        Self {
            success: true,
            count: results.count,
            pagination: None,
            data: to_api_values(collection, results.data),
        }
    }

    /// Envelope for a plain document list, such as a radius search
    pub fn unpaginated(collection: Collection, docs: Vec<Document>) -> Self {
        Self {
            success: true,
            count: docs.len(),
            pagination: None,
            data: to_api_values(collection, docs),
        }
    }
}

impl IntoResponse for QueryResultEnvelope {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Public wire form of a stored document: hidden fields removed
pub fn to_api_value(collection: Collection, mut doc: Document) -> Value {
    for field in collection.hidden_fields() {
        doc.remove(*field);
    }
    Value::Object(doc)
}

pub fn to_api_values(collection: Collection, docs: Vec<Document>) -> Vec<Value> {
    docs.into_iter().map(|doc| to_api_value(collection, doc)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::repository::PageInfo;
    use serde_json::json;

    #[test]
    fn serializes_only_existing_pages() {
        let results = AdvancedResults {
            count: 1,
            total_count: 3,
            pagination: Pagination {
                next_page: Some(PageInfo { page: 2, limit: 1, total_count: 3 }),
                prev_page: None,
            },
            data: vec![json!({ "_id": "a" }).as_object().unwrap().clone()],
        };
        let body = serde_json::to_value(QueryResultEnvelope::paginated(Collection::Courses, results)).unwrap();
        assert_eq!(
            body,
            json!({
                "success": true,
                "count": 1,
                "pagination": { "nextPage": { "page": 2, "limit": 1, "totalCount": 3 } },
                "data": [{ "_id": "a" }]
            })
        );
    }

    #[test]
    fn hides_passwords() {
        let user = json!({ "_id": "u", "email": "a@b.io", "password": "hash" }).as_object().unwrap().clone();
        assert_eq!(to_api_value(Collection::Users, user), json!({ "_id": "u", "email": "a@b.io" }));
    }

    #[test]
    fn unpaginated_omits_pagination() {
        let body = serde_json::to_value(QueryResultEnvelope::unpaginated(Collection::Reviews, vec![])).unwrap();
        assert_eq!(body, json!({ "success": true, "count": 0, "data": [] }));
    }
}
