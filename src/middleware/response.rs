use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::{json, Map, Value};

use crate::api::format::to_api_value;
use crate::database::document::Document;
use crate::error::ApiError;
use crate::types::Collection;

/// Single-document response: `{ success: true, data }`
#[derive(Debug)]
pub struct ApiResponse {
    status: StatusCode,
    data: Value,
}

impl ApiResponse {
    /// 200 with the public form of `doc`
    pub fn document(collection: Collection, doc: Document) -> Self {
        Self { status: StatusCode::OK, data: to_api_value(collection, doc) }
    }

    /// 201 with the public form of a freshly inserted `doc`
    pub fn created(collection: Collection, doc: Document) -> Self {
        Self { status: StatusCode::CREATED, data: to_api_value(collection, doc) }
    }

    /// Deletes answer with an empty object
    pub fn empty() -> Self {
        Self { status: StatusCode::OK, data: Value::Object(Map::new()) }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "success": true, "data": self.data }))).into_response()
    }
}

pub type ApiResult = Result<ApiResponse, ApiError>;
