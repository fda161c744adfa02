use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};

use crate::api::format::QueryResultEnvelope;
use crate::database::models::CourseInput;
use crate::error::ApiError;
use crate::middleware::{AdvancedQuery, ApiResponse, ApiResult, AuthUser};
use crate::services::{parse_id, CourseService};
use crate::state::AppState;
use crate::types::Collection;

/// GET /api/v1/courses
pub async fn list(
    State(state): State<AppState>,
    AdvancedQuery(params): AdvancedQuery,
) -> Result<QueryResultEnvelope, ApiError> {
    let results = CourseService::new(&state).list(&params).await?;
    Ok(QueryResultEnvelope::paginated(Collection::Courses, results))
}

/// GET /api/v1/bootcamps/:id/courses - advanced results for one bootcamp, without the pagination object
pub async fn list_for_bootcamp(
    State(state): State<AppState>,
    Path(bootcamp_id): Path<String>,
    AdvancedQuery(params): AdvancedQuery,
) -> Result<QueryResultEnvelope, ApiError> {
    let bootcamp_id = parse_id(&bootcamp_id, "bootcamp")?;
    let results = CourseService::new(&state).list_for_bootcamp(bootcamp_id, &params).await?;
    Ok(QueryResultEnvelope::nested(Collection::Courses, results))
}

/// GET /api/v1/courses/:id
pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
    let id = parse_id(&id, "course")?;
    let course = CourseService::new(&state).get(id).await?;
    Ok(ApiResponse::document(Collection::Courses, course))
}

/// POST /api/v1/bootcamps/:id/courses
pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    Path(bootcamp_id): Path<String>,
    body: Result<Json<CourseInput>, JsonRejection>,
) -> ApiResult {
    let bootcamp_id = parse_id(&bootcamp_id, "bootcamp")?;
    let Json(input) = body?;
    let course = CourseService::new(&state).create(&user, bootcamp_id, input).await?;
    Ok(ApiResponse::created(Collection::Courses, course))
}

/// PUT /api/v1/courses/:id
pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    body: Result<Json<CourseInput>, JsonRejection>,
) -> ApiResult {
    let id = parse_id(&id, "course")?;
    let Json(input) = body?;
    let course = CourseService::new(&state).update(&user, id, input).await?;
    Ok(ApiResponse::document(Collection::Courses, course))
}

/// DELETE /api/v1/courses/:id
pub async fn delete(State(state): State<AppState>, user: AuthUser, Path(id): Path<String>) -> ApiResult {
    let id = parse_id(&id, "course")?;
    CourseService::new(&state).delete(&user, id).await?;
    Ok(ApiResponse::empty())
}
