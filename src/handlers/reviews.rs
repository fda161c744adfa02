use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};

use crate::api::format::QueryResultEnvelope;
use crate::database::models::ReviewInput;
use crate::error::ApiError;
use crate::middleware::{AdvancedQuery, ApiResponse, ApiResult, AuthUser};
use crate::services::{parse_id, ReviewService};
use crate::state::AppState;
use crate::types::Collection;

/// GET /api/v1/reviews
pub async fn list(
    State(state): State<AppState>,
    AdvancedQuery(params): AdvancedQuery,
) -> Result<QueryResultEnvelope, ApiError> {
    let results = ReviewService::new(&state).list(&params).await?;
    Ok(QueryResultEnvelope::paginated(Collection::Reviews, results))
}

/// GET /api/v1/bootcamps/:id/reviews - advanced results for one bootcamp, without the pagination object
pub async fn list_for_bootcamp(
    State(state): State<AppState>,
    Path(bootcamp_id): Path<String>,
    AdvancedQuery(params): AdvancedQuery,
) -> Result<QueryResultEnvelope, ApiError> {
    let bootcamp_id = parse_id(&bootcamp_id, "bootcamp")?;
    let results = ReviewService::new(&state).list_for_bootcamp(bootcamp_id, &params).await?;
    Ok(QueryResultEnvelope::nested(Collection::Reviews, results))
}

/// GET /api/v1/reviews/:id
pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
    let id = parse_id(&id, "review")?;
    let review = ReviewService::new(&state).get(id).await?;
    Ok(ApiResponse::document(Collection::Reviews, review))
}

/// POST /api/v1/bootcamps/:id/reviews
pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    Path(bootcamp_id): Path<String>,
    body: Result<Json<ReviewInput>, JsonRejection>,
) -> ApiResult {
    let bootcamp_id = parse_id(&bootcamp_id, "bootcamp")?;
    let Json(input) = body?;
    let review = ReviewService::new(&state).create(&user, bootcamp_id, input).await?;
    Ok(ApiResponse::created(Collection::Reviews, review))
}

/// PUT /api/v1/reviews/:id
pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    body: Result<Json<ReviewInput>, JsonRejection>,
) -> ApiResult {
    let id = parse_id(&id, "review")?;
    let Json(input) = body?;
    let review = ReviewService::new(&state).update(&user, id, input).await?;
    Ok(ApiResponse::document(Collection::Reviews, review))
}

/// DELETE /api/v1/reviews/:id
pub async fn delete(State(state): State<AppState>, user: AuthUser, Path(id): Path<String>) -> ApiResult {
    let id = parse_id(&id, "review")?;
    ReviewService::new(&state).delete(&user, id).await?;
    Ok(ApiResponse::empty())
}
