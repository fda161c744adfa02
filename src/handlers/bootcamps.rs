use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};

use crate::api::format::QueryResultEnvelope;
use crate::database::models::BootcampInput;
use crate::error::ApiError;
use crate::middleware::{AdvancedQuery, ApiResponse, ApiResult, AuthUser};
use crate::services::{parse_id, BootcampService};
use crate::state::AppState;
use crate::types::Collection;

/// GET /api/v1/bootcamps - filtered, paginated listing with courses attached
pub async fn list(
    State(state): State<AppState>,
    AdvancedQuery(params): AdvancedQuery,
) -> Result<QueryResultEnvelope, ApiError> {
    let results = BootcampService::new(&state).list(&params).await?;
    Ok(QueryResultEnvelope::paginated(Collection::Bootcamps, results))
}

/// GET /api/v1/bootcamps/:id
pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
    let id = parse_id(&id, "bootcamp")?;
    let bootcamp = BootcampService::new(&state).get(id).await?;
    Ok(ApiResponse::document(Collection::Bootcamps, bootcamp))
}

/// POST /api/v1/bootcamps
pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    body: Result<Json<BootcampInput>, JsonRejection>,
) -> ApiResult {
    let Json(input) = body?;
    let bootcamp = BootcampService::new(&state).create(&user, input).await?;
    Ok(ApiResponse::created(Collection::Bootcamps, bootcamp))
}

/// PUT /api/v1/bootcamps/:id
pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    body: Result<Json<BootcampInput>, JsonRejection>,
) -> ApiResult {
    let id = parse_id(&id, "bootcamp")?;
    let Json(input) = body?;
    let bootcamp = BootcampService::new(&state).update(&user, id, input).await?;
    Ok(ApiResponse::document(Collection::Bootcamps, bootcamp))
}

/// DELETE /api/v1/bootcamps/:id - also removes the bootcamp's courses and reviews
pub async fn delete(State(state): State<AppState>, user: AuthUser, Path(id): Path<String>) -> ApiResult {
    let id = parse_id(&id, "bootcamp")?;
    BootcampService::new(&state).delete(&user, id).await?;
    Ok(ApiResponse::empty())
}

/// GET /api/v1/bootcamps/radius/:zipcode/:distance - distance in miles
pub async fn within_radius(
    State(state): State<AppState>,
    Path((zipcode, distance)): Path<(String, String)>,
) -> Result<QueryResultEnvelope, ApiError> {
    let distance: f64 = distance
        .trim()
        .parse()
        .map_err(|_| ApiError::bad_request(format!("Invalid distance '{}'", distance)))?;
    let bootcamps = BootcampService::new(&state).within_radius(&zipcode, distance).await?;
    Ok(QueryResultEnvelope::unpaginated(Collection::Bootcamps, bootcamps))
}
