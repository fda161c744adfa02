// Admin-only user management
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};

use crate::api::format::QueryResultEnvelope;
use crate::database::models::UserInput;
use crate::error::ApiError;
use crate::middleware::{AdvancedQuery, ApiResponse, ApiResult, AuthUser};
use crate::services::{parse_id, UserService};
use crate::state::AppState;
use crate::types::Collection;

/// GET /api/v1/users
pub async fn list(
    State(state): State<AppState>,
    user: AuthUser,
    AdvancedQuery(params): AdvancedQuery,
) -> Result<QueryResultEnvelope, ApiError> {
    let results = UserService::new(&state).list(&user, &params).await?;
    Ok(QueryResultEnvelope::paginated(Collection::Users, results))
}

/// GET /api/v1/users/:id
pub async fn get(State(state): State<AppState>, user: AuthUser, Path(id): Path<String>) -> ApiResult {
    let id = parse_id(&id, "user")?;
    let doc = UserService::new(&state).get(&user, id).await?;
    Ok(ApiResponse::document(Collection::Users, doc))
}

/// POST /api/v1/users
pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    body: Result<Json<UserInput>, JsonRejection>,
) -> ApiResult {
    let Json(input) = body?;
    let doc = UserService::new(&state).create(&user, input).await?;
    Ok(ApiResponse::created(Collection::Users, doc))
}

/// PUT /api/v1/users/:id
pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    body: Result<Json<UserInput>, JsonRejection>,
) -> ApiResult {
    let id = parse_id(&id, "user")?;
    let Json(input) = body?;
    let doc = UserService::new(&state).update(&user, id, input).await?;
    Ok(ApiResponse::document(Collection::Users, doc))
}

/// DELETE /api/v1/users/:id
pub async fn delete(State(state): State<AppState>, user: AuthUser, Path(id): Path<String>) -> ApiResult {
    let id = parse_id(&id, "user")?;
    UserService::new(&state).delete(&user, id).await?;
    Ok(ApiResponse::empty())
}
