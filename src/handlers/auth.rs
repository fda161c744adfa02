use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::config::SecurityConfig;
use crate::database::models::{LoginInput, UserInput};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::UserService;
use crate::state::AppState;
use crate::types::Collection;

/// `{ success, token }`, with the token also set as an http-only cookie
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub success: bool,
    pub token: String,
    #[serde(skip)]
    max_age_secs: u64,
    #[serde(skip)]
    status: StatusCode,
}

impl TokenResponse {
    fn new(token: String, security: &SecurityConfig, status: StatusCode) -> Self {
        Self {
            success: true,
            token,
            max_age_secs: security.jwt_expiry_hours * 3600,
            status,
        }
    }
}

impl IntoResponse for TokenResponse {
    fn into_response(self) -> Response {
        let cookie = format!("token={}; Max-Age={}; Path=/; HttpOnly", self.token, self.max_age_secs);
        let mut response = (self.status, Json(&self)).into_response();
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().insert(header::SET_COOKIE, value);
        }
        response
    }
}

/// POST /api/v1/auth/register
pub async fn register(
    State(state): State<AppState>,
    body: Result<Json<UserInput>, JsonRejection>,
) -> Result<TokenResponse, ApiError> {
    let Json(input) = body?;
    let issued = UserService::new(&state).register(input).await?;
    Ok(TokenResponse::new(issued.token, &state.config.security, StatusCode::OK))
}

/// POST /api/v1/auth/login
pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginInput>, JsonRejection>,
) -> Result<TokenResponse, ApiError> {
    let Json(input) = body?;
    let issued = UserService::new(&state).login(input).await?;
    Ok(TokenResponse::new(issued.token, &state.config.security, StatusCode::OK))
}

/// GET /api/v1/auth/me
pub async fn me(State(state): State<AppState>, user: AuthUser) -> ApiResult {
    let doc = UserService::new(&state).me(&user).await?;
    Ok(ApiResponse::document(Collection::Users, doc))
}
