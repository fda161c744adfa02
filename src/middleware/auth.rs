use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::auth::{validate_jwt, AuthError};
use crate::database::document::Document;
use crate::database::models::Role;
use crate::error::ApiError;
use crate::state::AppState;
use crate::types::Collection;

/// Authenticated user, loaded from the store for the token's subject
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Role,
    pub name: String,
}

impl AuthUser {
    pub fn from_document(id: Uuid, doc: &Document) -> Self {
        Self {
            id,
            role: Role::of(doc),
            name: doc.get("name").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Grant access only to the listed roles
    pub fn require_role(&self, roles: &[Role]) -> Result<(), ApiError> {
        if roles.contains(&self.role) {
            Ok(())
        } else {
            Err(ApiError::forbidden(format!(
                "User role {} is not authorized to access this route",
                self.role
            )))
        }
    }
}

/// Authenticates requests that carry a token. A valid token attaches an `AuthUser`
/// extension; an invalid one is rejected; no token passes through unauthenticated.
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(token) = extract_jwt_from_headers(request.headers())? else {
        return Ok(next.run(request).await);
    };

    let claims = validate_jwt(&state.config.security, &token)?;
    let user = state
        .store
        .find_by_id(Collection::Users, claims.sub)
        .await?
        .ok_or_else(|| {
            tracing::warn!("Token subject {} no longer exists", claims.sub);
            ApiError::from(AuthError::InvalidToken)
        })?;

    request.extensions_mut().insert(AuthUser::from_document(claims.sub, &user));
    Ok(next.run(request).await)
}

/// Bearer token from the Authorization header, or the `token` cookie
fn extract_jwt_from_headers(headers: &HeaderMap) -> Result<Option<String>, ApiError> {
    if let Some(auth_header) = headers.get(header::AUTHORIZATION) {
        let auth_str = auth_header
            .to_str()
            .map_err(|_| ApiError::unauthorized("Invalid Authorization header format"))?;
        let token = auth_str
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::unauthorized("Authorization header must use Bearer token format"))?;
        return Ok(Some(token.to_string()));
    }

    let cookie_token = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == "token" && !value.is_empty() && *value != "none")
        .map(|(_, value)| value.to_string());
    Ok(cookie_token)
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| ApiError::from(AuthError::MissingToken))
    }
}
