use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::error::ApiError;
use crate::filter::QueryParams;
use crate::state::AppState;

/// Listing parameters parsed from the query string:
/// `?tuition[lte]=1000&careers[in]=Business,UI/UX&select=name&sort=-averageCost&page=2&limit=10`
#[derive(Debug, Clone)]
pub struct AdvancedQuery(pub QueryParams);

#[async_trait]
impl FromRequestParts<AppState> for AdvancedQuery {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let query = parts.uri.query().unwrap_or_default();
        let pairs = url::form_urlencoded::parse(query.as_bytes());
        let params = QueryParams::from_pairs(pairs, &state.config.query)?;
        if state.config.query.debug_logging {
            tracing::debug!("Parsed listing query '{}' into {:?}", query, params);
        }
        Ok(AdvancedQuery(params))
    }
}
