pub mod advanced_results;
pub mod auth;
pub mod response;

pub use advanced_results::AdvancedQuery;
pub use auth::{jwt_auth_middleware, AuthUser};
pub use response::{ApiResponse, ApiResult};
