use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET / - service summary
pub async fn root() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "DevCamper API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Bootcamp directory with courses, reviews and users",
            "endpoints": {
                "bootcamps": "/api/v1/bootcamps[/:id] (write: publisher, admin)",
                "radius": "/api/v1/bootcamps/radius/:zipcode/:distance",
                "courses": "/api/v1/courses[/:id], /api/v1/bootcamps/:id/courses",
                "reviews": "/api/v1/reviews[/:id], /api/v1/bootcamps/:id/reviews",
                "auth": "/api/v1/auth/register, /api/v1/auth/login, /api/v1/auth/me",
                "users": "/api/v1/users[/:id] (admin)",
            }
        }
    }))
}

/// GET /health - store reachability
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.store.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "database unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now
                    }
                })),
            )
        }
    }
}
