use std::sync::Arc;

use axum::{
    http::{HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::get,
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::{AppConfig, SecurityConfig};
use crate::database::{DatabaseManager, MemoryStore, PgStore, SharedStore};
use crate::geocoder::{self, Geocoder};
use crate::handlers::{auth, bootcamps, courses, reviews, system, users};
use crate::middleware::jwt_auth_middleware;
use crate::state::AppState;

/// The full HTTP application over the given state
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config.security);

    Router::new()
        // Public
        .route("/", get(system::root))
        .route("/health", get(system::health))
        .nest("/api/v1", api_routes())
        // Global middleware
        .layer(from_fn_with_state(state.clone(), jwt_auth_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/bootcamps", get(bootcamps::list).post(bootcamps::create))
        .route(
            "/bootcamps/:id",
            get(bootcamps::get).put(bootcamps::update).delete(bootcamps::delete),
        )
        .route("/bootcamps/radius/:zipcode/:distance", get(bootcamps::within_radius))
        .route("/bootcamps/:id/courses", get(courses::list_for_bootcamp).post(courses::create))
        .route("/bootcamps/:id/reviews", get(reviews::list_for_bootcamp).post(reviews::create))
        .route("/courses", get(courses::list))
        .route("/courses/:id", get(courses::get).put(courses::update).delete(courses::delete))
        .route("/reviews", get(reviews::list))
        .route("/reviews/:id", get(reviews::get).put(reviews::update).delete(reviews::delete))
        .route("/auth/register", axum::routing::post(auth::register))
        .route("/auth/login", axum::routing::post(auth::login))
        .route("/auth/me", get(auth::me))
        .route("/users", get(users::list).post(users::create))
        .route("/users/:id", get(users::get).put(users::update).delete(users::delete))
}

/// Permissive when no origins are configured, otherwise restricted to the configured list
fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter(|o| o.as_str() != "*")
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    if origins.is_empty() || security.cors_origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any)
}

/// Postgres-backed state when a database URL is configured, in-memory otherwise
pub async fn build_state(config: AppConfig) -> anyhow::Result<AppState> {
    let geocoder: Arc<dyn Geocoder> = Arc::from(geocoder::from_config(&config.geocoder));

    let store: SharedStore = if config.database.url.is_some() {
        let manager = DatabaseManager::connect(&config.database).await?;
        let store = PgStore::new(manager.pool().clone());
        store.migrate().await?;
        tracing::info!("Using Postgres document store");
        Arc::new(store)
    } else {
        tracing::warn!("DATABASE_URL not set; using the in-memory store, data is lost on exit");
        Arc::new(MemoryStore::new())
    };

    Ok(AppState::new(config, store, geocoder))
}

/// Bind and serve until the process is stopped
pub async fn serve(state: AppState, port: u16) -> anyhow::Result<()> {
    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("DevCamper API listening on http://{}", bind_addr);

    axum::serve(listener, app(state)).await?;
    Ok(())
}
