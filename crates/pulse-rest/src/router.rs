//! Main application router.

use crate::{
    controllers::{cache_controller, health_controller, jobs_controller},
    middleware::{auth_middleware, logging_middleware, AuthMiddlewareState},
    openapi::{ApiDoc, OPENAPI_PATH},
    state::AppState,
};
use axum::{http::HeaderValue, middleware, routing::get, Json, Router};
use pulse_config::ServerConfig;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};
use utoipa::OpenApi;

/// Creates the main application router.
///
/// Everything under `/api/v1` is guarded by `auth`. Health checks and the
/// OpenAPI document are public.
pub fn create_router(state: AppState, server_config: &ServerConfig, auth: AuthMiddlewareState) -> Router {
    let cors = create_cors_layer(server_config);

    if !auth.is_enabled() {
        warn!("No refresh secret configured; /api/v1 is unauthenticated");
    }

    let api_router = Router::new()
        .nest("/cache", cache_controller::router())
        .nest("/jobs", jobs_controller::router())
        .layer(middleware::from_fn_with_state(auth, auth_middleware));

    let router = Router::new()
        // Health endpoints (no auth required)
        .merge(health_controller::router())
        // API v1
        .nest("/api/v1", api_router)
        .route(OPENAPI_PATH, get(|| async { Json(ApiDoc::openapi()) }))
        .route("/", get(root))
        .with_state(state)
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(TimeoutLayer::new(server_config.request_timeout()))
        .layer(middleware::from_fn(logging_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

    info!("Router created with REST endpoints and OpenAPI document at {}", OPENAPI_PATH);
    router
}

/// Creates a CORS layer based on server configuration.
fn create_cors_layer(server_config: &ServerConfig) -> CorsLayer {
    if !server_config.cors_enabled {
        return CorsLayer::new();
    }

    if server_config.cors_origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = server_config
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Root endpoint handler.
async fn root() -> &'static str {
    "Pulse Cache API v1"
}
