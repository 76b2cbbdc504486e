use axum::{
    middleware,
    routing::{get, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::handlers;
use super::AppState;
use crate::middleware::request_id::{make_span_with_request_id, request_id_middleware};

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", api_routes())
        .layer(
            // Request id first, so the trace span can record it
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id)),
        )
        .with_state(state)
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/users/:user/preferences",
            get(handlers::list_preferences),
        )
        .route(
            "/users/:user/preferences/:item",
            put(handlers::upsert_preference).delete(handlers::clear_preference),
        )
        .route(
            "/users/:user/recommendations",
            get(handlers::top_recommendations).post(handlers::recommend),
        )
}
