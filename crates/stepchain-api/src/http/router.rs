//! Axum router configuration with middleware.
//!
//! All routes are under `/api/v1/`. Middleware: CORS, request tracing.

use axum::Router;
use axum::routing::{delete, get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Chain CRUD
        .route("/chains", post(handlers::chain::create_chain))
        .route("/chains", get(handlers::chain::list_chains))
        .route("/chains/{id}", get(handlers::chain::get_chain))
        .route("/chains/{id}", delete(handlers::chain::delete_chain))
        // Execution
        .route(
            "/chains/{id}/execute",
            post(handlers::chain::execute_next_step),
        )
        .route(
            "/chains/{id}/current-step",
            get(handlers::chain::get_current_step),
        )
        .route("/chains/{id}/status", get(handlers::chain::get_chain_status))
        .route("/chains/{id}/reset", post(handlers::chain::reset_chain));

    Router::new()
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
