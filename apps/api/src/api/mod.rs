//! API layer: routers, handlers and middleware

pub mod handlers;
pub mod middleware;
pub mod routes;

use axum::{
    extract::DefaultBodyLimit,
    routing::get,
    Router,
};

use crate::config::ServerConfig;
use crate::state::AppState;

/// Router for the public listener.
pub fn public_router(state: AppState) -> Router {
    let server = state.config.public_server.clone();
    let v2 = routes::public::public_routes(&state);
    finish(v2, state, &server)
}

/// Router for the admin listener. It has no caller authentication and must not
/// be exposed outside the deployment.
pub fn admin_router(state: AppState) -> Router {
    let server = state.config.admin_server.clone();
    let v2 = routes::admin::admin_routes(&state);
    finish(v2, state, &server)
}

fn finish(v2: Router<AppState>, state: AppState, server: &ServerConfig) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .nest(
            "/v2",
            v2.layer(axum::middleware::from_fn(middleware::fhir_content_type)),
        )
        .fallback(handlers::not_found)
        .with_state(state)
        // Applied in reverse order
        .layer(axum::middleware::from_fn(
            middleware::request_context_middleware,
        ))
        .layer(middleware::compression())
        .layer(middleware::cors(&server.cors_origins))
        .layer(DefaultBodyLimit::max(server.max_request_body_size))
}
