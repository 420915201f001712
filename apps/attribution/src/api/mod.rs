//! HTTP layer - routes, handlers, and middleware

pub mod handlers;
pub mod middleware;

use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Extension, Router,
};
use dpc_fhir_models::ResourceType;

/// Create the attribution router
pub fn create_router(state: AppState) -> Router {
    let max_body_size = state.config.server.max_request_body_size;

    let group_routes = resource_routes(ResourceType::Group)
        .route("/:id/$export", get(handlers::export::export));

    Router::new()
        .route("/health", get(handlers::health))
        .nest("/Organization", resource_routes(ResourceType::Organization))
        .nest("/Practitioner", resource_routes(ResourceType::Practitioner))
        .nest("/Group", group_routes)
        .route("/Job/:id", get(handlers::job::batches))
        .route("/Data/:file_name", get(handlers::data::file_info))
        .fallback(handlers::not_found)
        .with_state(state)
        .layer(axum::middleware::from_fn(middleware::json_content_type))
        .layer(axum::middleware::from_fn(middleware::request_context_middleware))
        .layer(middleware::trace())
        .layer(DefaultBodyLimit::max(max_body_size))
}

/// CRUD routes for one enveloped resource type.
fn resource_routes(resource_type: ResourceType) -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::resources::create))
        .route(
            "/:id",
            get(handlers::resources::read)
                .put(handlers::resources::update)
                .delete(handlers::resources::delete),
        )
        .layer(Extension(resource_type))
}
