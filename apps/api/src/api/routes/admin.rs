//! Admin `/v2` routes: organization management

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use dpc_fhir_models::ResourceType;

use crate::api::handlers::organization;
use crate::api::middleware::{bind_path_id, fhir_filter, fhir_model, FhirFilter, PathId};
use crate::state::AppState;

pub fn admin_routes(state: &AppState) -> Router<AppState> {
    let max_body_size = state.config.admin_server.max_request_body_size;

    let organization = Router::new()
        .route("/", post(organization::create).layer(from_fn(fhir_model)))
        .route(
            "/:id",
            get(organization::read)
                .put(organization::update)
                .layer(from_fn(fhir_model))
                .delete(organization::delete)
                .route_layer(from_fn_with_state(PathId::Organization, bind_path_id)),
        )
        .route_layer(from_fn_with_state(
            FhirFilter::new(ResourceType::Organization, max_body_size),
            fhir_filter,
        ));

    Router::new().nest("/Organization", organization)
}
