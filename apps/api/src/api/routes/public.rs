//! Public `/v2` routes
//!
//! Everything except `metadata` and `Token/auth` requires a caller identity.
//! Layer order per route, outermost first: `auth_context`, path binding or
//! ownership checks, `fhir_filter`, `fhir_model`, handler.

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use dpc_fhir_models::ResourceType;

use crate::api::handlers::{data, group, job, metadata, organization, practitioner, token};
use crate::api::middleware::{
    auth_context, bind_path_id, export_params, fhir_filter, fhir_model, require_own_organization,
    FhirFilter, PathId,
};
use crate::state::AppState;

pub fn public_routes(state: &AppState) -> Router<AppState> {
    let max_body_size = state.config.public_server.max_request_body_size;

    let organization = Router::new()
        .route("/:id", get(organization::read).layer(from_fn(fhir_model)))
        .route_layer(from_fn(require_own_organization));

    let practitioner = Router::new()
        .route("/", post(practitioner::create).layer(from_fn(fhir_model)))
        .route(
            "/:id",
            get(practitioner::read)
                .put(practitioner::update)
                .layer(from_fn(fhir_model))
                .delete(practitioner::delete),
        )
        .route_layer(from_fn_with_state(
            FhirFilter::new(ResourceType::Practitioner, max_body_size),
            fhir_filter,
        ));

    let group = Router::new()
        .route("/", post(group::create).layer(from_fn(fhir_model)))
        .route_layer(from_fn_with_state(
            FhirFilter::new(ResourceType::Group, max_body_size),
            fhir_filter,
        ))
        .route(
            "/:id/$export",
            get(group::export)
                .route_layer(from_fn(export_params))
                .route_layer(from_fn_with_state(PathId::Group, bind_path_id)),
        );

    let authenticated = Router::new()
        .nest("/Organization", organization)
        .nest("/Practitioner", practitioner)
        .nest("/Group", group)
        .route(
            "/Jobs/:id",
            get(job::status).route_layer(from_fn_with_state(PathId::Job, bind_path_id)),
        )
        .route(
            "/Data/:file_name",
            get(data::file).route_layer(from_fn_with_state(PathId::FileName, bind_path_id)),
        )
        .route_layer(from_fn_with_state(state.clone(), auth_context));

    Router::new()
        .route("/metadata", get(metadata::metadata))
        .route("/Token/auth", post(token::auth_token))
        .merge(authenticated)
}
