use axum::{
    body::Bytes,
    extract::{Path, State},
    response::Response,
    Extension,
};
use dpc_fhir_models::ResourceType;

use super::resources;
use crate::error::Result;
use crate::request_context::RequestContext;
use crate::state::AppState;

pub async fn read(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> Result<Response> {
    resources::read(&state, &ctx, ResourceType::Practitioner, &id).await
}

pub async fn create(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    body: Bytes,
) -> Result<Response> {
    resources::create(&state, &ctx, ResourceType::Practitioner, body).await
}

pub async fn update(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Response> {
    resources::update(&state, &ctx, ResourceType::Practitioner, &id, body).await
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> Result<Response> {
    resources::delete(&state, &ctx, ResourceType::Practitioner, &id).await
}
