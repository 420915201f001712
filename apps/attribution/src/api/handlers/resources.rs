//! Organization, Practitioner and Group endpoints
//!
//! The resource type comes from the router (`Extension<ResourceType>`), so one set
//! of handlers serves every enveloped type.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use dpc_fhir_models::ResourceType;

use crate::request_context::RequestContext;
use crate::services::resources;
use crate::state::AppState;
use crate::Result;

pub async fn create(
    State(state): State<AppState>,
    Extension(resource_type): Extension<ResourceType>,
    Extension(ctx): Extension<RequestContext>,
    body: Bytes,
) -> Result<impl IntoResponse> {
    let envelope = resources::create(&state, &ctx, resource_type, &body).await?;
    Ok((StatusCode::CREATED, Json(envelope)))
}

pub async fn read(
    State(state): State<AppState>,
    Extension(resource_type): Extension<ResourceType>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let envelope = resources::get(&state, &ctx, resource_type, &id).await?;
    Ok(Json(envelope))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(resource_type): Extension<ResourceType>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse> {
    let envelope = resources::update(&state, &ctx, resource_type, &id, &body).await?;
    Ok(Json(envelope))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(resource_type): Extension<ResourceType>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    resources::delete(&state, &ctx, resource_type, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
