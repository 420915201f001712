//! Envelope passthrough shared by the organization, practitioner and group handlers
//!
//! Successful answers are returned as the attribution service sent them; the
//! `fhir_model` middleware on the route turns the envelope into a resource.

use axum::{
    body::Bytes,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use dpc_fhir_models::ResourceType;

use crate::error::{ApiError, Result};
use crate::request_context::RequestContext;
use crate::state::AppState;

fn envelope(body: Bytes) -> Response {
    (StatusCode::OK, body).into_response()
}

pub async fn read(
    state: &AppState,
    ctx: &RequestContext,
    resource_type: ResourceType,
    id: &str,
) -> Result<Response> {
    let body = state
        .attribution
        .get(ctx, resource_type, id)
        .await
        .map_err(|e| {
            tracing::warn!(request_id = %ctx.request_id, id = %id, error = %e, "Failed to get {resource_type} from attribution");
            ApiError::not_found(ctx, format!("Failed to find {}", resource_type.label()))
        })?;
    Ok(envelope(body))
}

pub async fn create(
    state: &AppState,
    ctx: &RequestContext,
    resource_type: ResourceType,
    body: Bytes,
) -> Result<Response> {
    let body = state
        .attribution
        .post(ctx, resource_type, body)
        .await
        .map_err(|e| {
            tracing::error!(request_id = %ctx.request_id, error = %e, "Failed to save {resource_type} to attribution");
            ApiError::server_issue(
                ctx,
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("Failed to save {}", resource_type.label()),
            )
        })?;
    Ok(envelope(body))
}

pub async fn update(
    state: &AppState,
    ctx: &RequestContext,
    resource_type: ResourceType,
    id: &str,
    body: Bytes,
) -> Result<Response> {
    let body = state
        .attribution
        .put(ctx, resource_type, id, body)
        .await
        .map_err(|e| {
            tracing::error!(request_id = %ctx.request_id, id = %id, error = %e, "Failed to update {resource_type} in attribution");
            ApiError::server_issue(
                ctx,
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("Failed to save {}", resource_type.label()),
            )
        })?;
    Ok(envelope(body))
}

pub async fn delete(
    state: &AppState,
    ctx: &RequestContext,
    resource_type: ResourceType,
    id: &str,
) -> Result<Response> {
    state
        .attribution
        .delete(ctx, resource_type, id)
        .await
        .map_err(|e| {
            tracing::warn!(request_id = %ctx.request_id, id = %id, error = %e, "Failed to delete {resource_type} in attribution");
            ApiError::not_found(ctx, format!("Failed to find {}", resource_type.label()))
        })?;
    Ok(StatusCode::NO_CONTENT.into_response())
}
