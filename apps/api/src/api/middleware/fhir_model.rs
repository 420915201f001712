//! Response shaping: storage envelope to FHIR resource
//!
//! Handlers on envelope routes answer with the attribution service's body,
//! `{id, version, updatedAt, info}`. This middleware buffers that body and
//! replaces it with `info` plus `id` and a synthesized `meta`. Error responses
//! pass through untouched.

use axum::{
    body::Body,
    extract::Request,
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use dpc_fhir_models::ResourceEnvelope;

use crate::error::ApiError;
use crate::request_context::RequestContext;

/// Envelope bytes to FHIR resource bytes.
pub fn shape(envelope: &[u8]) -> dpc_fhir_models::Result<Vec<u8>> {
    let resource = ResourceEnvelope::from_slice(envelope)?.into_resource()?;
    Ok(serde_json::to_vec(&resource)?)
}

pub async fn fhir_model(req: Request, next: Next) -> Response {
    let ctx = req
        .extensions()
        .get::<RequestContext>()
        .cloned()
        .unwrap_or_default();

    let response = next.run(req).await;
    if !response.status().is_success() {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(request_id = %ctx.request_id, error = %e, "Failed to buffer response body");
            return ApiError::generic_server_issue(&ctx).into_response();
        }
    };

    match shape(&bytes) {
        Ok(resource) => {
            parts.headers.remove(header::CONTENT_LENGTH);
            Response::from_parts(parts, Body::from(resource))
        }
        Err(e) => {
            tracing::error!(
                request_id = %ctx.request_id,
                error = %e,
                "Failed to convert resource envelope"
            );
            ApiError::generic_server_issue(&ctx).into_response()
        }
    }
}
