//! Request body validation for FHIR writes
//!
//! POST and PUT bodies must be a well-formed resource of the route's type
//! before anything is sent to the attribution service. A rejected body ends
//! the request with a 400 Business Rule Violation, or a 413 when it is over
//! the listener's size limit; the handler never runs.

use axum::{
    body::Body,
    extract::{Request, State},
    http::{Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dpc_fhir_models::{find_npi, validate_resource, Group, ResourceType};
use serde_json::Value;

use crate::error::ApiError;
use crate::request_context::RequestContext;

#[derive(Debug, Clone, Copy)]
pub struct FhirFilter {
    pub resource_type: ResourceType,
    pub max_body_size: usize,
}

impl FhirFilter {
    pub fn new(resource_type: ResourceType, max_body_size: usize) -> Self {
        Self {
            resource_type,
            max_body_size,
        }
    }
}

/// Structural validation plus the rules DPC adds per resource type.
pub fn check_resource(resource_type: ResourceType, body: &[u8]) -> dpc_fhir_models::Result<()> {
    let resource = validate_resource(resource_type, body)?;
    match resource_type {
        ResourceType::Organization | ResourceType::Practitioner => {
            if find_npi(&resource).is_none() {
                return Err(dpc_fhir_models::Error::MissingField(
                    "identifier with an NPI".to_string(),
                ));
            }
        }
        ResourceType::Group => {
            Group::from_value(&Value::Object(resource))?.attributions()?;
        }
    }
    Ok(())
}

pub async fn fhir_filter(State(filter): State<FhirFilter>, req: Request, next: Next) -> Response {
    if !matches!(*req.method(), Method::POST | Method::PUT) {
        return next.run(req).await;
    }

    let ctx = req
        .extensions()
        .get::<RequestContext>()
        .cloned()
        .unwrap_or_default();
    let invalid = || {
        ApiError::business_violation(
            &ctx,
            StatusCode::BAD_REQUEST,
            format!("Not a valid {}", filter.resource_type.label()),
        )
        .into_response()
    };

    let (parts, body) = req.into_parts();
    let bytes = match axum::body::to_bytes(body, filter.max_body_size).await {
        Ok(bytes) => bytes,
        // The read is bounded by `max_body_size`; going over it is the only
        // failure a connected client gets to see.
        Err(e) => {
            tracing::warn!(
                request_id = %ctx.request_id,
                limit = filter.max_body_size,
                error = %e,
                "Request body too large"
            );
            return ApiError::server_issue(
                &ctx,
                StatusCode::PAYLOAD_TOO_LARGE,
                "Request body is too large",
            )
            .into_response();
        }
    };

    if let Err(e) = check_resource(filter.resource_type, &bytes) {
        tracing::warn!(
            request_id = %ctx.request_id,
            resource_type = %filter.resource_type,
            error = %e,
            "Invalid resource in request"
        );
        return invalid();
    }

    next.run(Request::from_parts(parts, Body::from(bytes))).await
}
