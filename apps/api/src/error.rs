//! Errors reported to API clients
//!
//! Every failure leaves the gateway as a single-issue `OperationOutcome` whose
//! `diagnostics` is the request id. An [`ApiError`] therefore captures the
//! request id when it is built, since `IntoResponse` has no access to the
//! request.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use dpc_fhir_models::{IssueCode, OperationOutcome};
use thiserror::Error;

use crate::request_context::RequestContext;

pub const FHIR_JSON_CONTENT_TYPE: &str = "application/fhir+json; charset=UTF-8";
pub const FHIR_NDJSON_CONTENT_TYPE: &str = "application/fhir+ndjson";

pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Error)]
#[error("{message}")]
pub struct ApiError {
    pub status: StatusCode,
    pub code: IssueCode,
    pub message: String,
    pub request_id: String,
}

impl ApiError {
    pub fn new(
        ctx: &RequestContext,
        status: StatusCode,
        code: IssueCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            request_id: ctx.request_id.clone(),
        }
    }

    /// The request itself is wrong: invalid resource, bad parameter, not allowed.
    pub fn business_violation(
        ctx: &RequestContext,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self::new(ctx, status, IssueCode::BusinessRule, message)
    }

    pub fn server_issue(ctx: &RequestContext, status: StatusCode, message: impl Into<String>) -> Self {
        Self::new(ctx, status, IssueCode::Exception, message)
    }

    pub fn not_found(ctx: &RequestContext, message: impl Into<String>) -> Self {
        Self::new(ctx, StatusCode::NOT_FOUND, IssueCode::NotFound, message)
    }

    pub fn generic_server_issue(ctx: &RequestContext) -> Self {
        Self::server_issue(ctx, StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
    }

    pub fn outcome(&self) -> OperationOutcome {
        OperationOutcome::new(self.code, self.message.clone(), Some(&self.request_id))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(
                request_id = %self.request_id,
                status = self.status.as_u16(),
                error = %self.message,
                "Request failed"
            );
        } else {
            tracing::warn!(
                request_id = %self.request_id,
                status = self.status.as_u16(),
                error = %self.message,
                "Request rejected"
            );
        }
        outcome_response(self.status, &self.outcome())
    }
}

/// Serialize `outcome` with the FHIR JSON content type.
///
/// Falls back to a bare 500 when the document cannot be serialized.
pub fn outcome_response(status: StatusCode, outcome: &OperationOutcome) -> Response {
    match serde_json::to_vec(outcome) {
        Ok(body) => {
            let mut response = (status, body).into_response();
            response.headers_mut().insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static(FHIR_JSON_CONTENT_TYPE),
            );
            response
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize OperationOutcome");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    }
}
