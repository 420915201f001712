//! Bulk export job status

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use chrono::Utc;
use dpc_fhir_models::JobProgress;

use crate::error::{ApiError, Result};
use crate::request_context::RequestContext;
use crate::state::AppState;

/// RFC 1123 as used by the `Expires` header.
const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

pub async fn status(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<Response> {
    let Some(job_id) = ctx.job_id.clone() else {
        return Err(ApiError::business_violation(
            &ctx,
            StatusCode::BAD_REQUEST,
            "Failed to extract job id from url, please check the url",
        ));
    };

    let batches = state
        .attribution
        .job_batches(&ctx, &job_id)
        .await
        .map_err(|e| {
            tracing::warn!(request_id = %ctx.request_id, job_id = %job_id, error = %e, "Failed to get job batches");
            ApiError::not_found(&ctx, "Failed to get job status")
        })?;

    let progress = JobProgress::from_batches(&batches, Utc::now(), &state.config.export.api_path);
    tracing::debug!(request_id = %ctx.request_id, job_id = %job_id, progress = ?progress, "Job status");

    let response = match progress {
        JobProgress::Failed => {
            tracing::error!(request_id = %ctx.request_id, job_id = %job_id, "Export job failed");
            return Err(ApiError::generic_server_issue(&ctx));
        }
        JobProgress::InProgress { progress } => {
            (StatusCode::ACCEPTED, [("x-progress", progress)]).into_response()
        }
        JobProgress::Expired => StatusCode::GONE.into_response(),
        JobProgress::Complete { report, expires } => (
            StatusCode::OK,
            [(header::EXPIRES, expires.format(HTTP_DATE_FORMAT).to_string())],
            Json(report),
        )
            .into_response(),
        JobProgress::Pending => StatusCode::ACCEPTED.into_response(),
    };
    Ok(response)
}
