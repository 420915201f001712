//! Group creation and bulk export kick-off

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Extension,
};
use dpc_fhir_models::{Group, ResourceEnvelope, ResourceType};
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use super::resources;
use crate::error::{ApiError, Result};
use crate::request_context::RequestContext;
use crate::state::AppState;

const OUTPUT_FORMATS: [&str; 3] = ["application/fhir+ndjson", "application/ndjson", "ndjson"];
const RESPOND_ASYNC: &str = "respond-async";

#[derive(Debug, Default, Deserialize)]
pub struct OutputFormatQuery {
    #[serde(rename = "_outputFormat")]
    pub output_format: Option<String>,
}

pub async fn create(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    body: Bytes,
) -> Result<Response> {
    resources::create(&state, &ctx, ResourceType::Group, body).await
}

/// `_outputFormat` is optional; when given it must name NDJSON.
fn check_output_format(ctx: &RequestContext, format: Option<&str>) -> Result<()> {
    match format {
        Some(format)
            if !OUTPUT_FORMATS
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(format.trim())) =>
        {
            Err(ApiError::business_violation(
                ctx,
                StatusCode::BAD_REQUEST,
                "'_outputFormat' query parameter must be 'application/fhir+ndjson', 'application/ndjson', or 'ndjson'",
            ))
        }
        _ => Ok(()),
    }
}

fn check_prefer(ctx: &RequestContext, headers: &HeaderMap) -> Result<()> {
    let prefer = headers
        .get("prefer")
        .and_then(|v| v.to_str().ok())
        .map(str::trim);
    match prefer {
        Some(value) if value.eq_ignore_ascii_case(RESPOND_ASYNC) => Ok(()),
        Some(_) => Err(ApiError::business_violation(
            ctx,
            StatusCode::BAD_REQUEST,
            "The 'Prefer' header must be 'respond-async'",
        )),
        None => Err(ApiError::business_violation(
            ctx,
            StatusCode::BAD_REQUEST,
            "The 'Prefer' header is required and must be 'respond-async'",
        )),
    }
}

/// Where the client polls for the job: the called URL with its path replaced.
fn job_location(state: &AppState, ctx: &RequestContext, job_id: &str) -> String {
    match ctx.request_url.as_deref().map(Url::parse) {
        Some(Ok(mut url)) => {
            url.set_path(&format!("/v2/Jobs/{job_id}"));
            url.set_query(None);
            url.to_string()
        }
        _ => format!(
            "{}/Jobs/{}",
            state.config.export.api_path.trim_end_matches('/'),
            job_id
        ),
    }
}

pub async fn export(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<OutputFormatQuery>,
    headers: HeaderMap,
) -> Result<Response> {
    let Some(group_id) = ctx.group_id.clone() else {
        return Err(ApiError::business_violation(
            &ctx,
            StatusCode::BAD_REQUEST,
            "Failed to extract group id from url, please check the url",
        ));
    };

    let body = state
        .attribution
        .get(&ctx, ResourceType::Group, &group_id)
        .await
        .map_err(|e| {
            tracing::warn!(request_id = %ctx.request_id, group_id = %group_id, error = %e, "Failed to find group for export");
            ApiError::not_found(&ctx, "Failed to find the group")
        })?;

    check_output_format(&ctx, query.output_format.as_deref())?;
    check_prefer(&ctx, &headers)?;

    let patients = ResourceEnvelope::from_slice(&body)
        .and_then(|envelope| Group::from_value(&Value::Object(envelope.info)))
        .and_then(|group| group.patient_mbis())
        .map_err(|e| {
            tracing::error!(request_id = %ctx.request_id, group_id = %group_id, error = %e, "Failed to read group members");
            ApiError::generic_server_issue(&ctx)
        })?;
    if patients.is_empty() {
        return Err(ApiError::business_violation(
            &ctx,
            StatusCode::BAD_REQUEST,
            "The group must contain active patients",
        ));
    }

    let job = state.attribution.export(&ctx, &group_id).await.map_err(|e| {
        tracing::error!(request_id = %ctx.request_id, group_id = %group_id, error = %e, "Failed to start export job");
        ApiError::generic_server_issue(&ctx)
    })?;

    tracing::info!(
        request_id = %ctx.request_id,
        group_id = %group_id,
        job_id = %job.id,
        "Export job queued"
    );
    Ok((
        StatusCode::ACCEPTED,
        [(header::CONTENT_LOCATION, job_location(&state, &ctx, &job.id))],
    )
        .into_response())
}
