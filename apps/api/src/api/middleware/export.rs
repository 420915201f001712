//! Bulk export query parameters

use axum::{
    extract::{Query, Request},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Extension,
};
use chrono::{DateTime, SecondsFormat, Utc};
use dpc_fhir_models::job::EXPORT_RESOURCE_TYPES;
use serde::Deserialize;

use crate::error::ApiError;
use crate::request_context::RequestContext;

#[derive(Debug, Default, Deserialize)]
pub struct ExportQuery {
    #[serde(rename = "_type")]
    pub types: Option<String>,
    #[serde(rename = "_since")]
    pub since: Option<String>,
}

/// `_type` with the default applied, or `None` when an entry is not exportable.
pub fn export_types(raw: Option<&str>) -> Option<String> {
    let raw = raw.map(str::trim).filter(|t| !t.is_empty());
    let Some(raw) = raw else {
        return Some(EXPORT_RESOURCE_TYPES.join(","));
    };
    raw.split(',')
        .map(str::trim)
        .all(|t| EXPORT_RESOURCE_TYPES.contains(&t))
        .then(|| raw.to_string())
}

/// Normalized `_since`, rejecting unparseable and future instants.
pub fn export_since(raw: Option<&str>, now: DateTime<Utc>) -> Result<Option<String>, &'static str> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    let since = DateTime::parse_from_rfc3339(raw)
        .map_err(|_| "Could not parse _since")?
        .with_timezone(&Utc);
    if since > now {
        return Err("_since cannot be a future date");
    }
    Ok(Some(since.to_rfc3339_opts(SecondsFormat::AutoSi, true)))
}

pub async fn export_params(
    Extension(mut ctx): Extension<RequestContext>,
    Query(query): Query<ExportQuery>,
    mut req: Request,
    next: Next,
) -> Response {
    let Some(types) = export_types(query.types.as_deref()) else {
        tracing::warn!(request_id = %ctx.request_id, types = ?query.types, "Invalid resource type");
        return ApiError::business_violation(&ctx, StatusCode::BAD_REQUEST, "Invalid resource type")
            .into_response();
    };
    let since = match export_since(query.since.as_deref(), Utc::now()) {
        Ok(since) => since,
        Err(message) => {
            tracing::warn!(request_id = %ctx.request_id, since = ?query.since, error = message, "Invalid _since");
            return ApiError::business_violation(&ctx, StatusCode::BAD_REQUEST, message)
                .into_response();
        }
    };

    ctx.resource_types = Some(types);
    ctx.since = since;
    req.extensions_mut().insert(ctx);
    next.run(req).await
}
