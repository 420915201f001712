//! Request context and request id handling

use axum::{
    body::HttpBody as _,
    extract::{ConnectInfo, Request},
    http::{header, HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use opentelemetry::trace::TraceContextExt;
use std::net::SocketAddr;
use std::time::Instant;
use tracing::Span;
use tracing_opentelemetry::OpenTelemetrySpanExt;
use uuid::Uuid;

use crate::error::{FHIR_JSON_CONTENT_TYPE, FHIR_NDJSON_CONTENT_TYPE};
use crate::request_context::RequestContext;

pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";
pub const FORWARDED_PROTO_HEADER: &str = "x-forwarded-proto";

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

/// `{scheme}://{host}{path?query}` as the client addressed it.
fn request_url(req: &Request) -> Option<String> {
    let headers = req.headers();
    let host = header_value(headers, header::HOST.as_str())
        .or_else(|| req.uri().authority().map(|a| a.to_string()))?;
    let scheme = header_value(headers, FORWARDED_PROTO_HEADER)
        .or_else(|| req.uri().scheme_str().map(String::from))
        .unwrap_or_else(|| "http".to_string());
    let path = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    Some(format!("{scheme}://{host}{path}"))
}

/// Create the [`RequestContext`] and the `http_request` span for a request.
///
/// The client's `X-Request-Id` is kept when present so its value shows up in
/// error diagnostics and in the attribution service's logs. The id is echoed on
/// every response.
#[tracing::instrument(
    name = "http_request",
    skip_all,
    fields(
        http.method = %req.method(),
        http.route = %req.uri().path(),
        otel.kind = "server",
        http.response.status_code = tracing::field::Empty,
        request_id = tracing::field::Empty,
        organization_id = tracing::field::Empty,
    )
)]
pub async fn request_context_middleware(mut req: Request, next: Next) -> Response {
    let span = Span::current();
    let start = Instant::now();

    let request_id = header_value(req.headers(), REQUEST_ID_HEADER)
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    span.record("request_id", request_id.as_str());

    let requesting_ip = header_value(req.headers(), FORWARDED_FOR_HEADER).or_else(|| {
        req.extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
    });
    let ctx = RequestContext {
        requesting_ip,
        request_url: request_url(&req),
        ..RequestContext::new(request_id.clone())
    };

    let method = req.method().clone();
    let path = req.uri().path().to_string();
    req.extensions_mut().insert(ctx);

    let mut response = next.run(req).await;

    let status = response.status();
    span.record("http.response.status_code", status.as_u16());
    tracing::info!(
        method = %method,
        path = %path,
        status = status.as_u16(),
        duration_ms = start.elapsed().as_millis(),
        "Request completed"
    );

    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        headers.insert(REQUEST_ID_HEADER, value);
    }
    let trace_id = span.context().span().span_context().trace_id();
    if trace_id != opentelemetry::trace::TraceId::INVALID {
        if let Ok(value) = HeaderValue::from_str(&trace_id.to_string()) {
            headers.insert("x-trace-id", value);
        }
    }
    response
}

/// FHIR routes answer with the FHIR JSON content type, except bulk data files.
///
/// Bodiless answers (204, 202 while a job runs, 410) get no content type.
pub async fn fhir_content_type(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;
    if response.body().size_hint().exact() == Some(0) {
        return response;
    }
    let is_ndjson = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with(FHIR_NDJSON_CONTENT_TYPE));
    if !is_ndjson {
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(FHIR_JSON_CONTENT_TYPE),
        );
    }
    response
}
