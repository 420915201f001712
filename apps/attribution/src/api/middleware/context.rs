//! Request context from gateway-forwarded headers

use axum::{
    body::HttpBody as _,
    extract::Request,
    http::{header, HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::Span;
use uuid::Uuid;

use crate::error::JSON_CONTENT_TYPE;
use crate::request_context::RequestContext;

pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const ORG_HEADER: &str = "x-org";
pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";
pub const REQUEST_URL_HEADER: &str = "x-request-url";

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

/// Build the [`RequestContext`] for handlers and log the request outcome.
#[tracing::instrument(
    name = "http_request",
    skip_all,
    fields(
        http.method = %req.method(),
        http.route = %req.uri().path(),
        http.response.status_code = tracing::field::Empty,
        request_id = tracing::field::Empty,
        organization_id = tracing::field::Empty,
    )
)]
pub async fn request_context_middleware(mut req: Request, next: Next) -> Response {
    let span = Span::current();
    let start = Instant::now();

    let headers = req.headers();
    let ctx = RequestContext {
        request_id: header_value(headers, REQUEST_ID_HEADER)
            .unwrap_or_else(|| Uuid::new_v4().to_string()),
        organization_id: header_value(headers, ORG_HEADER),
        requesting_ip: header_value(headers, FORWARDED_FOR_HEADER),
        request_url: header_value(headers, REQUEST_URL_HEADER),
    };
    span.record("request_id", ctx.request_id.as_str());
    if let Some(org) = &ctx.organization_id {
        span.record("organization_id", org.as_str());
    }

    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let request_id = ctx.request_id.clone();
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

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// Every response body from this service is JSON. Empty answers such as a
/// 204 after a delete carry no content type.
pub async fn json_content_type(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;
    if response.body().size_hint().exact() == Some(0) {
        return response;
    }
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(JSON_CONTENT_TYPE),
    );
    response
}
