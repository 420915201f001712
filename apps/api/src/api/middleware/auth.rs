//! Caller organization for the public API

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Extension,
};

use crate::config::AuthMode;
use crate::error::ApiError;
use crate::request_context::RequestContext;
use crate::state::AppState;

pub const ORG_HEADER: &str = "x-org";

fn bearer_token(req: &Request) -> Option<&str> {
    let value = req.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Resolve the organization the caller acts for and store it in the context.
///
/// Requests without a usable identity stop here with 403.
pub async fn auth_context(
    State(state): State<AppState>,
    Extension(mut ctx): Extension<RequestContext>,
    mut req: Request,
    next: Next,
) -> Response {
    match state.config.auth.mode {
        AuthMode::Header => {
            let org = req
                .headers()
                .get(ORG_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty());
            let Some(org) = org else {
                tracing::warn!(request_id = %ctx.request_id, "Missing organization header");
                return ApiError::server_issue(&ctx, StatusCode::FORBIDDEN, "Missing organization")
                    .into_response();
            };
            ctx.organization_id = Some(org.to_string());
        }
        AuthMode::Ssas => {
            let Some(token) = bearer_token(&req) else {
                tracing::warn!(request_id = %ctx.request_id, "Missing access token");
                return ApiError::server_issue(&ctx, StatusCode::FORBIDDEN, "Missing access token")
                    .into_response();
            };
            let info = match state.ssas.validate_token(&ctx, token).await {
                Ok(info) => info,
                Err(e) => {
                    tracing::warn!(request_id = %ctx.request_id, error = %e, "Invalid access token");
                    return ApiError::server_issue(&ctx, StatusCode::FORBIDDEN, "Invalid access token")
                        .into_response();
                }
            };
            let Some(org) = info.organization_id.filter(|o| !o.is_empty()) else {
                tracing::warn!(request_id = %ctx.request_id, "Access token has no organization");
                return ApiError::server_issue(&ctx, StatusCode::FORBIDDEN, "Invalid access token")
                    .into_response();
            };
            ctx.organization_id = Some(org);
            ctx.implementer_id = info.implementer_id;
        }
    }

    if let Some(org) = &ctx.organization_id {
        tracing::Span::current().record("organization_id", org.as_str());
    }
    req.extensions_mut().insert(ctx);
    next.run(req).await
}
