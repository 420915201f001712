use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Extension,
};

use crate::error::{ApiError, Result};
use crate::request_context::RequestContext;
use crate::state::AppState;

/// Exchange a client assertion for an access token at the token service.
pub async fn auth_token(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response> {
    if body.is_empty() {
        return Err(ApiError::business_violation(
            &ctx,
            StatusCode::BAD_REQUEST,
            "Body is required",
        ));
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    let token = state
        .ssas
        .authenticate(&ctx, content_type, body)
        .await
        .map_err(|e| {
            tracing::error!(request_id = %ctx.request_id, error = %e, "Token service rejected authentication");
            ApiError::server_issue(
                &ctx,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to authenticate token",
            )
        })?;

    if token.is_empty() {
        tracing::error!(request_id = %ctx.request_id, "Token service returned an empty body");
        return Err(ApiError::server_issue(
            &ctx,
            StatusCode::INTERNAL_SERVER_ERROR,
            "No token returned from SSAS",
        ));
    }
    Ok((StatusCode::OK, token).into_response())
}
