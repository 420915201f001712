//! Organization handlers
//!
//! The organization id always comes from the request context: the admin
//! routes bind it from the path, the public route from the caller's identity
//! after checking it matches the path.

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::Response,
    Extension,
};
use dpc_fhir_models::ResourceType;

use super::resources;
use crate::error::{ApiError, Result};
use crate::request_context::RequestContext;
use crate::state::AppState;

fn organization_id(ctx: &RequestContext) -> Result<&str> {
    ctx.organization_id.as_deref().ok_or_else(|| {
        ApiError::business_violation(
            ctx,
            StatusCode::BAD_REQUEST,
            "Failed to extract organization id from url, please check the url",
        )
    })
}

pub async fn read(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<Response> {
    let id = organization_id(&ctx)?;
    resources::read(&state, &ctx, ResourceType::Organization, id).await
}

pub async fn create(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    body: Bytes,
) -> Result<Response> {
    resources::create(&state, &ctx, ResourceType::Organization, body).await
}

pub async fn update(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    body: Bytes,
) -> Result<Response> {
    let id = organization_id(&ctx)?;
    resources::update(&state, &ctx, ResourceType::Organization, id, body).await
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<Response> {
    let id = organization_id(&ctx)?;
    resources::delete(&state, &ctx, ResourceType::Organization, id).await
}
