//! Path parameters into the request context

use axum::{
    extract::{Path, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Extension,
};

use crate::error::ApiError;
use crate::request_context::RequestContext;

/// Which context field a route's single path parameter fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathId {
    /// Admin routes address an organization directly.
    Organization,
    Group,
    Job,
    FileName,
}

pub async fn bind_path_id(
    State(field): State<PathId>,
    Extension(mut ctx): Extension<RequestContext>,
    Path(value): Path<String>,
    mut req: Request,
    next: Next,
) -> Response {
    match field {
        PathId::Organization => ctx.organization_id = Some(value),
        PathId::Group => ctx.group_id = Some(value),
        PathId::Job => ctx.job_id = Some(value),
        PathId::FileName => ctx.file_name = Some(value),
    }
    req.extensions_mut().insert(ctx);
    next.run(req).await
}

/// Public organization routes only address the caller's own organization.
pub async fn require_own_organization(
    Extension(ctx): Extension<RequestContext>,
    Path(organization_id): Path<String>,
    req: Request,
    next: Next,
) -> Response {
    let allowed = ctx
        .organization_id
        .as_deref()
        .is_some_and(|own| own.eq_ignore_ascii_case(&organization_id));
    if !allowed {
        tracing::warn!(
            request_id = %ctx.request_id,
            requested = %organization_id,
            "Organization does not match the caller"
        );
        return ApiError::business_violation(&ctx, StatusCode::UNAUTHORIZED, "Not Allowed")
            .into_response();
    }
    next.run(req).await
}
