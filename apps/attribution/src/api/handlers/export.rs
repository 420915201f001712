use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use dpc_fhir_models::JobCreated;

use crate::request_context::RequestContext;
use crate::services::export::{self, ExportParams};
use crate::state::AppState;
use crate::Result;

/// `GET /Group/{id}/$export`: queue an export job for the group's patients.
pub async fn export(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(group_id): Path<String>,
    Query(params): Query<ExportParams>,
) -> Result<Json<JobCreated>> {
    let job = export::start_export(&state, &ctx, &group_id, &params).await?;
    Ok(Json(job))
}
