use axum::{
    extract::{Path, State},
    Extension, Json,
};
use dpc_fhir_models::BatchAndFiles;

use crate::request_context::RequestContext;
use crate::state::AppState;
use crate::{Error, Result};

/// `GET /Job/{id}`: batches and output files of one of the caller's jobs.
pub async fn batches(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(job_id): Path<String>,
) -> Result<Json<Vec<BatchAndFiles>>> {
    let organization_id = ctx.require_organization()?;
    let batches = state.jobs.job_batches(organization_id, &job_id).await?;
    if batches.is_empty() {
        return Err(Error::NotFound(format!("Job {} not found", job_id)));
    }
    Ok(Json(batches))
}
