use axum::{
    extract::{Path, State},
    Extension, Json,
};
use dpc_fhir_models::FileInfo;

use crate::request_context::RequestContext;
use crate::state::AppState;
use crate::{Error, Result};

/// `GET /Data/{fileName}`: confirm an export file may be downloaded by the caller.
pub async fn file_info(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(file_name): Path<String>,
) -> Result<Json<FileInfo>> {
    let organization_id = ctx.require_organization()?;
    state
        .jobs
        .file_info(organization_id, &file_name)
        .await?
        .map(Json)
        .ok_or_else(|| Error::NotFound(format!("File {} not found", file_name)))
}
