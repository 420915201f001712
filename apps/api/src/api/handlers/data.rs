//! Bulk export output files

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Extension,
};
use futures::stream;
use std::path::PathBuf;
use tokio::io::AsyncReadExt;

use crate::error::{ApiError, Result, FHIR_NDJSON_CONTENT_TYPE};
use crate::request_context::RequestContext;
use crate::state::AppState;

const NDJSON_SUFFIX: &str = ".ndjson";
const CHUNK_SIZE: usize = 64 * 1024;

/// Export file names are flat; anything that could leave the export directory is refused.
fn file_stem(requested: &str) -> Option<&str> {
    let name = requested.strip_suffix(NDJSON_SUFFIX).unwrap_or(requested);
    let traverses = name.contains('/') || name.contains('\\') || name.contains("..");
    (!name.is_empty() && !traverses).then_some(name)
}

pub async fn file(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<Response> {
    let requested = ctx.file_name.clone().unwrap_or_default();
    let Some(name) = file_stem(&requested) else {
        return Err(ApiError::business_violation(
            &ctx,
            StatusCode::BAD_REQUEST,
            "Invalid file name",
        ));
    };

    let info = state.attribution.file_info(&ctx, name).await.map_err(|e| {
        tracing::warn!(request_id = %ctx.request_id, file_name = %name, error = %e, "File not available");
        ApiError::not_found(&ctx, "Failed to find file")
    })?;

    let path = PathBuf::from(&state.config.export.directory).join(format!("{name}{NDJSON_SUFFIX}"));
    let file = tokio::fs::File::open(&path).await.map_err(|e| {
        tracing::error!(request_id = %ctx.request_id, path = %path.display(), error = %e, "Failed to open export file");
        ApiError::not_found(&ctx, "Failed to find file")
    })?;

    let chunks = stream::try_unfold(file, |mut file| async move {
        let mut buf = vec![0u8; CHUNK_SIZE];
        let read = file.read(&mut buf).await?;
        if read == 0 {
            return Ok::<_, std::io::Error>(None);
        }
        buf.truncate(read);
        Ok(Some((Bytes::from(buf), file)))
    });

    tracing::info!(
        request_id = %ctx.request_id,
        file_name = %info.file_name,
        file_length = info.file_length,
        "Serving export file"
    );
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, FHIR_NDJSON_CONTENT_TYPE.to_string()),
            (header::ETAG, format!("\"{}\"", info.file_checksum)),
        ],
        Body::from_stream(chunks),
    )
        .into_response())
}
