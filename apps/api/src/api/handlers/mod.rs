//! Request handlers

pub mod data;
pub mod group;
pub mod job;
pub mod metadata;
pub mod organization;
pub mod practitioner;
pub mod resources;
pub mod token;

use axum::{response::IntoResponse, Extension, Json};
use serde_json::json;

use crate::error::ApiError;
use crate::request_context::RequestContext;

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

pub async fn not_found(Extension(ctx): Extension<RequestContext>) -> ApiError {
    ApiError::not_found(&ctx, "Not Found")
}
