//! Request handlers

pub mod data;
pub mod export;
pub mod job;
pub mod resources;

use axum::{response::IntoResponse, Json};
use serde_json::json;

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

pub async fn not_found() -> crate::Error {
    crate::Error::NotFound("Resource not found".to_string())
}
