//! Error types for FHIR models

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid FHIR resource: {0}")]
    InvalidResource(String),

    #[error("Expected resource type {expected}, found {found}")]
    ResourceTypeMismatch { expected: String, found: String },

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid field value: {0}")]
    InvalidFieldValue(String),

    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(String),
}

pub type Result<T> = std::result::Result<T, Error>;
