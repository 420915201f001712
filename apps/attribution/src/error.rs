//! Error types for the attribution service
//!
//! Errors render as a small JSON document that the API gateway logs but never
//! forwards to its own clients:
//!
//! ```json
//! { "statusCode": 404, "error": "Not Found", "message": "..." }
//! ```

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

pub const JSON_CONTENT_TYPE: &str = "application/json; charset=UTF-8";

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    /// The request was understood but its content cannot be stored.
    #[error("{0}")]
    BadData(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error(transparent)]
    Fhir(#[from] dpc_fhir_models::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn status(&self) -> StatusCode {
        match self {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::BadRequest(_) | Error::Fhir(_) => StatusCode::BAD_REQUEST,
            Error::BadData(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::Database(_) | Error::Internal(_) | Error::Other(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "Internal error");
            "An internal server error occurred".to_string()
        } else {
            self.to_string()
        };

        let body = Json(json!({
            "statusCode": status.as_u16(),
            "error": status.canonical_reason().unwrap_or("Unknown"),
            "message": message,
        }));

        let mut response = (status, body).into_response();
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(JSON_CONTENT_TYPE),
        );
        response
    }
}
