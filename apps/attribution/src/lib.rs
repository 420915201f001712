//! DPC attribution service
//!
//! Stores organizations, practitioners and attribution groups as enveloped FHIR
//! resources in Postgres and queues bulk export jobs for the API gateway.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod request_context;
pub mod services;
pub mod state;

pub use config::Config;
pub use error::{Error, Result};
pub use state::AppState;
