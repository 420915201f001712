//! Middleware stack for the gateway

pub mod auth;
pub mod context;
pub mod export;
pub mod fhir_filter;
pub mod fhir_model;
pub mod layers;
pub mod path;

pub use auth::auth_context;
pub use context::{fhir_content_type, request_context_middleware};
pub use export::export_params;
pub use fhir_filter::{fhir_filter, FhirFilter};
pub use fhir_model::fhir_model;
pub use layers::{compression, cors};
pub use path::{bind_path_id, require_own_organization, PathId};
