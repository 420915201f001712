//! Middleware stack for the attribution API

pub mod context;
pub mod layers;

pub use context::{json_content_type, request_context_middleware};
pub use layers::trace;
