//! DPC API gateway
//!
//! Two routers share one [`AppState`]:
//! - the public API (`/v2/...`) for authenticated organizations
//! - the admin API for organization management, served on its own listener
//!
//! Both forward to the attribution service and turn its storage envelopes into
//! FHIR resources on the way out.

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod request_context;
pub mod state;

pub use config::Config;
pub use error::{ApiError, Result};
pub use state::AppState;
