//! FHIR models shared by the DPC services
//!
//! The attribution service stores every FHIR resource inside a storage envelope
//! (`{id, version, createdAt, updatedAt, info}`), while the API gateway speaks plain
//! FHIR to its clients. This crate holds the types both sides agree on:
//!
//! - `envelope`: the storage envelope and its conversion into a FHIR resource
//! - `outcome`: `OperationOutcome` documents used for every error response
//! - `validation`: structural checks for inbound resource bodies
//! - `group`: attribution data carried by `Group.member`
//! - `job`: bulk export batches, files and the job status report
//!
//! # Example
//!
//! ```rust
//! use dpc_fhir_models::ResourceEnvelope;
//! use serde_json::json;
//!
//! let envelope: ResourceEnvelope = serde_json::from_value(json!({
//!     "id": "42",
//!     "version": 1,
//!     "updatedAt": "2021-03-02T08:15:30.123Z",
//!     "info": { "resourceType": "Organization", "name": "Example" }
//! }))
//! .unwrap();
//!
//! let resource = envelope.into_resource().unwrap();
//! assert_eq!(resource["id"], "42");
//! assert_eq!(resource["meta"]["id"], "Organization/42");
//! ```

pub mod envelope;
pub mod error;
pub mod group;
pub mod identifier;
pub mod job;
pub mod outcome;
pub mod resource;
pub mod validation;

pub use envelope::ResourceEnvelope;
pub use error::{Error, Result};
pub use group::{Attribution, Group, GroupMember};
pub use identifier::{find_npi, Identifier, Reference, MBI_SYSTEM, NPI_SYSTEM};
pub use job::{BatchAndFiles, BatchFile, BatchInfo, FileInfo, JobCreated, JobProgress, JobStatus};
pub use outcome::{IssueCode, IssueSeverity, OperationOutcome};
pub use resource::ResourceType;
pub use validation::validate_resource;
