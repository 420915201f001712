//! Storage traits
//!
//! Handlers hold these as `Arc<dyn ...>` so tests can swap in in-memory stores.

use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dpc_fhir_models::{BatchAndFiles, FileInfo, ResourceEnvelope, ResourceType};
use serde_json::{Map, Value};

/// Organization a stored resource belongs to.
///
/// Organizations themselves are global; practitioners and groups are always
/// read and written within one organization.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    pub organization_id: Option<&'a str>,
}

impl<'a> Scope<'a> {
    pub fn global() -> Self {
        Self {
            organization_id: None,
        }
    }

    pub fn organization(organization_id: &'a str) -> Self {
        Self {
            organization_id: Some(organization_id),
        }
    }
}

#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Read a resource by id. Returns `None` for unknown ids, ids that are not UUIDs
    /// and resources outside `scope`.
    async fn find(
        &self,
        resource_type: ResourceType,
        scope: Scope<'_>,
        id: &str,
    ) -> Result<Option<ResourceEnvelope>>;

    /// Store a new resource at version 1.
    ///
    /// # Errors
    /// `Error::BadData` when another resource of the same type in the same scope
    /// already carries `npi`.
    async fn insert(
        &self,
        resource_type: ResourceType,
        scope: Scope<'_>,
        npi: Option<&str>,
        info: Map<String, Value>,
    ) -> Result<ResourceEnvelope>;

    /// Replace the body of an existing resource, bumping its version.
    ///
    /// Returns `None` when the resource does not exist in `scope`. The NPI
    /// uniqueness check ignores the resource being updated.
    async fn update(
        &self,
        resource_type: ResourceType,
        scope: Scope<'_>,
        id: &str,
        npi: Option<&str>,
        info: Map<String, Value>,
    ) -> Result<Option<ResourceEnvelope>>;

    /// Returns `false` when nothing was deleted.
    async fn delete(&self, resource_type: ResourceType, scope: Scope<'_>, id: &str) -> Result<bool>;
}

/// One `job_queue_batch` row about to be queued.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBatch {
    pub organization_id: String,
    pub organization_npi: String,
    pub provider_npi: String,
    pub patients: Vec<String>,
    pub resource_types: String,
    pub since: Option<DateTime<Utc>>,
    pub priority: i32,
    pub transaction_time: DateTime<Utc>,
    pub submit_time: DateTime<Utc>,
    pub request_url: String,
    pub requesting_ip: String,
}

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert all batches under one fresh job id, atomically. Returns the job id.
    async fn insert_batches(&self, batches: &[NewBatch]) -> Result<String>;

    /// Batches of a job with their output files. Empty when the job is unknown
    /// or belongs to another organization.
    async fn job_batches(&self, organization_id: &str, job_id: &str) -> Result<Vec<BatchAndFiles>>;

    /// A file is downloadable once every batch of its job has completed.
    async fn file_info(&self, organization_id: &str, file_name: &str) -> Result<Option<FileInfo>>;
}
