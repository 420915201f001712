//! In-memory stores with the same observable behavior as the Postgres ones.

use async_trait::async_trait;
use chrono::Utc;
use dpc_attribution::db::{JobStore, NewBatch, ResourceStore, Scope};
use dpc_attribution::{Error, Result};
use dpc_fhir_models::{find_npi, BatchAndFiles, FileInfo, JobStatus, ResourceEnvelope, ResourceType};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

struct Row {
    organization_id: Option<String>,
    envelope: ResourceEnvelope,
}

#[derive(Default)]
pub struct MemoryResourceStore {
    rows: Mutex<HashMap<(ResourceType, String), Row>>,
}

fn org_for(resource_type: ResourceType, scope: Scope<'_>) -> Result<Option<String>> {
    if resource_type == ResourceType::Organization {
        return Ok(None);
    }
    scope
        .organization_id
        .map(|org| Some(org.to_string()))
        .ok_or_else(|| Error::BadRequest("Missing organization header".to_string()))
}

impl MemoryResourceStore {
    fn check_npi(
        rows: &HashMap<(ResourceType, String), Row>,
        resource_type: ResourceType,
        org: &Option<String>,
        npi: &str,
        exclude: Option<&str>,
    ) -> Result<()> {
        let taken = rows.iter().any(|((rt, id), row)| {
            *rt == resource_type
                && Some(id.as_str()) != exclude
                && row.organization_id == *org
                && find_npi(&row.envelope.info).as_deref() == Some(npi)
        });
        if taken {
            return Err(Error::BadData(format!(
                "{} with npi already exists",
                resource_type.label()
            )));
        }
        Ok(())
    }

    pub fn count(&self, resource_type: ResourceType) -> usize {
        let rows = self.rows.lock().unwrap();
        rows.keys().filter(|(rt, _)| *rt == resource_type).count()
    }
}

#[async_trait]
impl ResourceStore for MemoryResourceStore {
    async fn find(
        &self,
        resource_type: ResourceType,
        scope: Scope<'_>,
        id: &str,
    ) -> Result<Option<ResourceEnvelope>> {
        let org = org_for(resource_type, scope)?;
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .get(&(resource_type, id.to_string()))
            .filter(|row| row.organization_id == org)
            .map(|row| row.envelope.clone()))
    }

    async fn insert(
        &self,
        resource_type: ResourceType,
        scope: Scope<'_>,
        npi: Option<&str>,
        info: Map<String, Value>,
    ) -> Result<ResourceEnvelope> {
        let org = org_for(resource_type, scope)?;
        let mut rows = self.rows.lock().unwrap();
        if let Some(npi) = npi {
            Self::check_npi(&rows, resource_type, &org, npi, None)?;
        }

        let now = Utc::now();
        let envelope = ResourceEnvelope {
            id: Uuid::new_v4().to_string(),
            version: 1,
            created_at: Some(now),
            updated_at: now,
            info,
        };
        rows.insert(
            (resource_type, envelope.id.clone()),
            Row {
                organization_id: org,
                envelope: envelope.clone(),
            },
        );
        Ok(envelope)
    }

    async fn update(
        &self,
        resource_type: ResourceType,
        scope: Scope<'_>,
        id: &str,
        npi: Option<&str>,
        info: Map<String, Value>,
    ) -> Result<Option<ResourceEnvelope>> {
        let org = org_for(resource_type, scope)?;
        let mut rows = self.rows.lock().unwrap();
        if let Some(npi) = npi {
            Self::check_npi(&rows, resource_type, &org, npi, Some(id))?;
        }

        let Some(row) = rows
            .get_mut(&(resource_type, id.to_string()))
            .filter(|row| row.organization_id == org)
        else {
            return Ok(None);
        };
        row.envelope.version += 1;
        row.envelope.updated_at = Utc::now();
        row.envelope.info = info;
        Ok(Some(row.envelope.clone()))
    }

    async fn delete(&self, resource_type: ResourceType, scope: Scope<'_>, id: &str) -> Result<bool> {
        let org = org_for(resource_type, scope)?;
        let mut rows = self.rows.lock().unwrap();
        let key = (resource_type, id.to_string());
        if rows.get(&key).map(|row| row.organization_id == org) == Some(true) {
            rows.remove(&key);
            return Ok(true);
        }
        Ok(false)
    }
}

#[derive(Default)]
pub struct MemoryJobStore {
    /// Batches queued through `insert_batches`, with their job id.
    pub queued: Mutex<Vec<(String, NewBatch)>>,
    /// Batches as workers left them, keyed by organization.
    pub existing: Mutex<Vec<(String, BatchAndFiles)>>,
}

impl MemoryJobStore {
    pub fn add_batch(&self, organization_id: &str, batch: BatchAndFiles) {
        self.existing
            .lock()
            .unwrap()
            .push((organization_id.to_string(), batch));
    }

    pub fn queued(&self) -> Vec<(String, NewBatch)> {
        self.queued.lock().unwrap().clone()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn insert_batches(&self, batches: &[NewBatch]) -> Result<String> {
        let job_id = Uuid::new_v4().to_string();
        let mut queued = self.queued.lock().unwrap();
        queued.extend(batches.iter().cloned().map(|b| (job_id.clone(), b)));
        Ok(job_id)
    }

    async fn job_batches(&self, organization_id: &str, job_id: &str) -> Result<Vec<BatchAndFiles>> {
        let existing = self.existing.lock().unwrap();
        Ok(existing
            .iter()
            .filter(|(org, b)| org == organization_id && b.batch.job_id == job_id)
            .map(|(_, b)| b.clone())
            .collect())
    }

    async fn file_info(&self, organization_id: &str, file_name: &str) -> Result<Option<FileInfo>> {
        let existing = self.existing.lock().unwrap();
        let Some((_, owner)) = existing.iter().find(|(org, b)| {
            org == organization_id && b.files.iter().any(|f| f.file_name == file_name)
        }) else {
            return Ok(None);
        };
        let job_done = existing
            .iter()
            .filter(|(_, b)| b.batch.job_id == owner.batch.job_id)
            .all(|(_, b)| b.batch.status == JobStatus::Completed);
        if !job_done {
            return Ok(None);
        }
        Ok(owner
            .files
            .iter()
            .find(|f| f.file_name == file_name)
            .map(|f| FileInfo {
                file_name: f.file_name.clone(),
                file_length: f.file_length,
                file_checksum: f.checksum.clone(),
            }))
    }
}
