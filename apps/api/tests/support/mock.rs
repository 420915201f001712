//! In-memory stand-ins for the attribution and token services

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use dpc_api::client::{
    attribution::AttributionClient, ssas::SsasClient, ClientError, ClientResult, TokenInfo,
};
use dpc_api::request_context::RequestContext;
use dpc_fhir_models::{BatchAndFiles, FileInfo, JobCreated, ResourceType};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

/// One call the gateway made to the attribution service.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub operation: &'static str,
    pub resource_type: Option<ResourceType>,
    pub id: Option<String>,
    pub request_id: String,
    pub organization_id: Option<String>,
    pub resource_types: Option<String>,
    pub since: Option<String>,
}

impl RecordedCall {
    fn new(operation: &'static str, ctx: &RequestContext) -> Self {
        Self {
            operation,
            resource_type: None,
            id: None,
            request_id: ctx.request_id.clone(),
            organization_id: ctx.organization_id.clone(),
            resource_types: ctx.resource_types.clone(),
            since: ctx.since.clone(),
        }
    }
}

/// Attribution service keeping envelopes in memory, keyed by type and id.
#[derive(Default)]
pub struct MockAttribution {
    calls: Mutex<Vec<RecordedCall>>,
    resources: Mutex<HashMap<(ResourceType, String), Bytes>>,
    jobs: Mutex<HashMap<String, Vec<BatchAndFiles>>>,
    files: Mutex<HashMap<String, FileInfo>>,
    pub fail_writes: AtomicBool,
    pub fail_export: AtomicBool,
}

impl MockAttribution {
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Store `body` verbatim as the answer for `GET /{resource_type}/{id}`.
    pub fn insert_raw(&self, resource_type: ResourceType, id: &str, body: impl Into<Bytes>) {
        self.resources
            .lock()
            .unwrap()
            .insert((resource_type, id.to_string()), body.into());
    }

    pub fn insert_job(&self, job_id: &str, batches: Vec<BatchAndFiles>) {
        self.jobs.lock().unwrap().insert(job_id.to_string(), batches);
    }

    pub fn insert_file(&self, info: FileInfo) {
        self.files
            .lock()
            .unwrap()
            .insert(info.file_name.clone(), info);
    }

    fn record(&self, call: RecordedCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn not_found() -> ClientError {
        ClientError::Status {
            status: reqwest::StatusCode::NOT_FOUND,
            body: "not found".to_string(),
        }
    }

    fn unprocessable() -> ClientError {
        ClientError::Status {
            status: reqwest::StatusCode::UNPROCESSABLE_ENTITY,
            body: "cannot save".to_string(),
        }
    }

    fn store(&self, resource_type: ResourceType, id: &str, version: i32, body: &Bytes) -> ClientResult<Bytes> {
        let info: Value = serde_json::from_slice(body)?;
        let envelope = json!({
            "id": id,
            "version": version,
            "createdAt": Utc::now(),
            "updatedAt": Utc::now(),
            "info": info
        });
        let bytes = Bytes::from(serde_json::to_vec(&envelope)?);
        self.insert_raw(resource_type, id, bytes.clone());
        Ok(bytes)
    }

    fn version_of(&self, resource_type: ResourceType, id: &str) -> Option<i32> {
        let resources = self.resources.lock().unwrap();
        let stored = resources.get(&(resource_type, id.to_string()))?;
        let envelope: Value = serde_json::from_slice(stored).ok()?;
        envelope["version"].as_i64().map(|v| v as i32)
    }
}

#[async_trait]
impl AttributionClient for MockAttribution {
    async fn get(&self, ctx: &RequestContext, resource_type: ResourceType, id: &str) -> ClientResult<Bytes> {
        self.record(RecordedCall {
            resource_type: Some(resource_type),
            id: Some(id.to_string()),
            ..RecordedCall::new("get", ctx)
        });
        self.resources
            .lock()
            .unwrap()
            .get(&(resource_type, id.to_string()))
            .cloned()
            .ok_or_else(Self::not_found)
    }

    async fn post(&self, ctx: &RequestContext, resource_type: ResourceType, body: Bytes) -> ClientResult<Bytes> {
        self.record(RecordedCall {
            resource_type: Some(resource_type),
            ..RecordedCall::new("post", ctx)
        });
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Self::unprocessable());
        }
        self.store(resource_type, &Uuid::new_v4().to_string(), 1, &body)
    }

    async fn put(
        &self,
        ctx: &RequestContext,
        resource_type: ResourceType,
        id: &str,
        body: Bytes,
    ) -> ClientResult<Bytes> {
        self.record(RecordedCall {
            resource_type: Some(resource_type),
            id: Some(id.to_string()),
            ..RecordedCall::new("put", ctx)
        });
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Self::unprocessable());
        }
        let version = self.version_of(resource_type, id).ok_or_else(Self::not_found)?;
        self.store(resource_type, id, version + 1, &body)
    }

    async fn delete(&self, ctx: &RequestContext, resource_type: ResourceType, id: &str) -> ClientResult<()> {
        self.record(RecordedCall {
            resource_type: Some(resource_type),
            id: Some(id.to_string()),
            ..RecordedCall::new("delete", ctx)
        });
        self.resources
            .lock()
            .unwrap()
            .remove(&(resource_type, id.to_string()))
            .map(|_| ())
            .ok_or_else(Self::not_found)
    }

    async fn export(&self, ctx: &RequestContext, group_id: &str) -> ClientResult<JobCreated> {
        self.record(RecordedCall {
            resource_type: Some(ResourceType::Group),
            id: Some(group_id.to_string()),
            ..RecordedCall::new("export", ctx)
        });
        if self.fail_export.load(Ordering::SeqCst) {
            return Err(ClientError::Empty);
        }
        Ok(JobCreated {
            id: "5a3b1c9e-7d2f-4e8a-9b6c-1f0e2d3c4b5a".to_string(),
        })
    }

    async fn job_batches(&self, ctx: &RequestContext, job_id: &str) -> ClientResult<Vec<BatchAndFiles>> {
        self.record(RecordedCall {
            id: Some(job_id.to_string()),
            ..RecordedCall::new("job", ctx)
        });
        self.jobs
            .lock()
            .unwrap()
            .get(job_id)
            .cloned()
            .ok_or_else(Self::not_found)
    }

    async fn file_info(&self, ctx: &RequestContext, file_name: &str) -> ClientResult<FileInfo> {
        self.record(RecordedCall {
            id: Some(file_name.to_string()),
            ..RecordedCall::new("file", ctx)
        });
        self.files
            .lock()
            .unwrap()
            .get(file_name)
            .cloned()
            .ok_or_else(Self::not_found)
    }
}

/// Token service with a fixed token table and a canned authentication answer.
#[derive(Default)]
pub struct MockSsas {
    tokens: Mutex<HashMap<String, TokenInfo>>,
    auth_response: Mutex<Option<Bytes>>,
    pub auth_requests: Mutex<Vec<(Option<String>, Bytes)>>,
}

impl MockSsas {
    pub fn grant(&self, token: &str, organization_id: &str) {
        self.tokens.lock().unwrap().insert(
            token.to_string(),
            TokenInfo {
                active: true,
                organization_id: Some(organization_id.to_string()),
                implementer_id: Some("b7c1e0d2-3a4f-4c5d-8e9f-0a1b2c3d4e5f".to_string()),
            },
        );
    }

    /// `None` makes authentication fail.
    pub fn answer_auth_with(&self, body: Option<&str>) {
        *self.auth_response.lock().unwrap() = body.map(|b| Bytes::from(b.to_string()));
    }
}

#[async_trait]
impl SsasClient for MockSsas {
    async fn authenticate(
        &self,
        _ctx: &RequestContext,
        content_type: Option<&str>,
        body: Bytes,
    ) -> ClientResult<Bytes> {
        self.auth_requests
            .lock()
            .unwrap()
            .push((content_type.map(String::from), body));
        self.auth_response
            .lock()
            .unwrap()
            .clone()
            .ok_or(ClientError::Status {
                status: reqwest::StatusCode::UNAUTHORIZED,
                body: "invalid client assertion".to_string(),
            })
    }

    async fn validate_token(&self, _ctx: &RequestContext, token: &str) -> ClientResult<TokenInfo> {
        self.tokens
            .lock()
            .unwrap()
            .get(token)
            .cloned()
            .ok_or(ClientError::Status {
                status: reqwest::StatusCode::UNAUTHORIZED,
                body: "token is not active".to_string(),
            })
    }
}
