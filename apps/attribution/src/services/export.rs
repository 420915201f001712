//! Export job creation
//!
//! A group export becomes one job made of several `job_queue_batch` rows, each
//! covering at most `queue.batch_size` patients. Single-patient batches get a
//! higher priority (lower number) so patient-level requests are not stuck behind
//! large roster exports.

use crate::db::{NewBatch, Scope};
use crate::request_context::RequestContext;
use crate::state::AppState;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use dpc_fhir_models::job::EXPORT_RESOURCE_TYPES;
use dpc_fhir_models::{find_npi, Group, JobCreated, ResourceType};
use serde::Deserialize;
use serde_json::Value;

pub const SINGLE_PATIENT_PRIORITY: i32 = 1000;
pub const BULK_PRIORITY: i32 = 5000;

/// Query parameters of `GET /Group/{id}/$export`.
#[derive(Debug, Default, Deserialize)]
pub struct ExportParams {
    #[serde(rename = "_type")]
    pub types: Option<String>,
    #[serde(rename = "_since")]
    pub since: Option<String>,
}

impl ExportParams {
    pub fn resource_types(&self) -> String {
        match self.types.as_deref().map(str::trim) {
            Some(types) if !types.is_empty() => types.to_string(),
            _ => EXPORT_RESOURCE_TYPES.join(","),
        }
    }

    pub fn since(&self) -> Result<Option<DateTime<Utc>>> {
        match self.since.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => DateTime::parse_from_rfc3339(raw)
                .map(|dt| Some(dt.with_timezone(&Utc)))
                .map_err(|_| Error::BadRequest(format!("Could not parse _since: {}", raw))),
        }
    }
}

pub fn priority_for(patient_count: usize) -> i32 {
    if patient_count == 1 {
        SINGLE_PATIENT_PRIORITY
    } else {
        BULK_PRIORITY
    }
}

/// Everything a batch row needs apart from its patients.
#[derive(Debug, Clone)]
pub struct BatchTemplate {
    pub organization_id: String,
    pub organization_npi: String,
    pub provider_npi: String,
    pub resource_types: String,
    pub since: Option<DateTime<Utc>>,
    pub transaction_time: DateTime<Utc>,
    pub request_url: String,
    pub requesting_ip: String,
}

/// Split `patients` into batches of at most `batch_size`.
pub fn plan_batches(template: &BatchTemplate, patients: &[String], batch_size: usize) -> Vec<NewBatch> {
    let submit_time = Utc::now();
    patients
        .chunks(batch_size.max(1))
        .map(|chunk| NewBatch {
            organization_id: template.organization_id.clone(),
            organization_npi: template.organization_npi.clone(),
            provider_npi: template.provider_npi.clone(),
            patients: chunk.to_vec(),
            resource_types: template.resource_types.clone(),
            since: template.since,
            priority: priority_for(chunk.len()),
            transaction_time: template.transaction_time,
            submit_time,
            request_url: template.request_url.clone(),
            requesting_ip: template.requesting_ip.clone(),
        })
        .collect()
}

/// Queue an export of every patient in `group_id` for the caller's organization.
pub async fn start_export(
    state: &AppState,
    ctx: &RequestContext,
    group_id: &str,
    params: &ExportParams,
) -> Result<JobCreated> {
    let organization_id = ctx.require_organization()?;
    let scope = Scope::organization(organization_id);

    let group = state
        .resources
        .find(ResourceType::Group, scope, group_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Group {} not found", group_id)))?;
    let attributions = Group::from_value(&Value::Object(group.info))?.attributions()?;
    if attributions.is_empty() {
        return Err(Error::BadRequest(
            "The group must contain active patients".to_string(),
        ));
    }

    let organization = state
        .resources
        .find(ResourceType::Organization, Scope::global(), organization_id)
        .await?
        .ok_or_else(|| Error::BadData("Organization for export not found".to_string()))?;
    let organization_npi = find_npi(&organization.info)
        .ok_or_else(|| Error::BadData("Organization has no NPI".to_string()))?;

    let mut providers: Vec<&str> = Vec::new();
    let mut patients: Vec<String> = Vec::new();
    for attribution in &attributions {
        if !providers.contains(&attribution.provider_npi.as_str()) {
            providers.push(&attribution.provider_npi);
        }
        if !patients.contains(&attribution.patient_mbi) {
            patients.push(attribution.patient_mbi.clone());
        }
    }

    let template = BatchTemplate {
        organization_id: organization_id.to_string(),
        organization_npi,
        provider_npi: providers.join(","),
        resource_types: params.resource_types(),
        since: params.since()?,
        transaction_time: Utc::now(),
        request_url: ctx.request_url.clone().unwrap_or_default(),
        requesting_ip: ctx.requesting_ip.clone().unwrap_or_default(),
    };
    let batches = plan_batches(&template, &patients, state.config.queue.batch_size);
    let job_id = state.jobs.insert_batches(&batches).await?;

    tracing::info!(
        job_id = %job_id,
        organization_id = %organization_id,
        group_id = %group_id,
        total_patients = patients.len(),
        batches = batches.len(),
        resources_requested = %template.resource_types,
        "Export job created"
    );

    Ok(JobCreated { id: job_id })
}
