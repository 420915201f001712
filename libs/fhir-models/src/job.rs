//! Bulk export jobs
//!
//! An export job is a set of batches in `job_queue_batch`, each covering a slice of a
//! group's patients. Workers write one or more ndjson files per batch. The API turns
//! the batch list into the FHIR bulk data status report.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Resource types an export may request; also the default `_type`.
pub const EXPORT_RESOURCE_TYPES: [&str; 3] = ["Patient", "Coverage", "ExplanationOfBenefit"];

pub const SUBMIT_TIME_EXTENSION: &str = "https://dpc.cms.gov/submit_time";
pub const COMPLETE_TIME_EXTENSION: &str = "https://dpc.cms.gov/complete_time";
pub const CHECKSUM_EXTENSION: &str = "https://dpc.cms.gov/checksum";
pub const FILE_LENGTH_EXTENSION: &str = "https://dpc.cms.gov/file_length";

/// Completed job output stays downloadable for this many hours.
pub const OUTPUT_RETENTION_HOURS: i64 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    /// Decode the integer stored in `job_queue_batch.status`.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(JobStatus::Queued),
            1 => Some(JobStatus::Running),
            2 => Some(JobStatus::Completed),
            3 => Some(JobStatus::Failed),
            _ => None,
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            JobStatus::Queued => 0,
            JobStatus::Running => 1,
            JobStatus::Completed => 2,
            JobStatus::Failed => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchInfo {
    pub batch_id: String,
    pub job_id: String,
    pub total_patients: i32,
    pub patients_processed: i32,
    pub status: JobStatus,
    pub transaction_time: DateTime<Utc>,
    pub submit_time: DateTime<Utc>,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub complete_time: Option<DateTime<Utc>>,
    pub request_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchFile {
    pub resource_type: String,
    pub batch_id: String,
    pub sequence: i32,
    pub file_name: String,
    pub count: i32,
    /// Hex-encoded checksum of the file contents.
    pub checksum: String,
    pub file_length: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchAndFiles {
    pub batch: BatchInfo,
    #[serde(default)]
    pub files: Vec<BatchFile>,
}

/// Answer of the attribution service for a downloadable export file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    pub file_name: String,
    pub file_length: i64,
    pub file_checksum: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobCreated {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Output {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<Map<String, Value>>,
}

/// FHIR bulk data status report for a completed job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub transaction_time: DateTime<Utc>,
    pub request: String,
    pub requires_access_token: bool,
    pub output: Vec<Output>,
    pub error: Vec<Output>,
    pub extension: Map<String, Value>,
}

/// Where a job stands, derived from its batches.
#[derive(Debug, Clone, PartialEq)]
pub enum JobProgress {
    /// At least one batch failed.
    Failed,
    /// Work is queued or running. `progress` is the `X-Progress` header value.
    InProgress { progress: String },
    /// Finished, but the output retention window has passed.
    Expired,
    Complete {
        report: StatusReport,
        expires: DateTime<Utc>,
    },
    /// Nothing conclusive yet, for example a job with no batches.
    Pending,
}

impl JobProgress {
    /// Summarize a job's batches as of `now`. Output URLs are rooted at `api_path`.
    pub fn from_batches(batches: &[BatchAndFiles], now: DateTime<Utc>, api_path: &str) -> Self {
        let has = |status: JobStatus| batches.iter().any(|b| b.batch.status == status);

        if has(JobStatus::Failed) {
            return JobProgress::Failed;
        }
        if has(JobStatus::Running) || has(JobStatus::Queued) {
            return JobProgress::InProgress {
                progress: progress_header(batches),
            };
        }
        if batches.is_empty() {
            return JobProgress::Pending;
        }

        let Some(completed_at) = batches.iter().filter_map(|b| b.batch.complete_time).max() else {
            return JobProgress::Pending;
        };
        if completed_at < now - Duration::hours(OUTPUT_RETENTION_HOURS) {
            return JobProgress::Expired;
        }

        let Some(first) = batches.iter().min_by_key(|b| b.batch.submit_time) else {
            return JobProgress::Pending;
        };
        let (output, error) = output_lists(batches, api_path);

        let mut extension = Map::new();
        extension.insert(
            SUBMIT_TIME_EXTENSION.to_string(),
            Value::String(first.batch.submit_time.to_rfc3339()),
        );
        extension.insert(
            COMPLETE_TIME_EXTENSION.to_string(),
            Value::String(completed_at.to_rfc3339()),
        );

        JobProgress::Complete {
            report: StatusReport {
                transaction_time: batches[0].batch.transaction_time,
                request: batches[0].batch.request_url.clone(),
                requires_access_token: true,
                output,
                error,
                extension,
            },
            expires: completed_at + Duration::hours(OUTPUT_RETENTION_HOURS),
        }
    }
}

fn progress_header(batches: &[BatchAndFiles]) -> String {
    let processed: i64 = batches.iter().map(|b| b.batch.patients_processed as i64).sum();
    let total: i64 = batches.iter().map(|b| b.batch.total_patients as i64).sum();
    if total > 0 {
        format!("RUNNING: {:.2}%", processed as f64 / total as f64 * 100.0)
    } else {
        "QUEUED: 0.00%".to_string()
    }
}

fn output_lists(batches: &[BatchAndFiles], api_path: &str) -> (Vec<Output>, Vec<Output>) {
    let mut output = Vec::new();
    let mut error = Vec::new();
    for file in batches.iter().flat_map(|b| b.files.iter()) {
        let url = format!(
            "{}/Data/{}.ndjson",
            api_path.trim_end_matches('/'),
            file.file_name
        );
        if file.resource_type == "OperationOutcome" {
            error.push(Output {
                resource_type: file.resource_type.clone(),
                url,
                count: None,
                extension: None,
            });
        } else {
            let mut extension = Map::new();
            extension.insert(
                CHECKSUM_EXTENSION.to_string(),
                Value::String(file.checksum.clone()),
            );
            extension.insert(FILE_LENGTH_EXTENSION.to_string(), Value::from(file.file_length));
            output.push(Output {
                resource_type: file.resource_type.clone(),
                url,
                count: Some(file.count),
                extension: Some(extension),
            });
        }
    }
    (output, error)
}
