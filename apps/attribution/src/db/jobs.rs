//! Postgres job queue tables

use crate::db::traits::{JobStore, NewBatch};
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dpc_fhir_models::{BatchAndFiles, BatchFile, BatchInfo, FileInfo, JobStatus};
use sqlx::postgres::PgPool;
use sqlx::Row;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn parse_uuid(value: &str, what: &str) -> Result<Uuid> {
    Uuid::parse_str(value).map_err(|_| Error::BadRequest(format!("Invalid {}: {}", what, value)))
}

/// Patients handled so far, from the worker's zero-based `patient_index`.
fn patients_processed(patient_index: Option<i32>) -> i32 {
    patient_index.map(|i| i + 1).unwrap_or(0)
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn insert_batches(&self, batches: &[NewBatch]) -> Result<String> {
        let job_id = Uuid::new_v4();
        let mut tx = self.pool.begin().await?;

        for (index, batch) in batches.iter().enumerate() {
            let organization_id = parse_uuid(&batch.organization_id, "organization id")?;
            sqlx::query(
                r#"
                INSERT INTO job_queue_batch (
                    batch_id, job_id, organization_id, organization_npi, provider_npi,
                    patients, resource_types, since, priority, transaction_time,
                    status, submit_time, request_url, requesting_ip, is_bulk, batch_index
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, TRUE, $15)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(job_id)
            .bind(organization_id)
            .bind(&batch.organization_npi)
            .bind(&batch.provider_npi)
            .bind(batch.patients.join(","))
            .bind(&batch.resource_types)
            .bind(batch.since)
            .bind(batch.priority)
            .bind(batch.transaction_time)
            .bind(JobStatus::Queued.code())
            .bind(batch.submit_time)
            .bind(&batch.request_url)
            .bind(&batch.requesting_ip)
            .bind(index as i32)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(job_id.to_string())
    }

    async fn job_batches(&self, organization_id: &str, job_id: &str) -> Result<Vec<BatchAndFiles>> {
        let organization_id = parse_uuid(organization_id, "organization id")?;
        let Ok(job_id) = Uuid::parse_str(job_id) else {
            return Ok(Vec::new());
        };

        let batch_rows = sqlx::query(
            r#"
            SELECT batch_id, job_id, patients, patient_index, status, transaction_time,
                   submit_time, start_time, complete_time, request_url
            FROM job_queue_batch
            WHERE job_id = $1 AND organization_id = $2
            ORDER BY submit_time, batch_index, batch_id
            "#,
        )
        .bind(job_id)
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await?;

        if batch_rows.is_empty() {
            return Ok(Vec::new());
        }

        let file_rows = sqlx::query(
            r#"
            SELECT batch_id, resource_type, sequence, file_name, count, checksum, file_length
            FROM job_queue_batch_file
            WHERE job_id = $1
            ORDER BY batch_id, resource_type, sequence
            "#,
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await?;

        let mut files: HashMap<Uuid, Vec<BatchFile>> = HashMap::new();
        for row in file_rows {
            let batch_id: Uuid = row.try_get("batch_id")?;
            let checksum: Vec<u8> = row.try_get("checksum")?;
            files.entry(batch_id).or_default().push(BatchFile {
                resource_type: row.try_get("resource_type")?,
                batch_id: batch_id.to_string(),
                sequence: row.try_get("sequence")?,
                file_name: row.try_get("file_name")?,
                count: row.try_get("count")?,
                checksum: hex::encode(checksum),
                file_length: row.try_get("file_length")?,
            });
        }

        let mut batches = Vec::with_capacity(batch_rows.len());
        for row in batch_rows {
            let batch_id: Uuid = row.try_get("batch_id")?;
            let job_id: Uuid = row.try_get("job_id")?;
            let code: i32 = row.try_get("status")?;
            let status = JobStatus::from_code(code).ok_or_else(|| {
                Error::Internal(format!("Unknown status {} on batch {}", code, batch_id))
            })?;
            let patients: String = row.try_get("patients")?;
            let submit_time: DateTime<Utc> = row.try_get("submit_time")?;

            batches.push(BatchAndFiles {
                batch: BatchInfo {
                    batch_id: batch_id.to_string(),
                    job_id: job_id.to_string(),
                    total_patients: patients.split(',').filter(|p| !p.is_empty()).count() as i32,
                    patients_processed: patients_processed(row.try_get("patient_index")?),
                    status,
                    transaction_time: row.try_get("transaction_time")?,
                    submit_time,
                    start_time: row.try_get("start_time")?,
                    complete_time: row.try_get("complete_time")?,
                    request_url: row.try_get("request_url")?,
                },
                files: files.remove(&batch_id).unwrap_or_default(),
            });
        }

        Ok(batches)
    }

    async fn file_info(&self, organization_id: &str, file_name: &str) -> Result<Option<FileInfo>> {
        let organization_id = parse_uuid(organization_id, "organization id")?;

        let row = sqlx::query(
            r#"
            SELECT f.job_id, b.start_time, f.file_length, f.checksum
            FROM job_queue_batch_file f
            JOIN job_queue_batch b ON b.batch_id = f.batch_id
            WHERE f.file_name = $1 AND b.organization_id = $2
            "#,
        )
        .bind(file_name)
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let start_time: Option<DateTime<Utc>> = row.try_get("start_time")?;
        if start_time.is_none() {
            tracing::warn!(file_name, "Job batch for file has no start time");
            return Ok(None);
        }

        let job_id: Uuid = row.try_get("job_id")?;
        let statuses: Vec<i32> = sqlx::query_scalar("SELECT status FROM job_queue_batch WHERE job_id = $1")
            .bind(job_id)
            .fetch_all(&self.pool)
            .await?;
        if statuses.iter().any(|s| *s != JobStatus::Completed.code()) {
            tracing::debug!(file_name, job_id = %job_id, "Not all job batches are completed");
            return Ok(None);
        }

        let checksum: Vec<u8> = row.try_get("checksum")?;
        Ok(Some(FileInfo {
            file_name: file_name.to_string(),
            file_length: row.try_get("file_length")?,
            file_checksum: hex::encode(checksum),
        }))
    }
}
