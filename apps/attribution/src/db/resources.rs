//! Postgres storage for enveloped FHIR resources
//!
//! Each resource type has its own table with the same shape:
//! `id, [organization_id,] version, created_at, updated_at, info`.

use crate::db::traits::{ResourceStore, Scope};
use crate::{Error, Result};
use async_trait::async_trait;
use dpc_fhir_models::{ResourceEnvelope, ResourceType, NPI_SYSTEM};
use serde_json::{json, Map, Value};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::types::Json;
use sqlx::{Postgres, QueryBuilder, Row, Transaction};
use uuid::Uuid;

const RETURNING: &str = " RETURNING id, version, created_at, updated_at, info";

#[derive(Clone)]
pub struct PgResourceStore {
    pool: PgPool,
}

impl PgResourceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Organization column filter for `resource_type`, or `None` for global tables.
fn scoped_org(resource_type: ResourceType, scope: Scope<'_>) -> Result<Option<Uuid>> {
    if resource_type == ResourceType::Organization {
        return Ok(None);
    }
    let org = scope
        .organization_id
        .ok_or_else(|| Error::BadRequest("Missing organization header".to_string()))?;
    Uuid::parse_str(org)
        .map(Some)
        .map_err(|_| Error::BadRequest(format!("Invalid organization id: {}", org)))
}

fn push_scope(qb: &mut QueryBuilder<'_, Postgres>, org: Option<Uuid>) {
    if let Some(org) = org {
        qb.push(" AND organization_id = ").push_bind(org);
    }
}

fn to_envelope(row: &PgRow) -> Result<ResourceEnvelope> {
    let id: Uuid = row.try_get("id")?;
    let info: Json<Map<String, Value>> = row.try_get("info")?;
    Ok(ResourceEnvelope {
        id: id.to_string(),
        version: row.try_get("version")?,
        created_at: Some(row.try_get("created_at")?),
        updated_at: row.try_get("updated_at")?,
        info: info.0,
    })
}

/// Fail with `BadData` when another row of the same type already carries `npi`.
///
/// Takes a transaction-scoped advisory lock on the NPI first so two concurrent
/// writers cannot both pass the check.
async fn ensure_unique_npi(
    tx: &mut Transaction<'_, Postgres>,
    resource_type: ResourceType,
    org: Option<Uuid>,
    npi: &str,
    exclude: Option<Uuid>,
) -> Result<()> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(format!("{}:{}", resource_type.as_str(), npi))
        .execute(&mut **tx)
        .await?;

    let containment = json!({ "identifier": [{ "system": NPI_SYSTEM, "value": npi }] });
    let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM ");
    qb.push(resource_type.table())
        .push(" WHERE info @> ")
        .push_bind(Json(containment));
    push_scope(&mut qb, org);
    if let Some(id) = exclude {
        qb.push(" AND id <> ").push_bind(id);
    }

    let count: i64 = qb.build_query_scalar().fetch_one(&mut **tx).await?;
    if count > 0 {
        return Err(Error::BadData(format!(
            "{} with npi already exists",
            resource_type.label()
        )));
    }
    Ok(())
}

#[async_trait]
impl ResourceStore for PgResourceStore {
    async fn find(
        &self,
        resource_type: ResourceType,
        scope: Scope<'_>,
        id: &str,
    ) -> Result<Option<ResourceEnvelope>> {
        let Ok(id) = Uuid::parse_str(id) else {
            return Ok(None);
        };
        let org = scoped_org(resource_type, scope)?;

        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT id, version, created_at, updated_at, info FROM ",
        );
        qb.push(resource_type.table()).push(" WHERE id = ").push_bind(id);
        push_scope(&mut qb, org);

        let row = qb.build().fetch_optional(&self.pool).await?;
        row.as_ref().map(to_envelope).transpose()
    }

    async fn insert(
        &self,
        resource_type: ResourceType,
        scope: Scope<'_>,
        npi: Option<&str>,
        info: Map<String, Value>,
    ) -> Result<ResourceEnvelope> {
        let org = scoped_org(resource_type, scope)?;
        let mut tx = self.pool.begin().await?;

        if let Some(npi) = npi {
            ensure_unique_npi(&mut tx, resource_type, org, npi, None).await?;
        }

        let id = Uuid::new_v4();
        let mut qb = QueryBuilder::<Postgres>::new("INSERT INTO ");
        qb.push(resource_type.table());
        match org {
            Some(org) => {
                qb.push(" (id, organization_id, version, info) VALUES (")
                    .push_bind(id)
                    .push(", ")
                    .push_bind(org)
                    .push(", 1, ")
                    .push_bind(Json(info))
                    .push(")");
            }
            None => {
                qb.push(" (id, version, info) VALUES (")
                    .push_bind(id)
                    .push(", 1, ")
                    .push_bind(Json(info))
                    .push(")");
            }
        }
        qb.push(RETURNING);

        let row = qb.build().fetch_one(&mut *tx).await?;
        let envelope = to_envelope(&row)?;
        tx.commit().await?;

        tracing::debug!(
            resource_type = %resource_type,
            id = %envelope.id,
            "Resource inserted"
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
        let Ok(id) = Uuid::parse_str(id) else {
            return Ok(None);
        };
        let org = scoped_org(resource_type, scope)?;
        let mut tx = self.pool.begin().await?;

        if let Some(npi) = npi {
            ensure_unique_npi(&mut tx, resource_type, org, npi, Some(id)).await?;
        }

        let mut qb = QueryBuilder::<Postgres>::new("UPDATE ");
        qb.push(resource_type.table())
            .push(" SET info = ")
            .push_bind(Json(info))
            .push(", version = version + 1, updated_at = now() WHERE id = ")
            .push_bind(id);
        push_scope(&mut qb, org);
        qb.push(RETURNING);

        let row = qb.build().fetch_optional(&mut *tx).await?;
        let envelope = row.as_ref().map(to_envelope).transpose()?;
        tx.commit().await?;
        Ok(envelope)
    }

    async fn delete(&self, resource_type: ResourceType, scope: Scope<'_>, id: &str) -> Result<bool> {
        let Ok(id) = Uuid::parse_str(id) else {
            return Ok(false);
        };
        let org = scoped_org(resource_type, scope)?;

        let mut qb = QueryBuilder::<Postgres>::new("DELETE FROM ");
        qb.push(resource_type.table()).push(" WHERE id = ").push_bind(id);
        push_scope(&mut qb, org);

        let result = qb.build().execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }
}
