//! Create, read, update and delete for enveloped resources

use crate::db::Scope;
use crate::request_context::RequestContext;
use crate::state::AppState;
use crate::{Error, Result};
use dpc_fhir_models::{find_npi, validate_resource, ResourceEnvelope, ResourceType};
use serde_json::{Map, Value};

/// Organizations and practitioners are identified by NPI and must carry one.
fn requires_npi(resource_type: ResourceType) -> bool {
    matches!(
        resource_type,
        ResourceType::Organization | ResourceType::Practitioner
    )
}

fn scope_for<'a>(resource_type: ResourceType, ctx: &'a RequestContext) -> Result<Scope<'a>> {
    if resource_type == ResourceType::Organization {
        Ok(Scope::global())
    } else {
        Ok(Scope::organization(ctx.require_organization()?))
    }
}

fn parse_body(resource_type: ResourceType, body: &[u8]) -> Result<(Map<String, Value>, Option<String>)> {
    let info = validate_resource(resource_type, body)?;
    if !requires_npi(resource_type) {
        return Ok((info, None));
    }
    let npi = find_npi(&info).ok_or_else(|| {
        Error::BadData(format!("{} must have an NPI identifier", resource_type.label()))
    })?;
    Ok((info, Some(npi)))
}

/// Storage failures on writes are reported as unprocessable rather than as
/// server errors; uniqueness conflicts keep their own message.
fn save_failure(resource_type: ResourceType, err: Error) -> Error {
    match err {
        Error::Database(e) => {
            tracing::error!(resource_type = %resource_type, error = %e, "Failed to save resource");
            Error::BadData(format!("Failed to save {}", resource_type.label()))
        }
        other => other,
    }
}

pub async fn get(
    state: &AppState,
    ctx: &RequestContext,
    resource_type: ResourceType,
    id: &str,
) -> Result<ResourceEnvelope> {
    state
        .resources
        .find(resource_type, scope_for(resource_type, ctx)?, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("{} {} not found", resource_type, id)))
}

pub async fn create(
    state: &AppState,
    ctx: &RequestContext,
    resource_type: ResourceType,
    body: &[u8],
) -> Result<ResourceEnvelope> {
    let (info, npi) = parse_body(resource_type, body)?;
    let envelope = state
        .resources
        .insert(resource_type, scope_for(resource_type, ctx)?, npi.as_deref(), info)
        .await
        .map_err(|e| save_failure(resource_type, e))?;

    tracing::info!(
        resource_type = %resource_type,
        id = %envelope.id,
        request_id = %ctx.request_id,
        "Resource created"
    );
    Ok(envelope)
}

pub async fn update(
    state: &AppState,
    ctx: &RequestContext,
    resource_type: ResourceType,
    id: &str,
    body: &[u8],
) -> Result<ResourceEnvelope> {
    let (info, npi) = parse_body(resource_type, body)?;
    state
        .resources
        .update(resource_type, scope_for(resource_type, ctx)?, id, npi.as_deref(), info)
        .await
        .map_err(|e| save_failure(resource_type, e))?
        .ok_or_else(|| Error::NotFound(format!("{} {} not found", resource_type, id)))
}

pub async fn delete(
    state: &AppState,
    ctx: &RequestContext,
    resource_type: ResourceType,
    id: &str,
) -> Result<()> {
    let deleted = state
        .resources
        .delete(resource_type, scope_for(resource_type, ctx)?, id)
        .await?;
    if !deleted {
        return Err(Error::NotFound(format!("{} {} not found", resource_type, id)));
    }
    tracing::info!(resource_type = %resource_type, id = %id, "Resource deleted");
    Ok(())
}
