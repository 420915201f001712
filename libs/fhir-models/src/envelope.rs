//! Storage envelope for FHIR resources
//!
//! The attribution service persists each resource as a row with bookkeeping columns
//! and the FHIR body in `info`. Over the wire the row travels as:
//!
//! ```json
//! { "id": "...", "version": 1, "createdAt": "...", "updatedAt": "...", "info": { ... } }
//! ```
//!
//! [`ResourceEnvelope::into_resource`] turns that shape into the FHIR resource clients
//! expect, with `id` and `meta` spliced into the body.

use crate::error::{Error, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceEnvelope {
    pub id: String,
    pub version: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    /// FHIR body. A missing or `null` value fails deserialization.
    pub info: Map<String, Value>,
}

impl ResourceEnvelope {
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| Error::MalformedEnvelope(e.to_string()))
    }

    pub fn resource_type(&self) -> Result<&str> {
        self.info
            .get("resourceType")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::MissingField("info.resourceType".to_string()))
    }

    /// `meta` block synthesized from the envelope bookkeeping fields.
    pub fn meta(&self) -> Result<Value> {
        let resource_type = self.resource_type()?;
        Ok(json!({
            "id": format!("{}/{}", resource_type, self.id),
            "versionId": self.version.to_string(),
            "lastUpdated": self.updated_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }))
    }

    /// Unwrap the envelope into a FHIR resource.
    ///
    /// Every key of `info` is kept; `id` and `meta` are set from the envelope and
    /// override any values the stored body carried.
    pub fn into_resource(self) -> Result<Value> {
        let meta = self.meta()?;
        let mut info = self.info;
        info.insert("id".to_string(), Value::String(self.id));
        info.insert("meta".to_string(), meta);
        Ok(Value::Object(info))
    }
}
