//! Group membership and attribution
//!
//! A DPC roster is a FHIR `Group` whose members are patients, each attributed to a
//! practitioner through the DaVinci ATR attributed-provider extension:
//!
//! ```json
//! {
//!   "extension": [{
//!     "url": "http://hl7.org/fhir/us/davinci-atr/StructureDefinition/ext-attributedProvider",
//!     "valueReference": { "type": "Practitioner", "identifier": { "system": "...", "value": "..." } }
//!   }],
//!   "entity": { "type": "Patient", "identifier": { "system": "...", "value": "..." } }
//! }
//! ```

use crate::error::{Error, Result};
use crate::identifier::Reference;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const ATTRIBUTED_PROVIDER_EXTENSION: &str =
    "http://hl7.org/fhir/us/davinci-atr/StructureDefinition/ext-attributedProvider";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Extension {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_reference: Option<Reference>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupMember {
    #[serde(default)]
    pub extension: Vec<Extension>,
    #[serde(default)]
    pub entity: Option<Reference>,
}

impl GroupMember {
    /// The practitioner this member is attributed to.
    pub fn practitioner_ref(&self) -> Option<&Reference> {
        self.extension
            .iter()
            .find(|e| e.url == ATTRIBUTED_PROVIDER_EXTENSION)
            .and_then(|e| e.value_reference.as_ref())
    }

    fn attribution(&self) -> Result<Attribution> {
        let provider_npi = self
            .practitioner_ref()
            .filter(|r| r.is_type("Practitioner"))
            .and_then(|r| r.identifier.as_ref())
            .and_then(|id| id.non_empty_value())
            .ok_or_else(|| {
                Error::InvalidResource("Should contain a provider identifier".to_string())
            })?;
        let patient_mbi = self
            .entity
            .as_ref()
            .filter(|r| r.is_type("Patient"))
            .and_then(|r| r.identifier.as_ref())
            .and_then(|id| id.non_empty_value())
            .ok_or_else(|| {
                Error::InvalidResource("Should contain a patient identifier".to_string())
            })?;
        Ok(Attribution {
            provider_npi: provider_npi.to_string(),
            patient_mbi: patient_mbi.to_string(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Group {
    #[serde(default)]
    pub member: Vec<GroupMember>,
}

/// A patient attributed to a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attribution {
    pub provider_npi: String,
    pub patient_mbi: String,
}

impl Group {
    pub fn from_value(value: &Value) -> Result<Self> {
        Ok(Group::deserialize(value)?)
    }

    /// One attribution per member; fails on the first member missing either side.
    pub fn attributions(&self) -> Result<Vec<Attribution>> {
        self.member.iter().map(GroupMember::attribution).collect()
    }

    /// Distinct patient identifiers in member order.
    pub fn patient_mbis(&self) -> Result<Vec<String>> {
        let mut mbis: Vec<String> = Vec::new();
        for attribution in self.attributions()? {
            if !mbis.contains(&attribution.patient_mbi) {
                mbis.push(attribution.patient_mbi);
            }
        }
        Ok(mbis)
    }
}
