//! Identifier and Reference datatypes

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Naming system of the National Provider Identifier.
pub const NPI_SYSTEM: &str = "http://hl7.org/fhir/sid/us-npi";

/// Naming system of the Medicare Beneficiary Identifier.
pub const MBI_SYSTEM: &str = "http://hl7.org/fhir/sid/us-mbi";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Identifier {
    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    pub use_: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl Identifier {
    pub fn is_npi(&self) -> bool {
        self.system.as_deref() == Some(NPI_SYSTEM)
    }

    /// Value of the identifier when it is present and not blank.
    pub fn non_empty_value(&self) -> Option<&str> {
        self.value.as_deref().filter(|v| !v.trim().is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub reference_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<Identifier>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

impl Reference {
    pub fn is_type(&self, resource_type: &str) -> bool {
        self.reference_type.as_deref() == Some(resource_type)
    }
}

/// Find the NPI in a resource's `identifier` list.
///
/// Identifiers that fail to deserialize are skipped rather than treated as errors;
/// structural validation happens in [`crate::validate_resource`].
pub fn find_npi(resource: &Map<String, Value>) -> Option<String> {
    resource
        .get("identifier")?
        .as_array()?
        .iter()
        .filter_map(|v| serde_json::from_value::<Identifier>(v.clone()).ok())
        .find(|id| id.is_npi() && id.non_empty_value().is_some())
        .and_then(|id| id.value)
}
