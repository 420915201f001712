//! Resource types handled by the DPC services

use serde::{Deserialize, Serialize};
use std::fmt;

/// FHIR resource types the services store or accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceType {
    Organization,
    Practitioner,
    Group,
}

impl ResourceType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Organization => "Organization",
            ResourceType::Practitioner => "Practitioner",
            ResourceType::Group => "Group",
        }
    }

    /// Postgres table backing this resource type in the attribution store.
    pub const fn table(&self) -> &'static str {
        match self {
            ResourceType::Organization => "organization",
            ResourceType::Practitioner => "practitioner",
            ResourceType::Group => "\"group\"",
        }
    }

    /// Lower-case name used in log fields and error messages.
    pub fn label(&self) -> String {
        self.as_str().to_lowercase()
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
