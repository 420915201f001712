//! Capability statement for `GET /v2/metadata`

use axum::{extract::State, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::state::AppState;

const FHIR_VERSION: &str = "4.0.1";

fn interaction(codes: &[&str]) -> Vec<Value> {
    codes.iter().map(|code| json!({ "code": code })).collect()
}

/// What the public API serves, rooted at `api_path`.
pub fn capability_statement(api_path: &str) -> Value {
    json!({
        "resourceType": "CapabilityStatement",
        "status": "active",
        "date": "2024-01-01",
        "publisher": "Centers for Medicare & Medicaid Services",
        "kind": "instance",
        "instantiates": [
            "http://hl7.org/fhir/uv/bulkdata/CapabilityStatement/bulk-data"
        ],
        "software": {
            "name": "Data at the Point of Care",
            "version": env!("CARGO_PKG_VERSION")
        },
        "implementation": {
            "description": "Data at the Point of Care bulk data API",
            "url": api_path
        },
        "fhirVersion": FHIR_VERSION,
        "format": ["application/fhir+json"],
        "rest": [{
            "mode": "server",
            "security": {
                "cors": true,
                "service": [{
                    "coding": [{
                        "system": "http://hl7.org/fhir/restful-security-service",
                        "code": "SMART-on-FHIR"
                    }]
                }]
            },
            "resource": [
                {
                    "type": "Organization",
                    "interaction": interaction(&["read"])
                },
                {
                    "type": "Practitioner",
                    "interaction": interaction(&["create", "read", "update", "delete"])
                },
                {
                    "type": "Group",
                    "interaction": interaction(&["create"]),
                    "operation": [{
                        "name": "export",
                        "definition": "http://hl7.org/fhir/uv/bulkdata/OperationDefinition/group-export"
                    }]
                }
            ]
        }]
    })
}

pub async fn metadata(State(state): State<AppState>) -> impl IntoResponse {
    Json(capability_statement(&state.config.export.api_path))
}
