use dpc_fhir_models::group::ATTRIBUTED_PROVIDER_EXTENSION;
use dpc_fhir_models::{MBI_SYSTEM, NPI_SYSTEM};
use serde_json::{json, Value};

pub fn organization(npi: &str) -> Value {
    json!({
        "resourceType": "Organization",
        "identifier": [
            { "system": NPI_SYSTEM, "value": npi },
            { "system": "urn:oid:2.16.840.1.113883.2.4.6.1", "value": "17-0112278" }
        ],
        "name": "Burgers University Medical Center",
        "telecom": [{ "system": "phone", "value": "022-655 2300", "use": "work" }],
        "address": [{
            "use": "work",
            "line": ["Galapagosweg 91"],
            "city": "Den Burg",
            "postalCode": "9105 PZ",
            "country": "NLD"
        }]
    })
}

pub fn practitioner(npi: &str) -> Value {
    json!({
        "resourceType": "Practitioner",
        "identifier": [{ "system": NPI_SYSTEM, "value": npi }],
        "name": [{ "family": "van den broek", "given": ["Eric"] }]
    })
}

pub fn group(provider_npi: &str, patient_mbis: &[&str]) -> Value {
    let members: Vec<Value> = patient_mbis
        .iter()
        .map(|mbi| {
            json!({
                "extension": [{
                    "url": ATTRIBUTED_PROVIDER_EXTENSION,
                    "valueReference": {
                        "type": "Practitioner",
                        "identifier": { "system": NPI_SYSTEM, "value": provider_npi }
                    }
                }],
                "entity": {
                    "type": "Patient",
                    "identifier": { "system": MBI_SYSTEM, "value": mbi }
                }
            })
        })
        .collect();

    json!({
        "resourceType": "Group",
        "type": "person",
        "actual": true,
        "member": members
    })
}
