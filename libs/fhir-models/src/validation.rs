//! Structural validation of inbound FHIR resources
//!
//! These checks establish that a request body is a JSON object of the expected
//! resource type whose well-known elements have the right JSON shape. They do not
//! validate against profiles or terminology.

use crate::error::{Error, Result};
use crate::resource::ResourceType;
use serde_json::{Map, Value};

const GENDERS: &[&str] = &["male", "female", "other", "unknown"];
const GROUP_TYPES: &[&str] = &[
    "person",
    "animal",
    "practitioner",
    "device",
    "medication",
    "substance",
];

/// Parse `body` and check it is a well-formed resource of type `expected`.
///
/// Returns the parsed resource so callers can inspect it without parsing twice.
pub fn validate_resource(expected: ResourceType, body: &[u8]) -> Result<Map<String, Value>> {
    let value: Value = serde_json::from_slice(body)?;
    let Value::Object(resource) = value else {
        return Err(Error::InvalidResource(
            "resource must be a JSON object".to_string(),
        ));
    };

    let found = resource
        .get("resourceType")
        .ok_or_else(|| Error::MissingField("resourceType".to_string()))?
        .as_str()
        .ok_or_else(|| Error::InvalidFieldValue("resourceType must be a string".to_string()))?;
    if found != expected.as_str() {
        return Err(Error::ResourceTypeMismatch {
            expected: expected.as_str().to_string(),
            found: found.to_string(),
        });
    }

    check_common(&resource)?;
    match expected {
        ResourceType::Organization => check_organization(&resource)?,
        ResourceType::Practitioner => check_person(&resource, &["qualification"])?,
        ResourceType::Group => check_group(&resource)?,
    }

    Ok(resource)
}

fn check_common(resource: &Map<String, Value>) -> Result<()> {
    if let Some(id) = optional_str(resource, "id")? {
        if !is_valid_id(id) {
            return Err(Error::InvalidFieldValue(format!("id '{}' is not a valid FHIR id", id)));
        }
    }
    optional_object(resource, "meta")?;
    optional_object(resource, "text")?;

    for identifier in optional_objects(resource, "identifier")? {
        for field in ["use", "system", "value"] {
            optional_str(identifier, field)?;
        }
    }
    for extension in optional_objects(resource, "extension")? {
        required_str(extension, "url")?;
    }
    Ok(())
}

fn check_organization(resource: &Map<String, Value>) -> Result<()> {
    optional_bool(resource, "active")?;
    optional_str(resource, "name")?;
    optional_object(resource, "partOf")?;
    if let Some(aliases) = resource.get("alias") {
        let all_strings = aliases
            .as_array()
            .map(|a| a.iter().all(Value::is_string))
            .unwrap_or(false);
        if !all_strings {
            return Err(Error::InvalidFieldValue(
                "alias must be an array of strings".to_string(),
            ));
        }
    }
    for field in ["type", "telecom", "address", "contact", "endpoint"] {
        optional_objects(resource, field)?;
    }
    Ok(())
}

fn check_person(resource: &Map<String, Value>, extra_lists: &[&str]) -> Result<()> {
    optional_bool(resource, "active")?;
    for field in ["name", "telecom", "address"].iter().chain(extra_lists) {
        optional_objects(resource, field)?;
    }
    if let Some(gender) = optional_str(resource, "gender")? {
        if !GENDERS.contains(&gender) {
            return Err(Error::InvalidFieldValue(format!("unknown gender '{}'", gender)));
        }
    }
    if let Some(birth_date) = optional_str(resource, "birthDate")? {
        if !is_valid_date(birth_date) {
            return Err(Error::InvalidFieldValue(format!(
                "birthDate '{}' is not a valid date",
                birth_date
            )));
        }
    }
    Ok(())
}

fn check_group(resource: &Map<String, Value>) -> Result<()> {
    let group_type = required_str(resource, "type")?;
    if !GROUP_TYPES.contains(&group_type) {
        return Err(Error::InvalidFieldValue(format!("unknown group type '{}'", group_type)));
    }
    match resource.get("actual") {
        Some(Value::Bool(_)) => {}
        Some(_) => {
            return Err(Error::InvalidFieldValue("actual must be a boolean".to_string()));
        }
        None => return Err(Error::MissingField("actual".to_string())),
    }
    optional_bool(resource, "active")?;
    optional_str(resource, "name")?;
    if let Some(quantity) = resource.get("quantity") {
        if !quantity.is_u64() {
            return Err(Error::InvalidFieldValue(
                "quantity must be an unsigned integer".to_string(),
            ));
        }
    }
    optional_objects(resource, "characteristic")?;
    for member in optional_objects(resource, "member")? {
        let entity = member
            .get("entity")
            .ok_or_else(|| Error::MissingField("member.entity".to_string()))?;
        if !entity.is_object() {
            return Err(Error::InvalidFieldValue("member.entity must be an object".to_string()));
        }
        for extension in optional_objects(member, "extension")? {
            required_str(extension, "url")?;
        }
    }
    Ok(())
}

fn optional_str<'a>(resource: &'a Map<String, Value>, field: &str) -> Result<Option<&'a str>> {
    match resource.get(field) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(_) => Err(Error::InvalidFieldValue(format!("{} must be a string", field))),
    }
}

fn required_str<'a>(resource: &'a Map<String, Value>, field: &str) -> Result<&'a str> {
    optional_str(resource, field)?.ok_or_else(|| Error::MissingField(field.to_string()))
}

fn optional_bool(resource: &Map<String, Value>, field: &str) -> Result<()> {
    match resource.get(field) {
        None | Some(Value::Bool(_)) => Ok(()),
        Some(_) => Err(Error::InvalidFieldValue(format!("{} must be a boolean", field))),
    }
}

fn optional_object(resource: &Map<String, Value>, field: &str) -> Result<()> {
    match resource.get(field) {
        None | Some(Value::Object(_)) => Ok(()),
        Some(_) => Err(Error::InvalidFieldValue(format!("{} must be an object", field))),
    }
}

fn optional_objects<'a>(
    resource: &'a Map<String, Value>,
    field: &str,
) -> Result<Vec<&'a Map<String, Value>>> {
    let Some(value) = resource.get(field) else {
        return Ok(Vec::new());
    };
    let invalid = || Error::InvalidFieldValue(format!("{} must be an array of objects", field));
    value
        .as_array()
        .ok_or_else(invalid)?
        .iter()
        .map(|item| item.as_object().ok_or_else(invalid))
        .collect()
}

/// `[A-Za-z0-9\-\.]{1,64}`
fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 64
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
}

/// FHIR `date`: `YYYY`, `YYYY-MM` or `YYYY-MM-DD`.
fn is_valid_date(value: &str) -> bool {
    match value.len() {
        4 => value.chars().all(|c| c.is_ascii_digit()),
        7 => chrono::NaiveDate::parse_from_str(&format!("{}-01", value), "%Y-%m-%d").is_ok(),
        10 => chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok(),
        _ => false,
    }
}
