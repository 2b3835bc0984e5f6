//! Attribute helpers shared by the resource implementations

use std::collections::HashMap;

use clumio_core::provider::{ProviderError, ProviderResult};
use clumio_core::resource::{Resource, ResourceId, Value};
use regex::Regex;

const ACCOUNT_ID_PATTERN: &str = r"^\d{12}$";
const REGION_PATTERN: &str = r"^[a-z]{2}(-gov)?-[a-z]+-\d+$";

/// Get a string attribute that must be present and non-empty
pub fn required_str(resource: &Resource, key: &str) -> ProviderResult<String> {
    match resource.get_str(key) {
        Some(s) if !s.is_empty() => Ok(s.to_string()),
        _ => Err(missing_attribute(&resource.id, key)),
    }
}

pub fn required_bool(resource: &Resource, key: &str) -> ProviderResult<bool> {
    resource
        .get_bool(key)
        .ok_or_else(|| missing_attribute(&resource.id, key))
}

pub fn optional_str(resource: &Resource, key: &str) -> Option<String> {
    resource.get_str(key).map(str::to_string)
}

pub fn optional_string_list(resource: &Resource, key: &str) -> Option<Vec<String>> {
    resource.attributes.get(key).and_then(Value::to_string_vec)
}

pub fn missing_attribute(id: &ResourceId, key: &str) -> ProviderError {
    ProviderError::invalid_config(format!("missing required attribute \"{}\"", key))
        .for_resource(id.clone())
}

/// Insert a string attribute when the backend returned one
pub fn insert_str(attributes: &mut HashMap<String, Value>, key: &str, value: Option<String>) {
    if let Some(v) = value {
        attributes.insert(key.to_string(), Value::String(v));
    }
}

pub fn insert_bool(attributes: &mut HashMap<String, Value>, key: &str, value: Option<bool>) {
    if let Some(v) = value {
        attributes.insert(key.to_string(), Value::Bool(v));
    }
}

pub fn insert_string_list(
    attributes: &mut HashMap<String, Value>,
    key: &str,
    value: Option<Vec<String>>,
) {
    if let Some(items) = value {
        attributes.insert(key.to_string(), Value::string_list(items));
    }
}

fn matches(pattern: &str, value: &str) -> ProviderResult<bool> {
    let re = Regex::new(pattern)
        .map_err(|e| ProviderError::invalid_config(format!("bad pattern {}: {}", pattern, e)))?;
    Ok(re.is_match(value))
}

/// AWS account ids are exactly 12 digits
pub fn validate_account_id(id: &ResourceId, value: &str) -> ProviderResult<()> {
    if matches(ACCOUNT_ID_PATTERN, value)? {
        Ok(())
    } else {
        Err(ProviderError::invalid_config(format!(
            "account_native_id must be a 12 digit AWS account id, got \"{}\"",
            value
        ))
        .for_resource(id.clone()))
    }
}

/// Region names such as "us-west-2" or "us-gov-east-1"
pub fn validate_aws_region(id: &ResourceId, value: &str) -> ProviderResult<()> {
    if matches(REGION_PATTERN, value)? {
        Ok(())
    } else {
        Err(
            ProviderError::invalid_config(format!("invalid aws_region \"{}\"", value))
                .for_resource(id.clone()),
        )
    }
}

/// Build the `{"field": {"$eq": value}}` list filter understood by the API
pub fn eq_filter(conditions: &[(&str, &str)]) -> String {
    let filter: serde_json::Map<String, serde_json::Value> = conditions
        .iter()
        .map(|(field, value)| (field.to_string(), serde_json::json!({ "$eq": value })))
        .collect();
    serde_json::Value::Object(filter).to_string()
}
