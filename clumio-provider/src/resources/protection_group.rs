//! protection_group - Group of S3 buckets sharing an object filter
//!
//! The backend bumps `version` on every applied change, which is what the
//! waits after create and update key on.

use std::collections::HashMap;

use clumio_core::provider::{ProviderError, ProviderResult};
use clumio_core::resource::{Resource, ResourceId, State, Value};
use log::{debug, info};

use crate::models::{ObjectFilter, PrefixFilter, ProtectionGroup, ProtectionGroupRequest};
use crate::provider::ClumioProvider;
use crate::utils::{
    eq_filter, insert_bool, insert_str, insert_string_list, optional_str, required_str,
};
use crate::waiters::{wait_for_protection_group, wait_for_protection_group_version};

// =============================================================================
// Object filter mapping
// =============================================================================

fn invalid_filter(id: &ResourceId, message: impl Into<String>) -> ProviderError {
    ProviderError::invalid_config(format!("object_filter: {}", message.into()))
        .for_resource(id.clone())
}

fn prefix_filter_from_value(id: &ResourceId, value: &Value) -> ProviderResult<PrefixFilter> {
    let map = value
        .as_map()
        .ok_or_else(|| invalid_filter(id, "prefix_filters entries must be objects"))?;
    Ok(PrefixFilter {
        prefix: map.get("prefix").and_then(Value::as_str).map(str::to_string),
        excluded_sub_prefixes: map
            .get("excluded_sub_prefixes")
            .and_then(Value::to_string_vec),
    })
}

/// Build the wire filter. Optional fields left out stay out of the request.
pub fn object_filter_from_value(id: &ResourceId, value: &Value) -> ProviderResult<ObjectFilter> {
    let map = value
        .as_map()
        .ok_or_else(|| invalid_filter(id, "must be an object"))?;

    let storage_classes = map
        .get("storage_classes")
        .and_then(Value::to_string_vec)
        .ok_or_else(|| invalid_filter(id, "storage_classes is required"))?;

    let prefix_filters = match map.get("prefix_filters") {
        Some(value) => {
            let items = value
                .as_list()
                .ok_or_else(|| invalid_filter(id, "prefix_filters must be a list"))?;
            Some(
                items
                    .iter()
                    .map(|item| prefix_filter_from_value(id, item))
                    .collect::<ProviderResult<Vec<_>>>()?,
            )
        }
        None => None,
    };

    Ok(ObjectFilter {
        latest_version_only: map.get("latest_version_only").and_then(Value::as_bool),
        prefix_filters,
        storage_classes: Some(storage_classes),
    })
}

fn prefix_filter_to_value(filter: PrefixFilter) -> Value {
    let mut map = HashMap::new();
    insert_str(&mut map, "prefix", filter.prefix);
    insert_string_list(
        &mut map,
        "excluded_sub_prefixes",
        filter.excluded_sub_prefixes,
    );
    Value::Map(map)
}

pub fn object_filter_to_value(filter: ObjectFilter) -> Value {
    let mut map = HashMap::new();
    insert_bool(&mut map, "latest_version_only", filter.latest_version_only);
    insert_string_list(&mut map, "storage_classes", filter.storage_classes);
    if let Some(prefix_filters) = filter.prefix_filters {
        map.insert(
            "prefix_filters".to_string(),
            Value::List(prefix_filters.into_iter().map(prefix_filter_to_value).collect()),
        );
    }
    Value::Map(map)
}

// =============================================================================
// State mapping
// =============================================================================

pub fn to_attributes(pg: ProtectionGroup) -> HashMap<String, Value> {
    let mut attributes = HashMap::new();
    insert_str(&mut attributes, "id", pg.id);
    insert_str(&mut attributes, "name", pg.name);
    insert_str(&mut attributes, "description", pg.description);
    insert_str(&mut attributes, "bucket_rule", pg.bucket_rule);
    insert_str(
        &mut attributes,
        "organizational_unit_id",
        pg.organizational_unit_id,
    );
    insert_str(&mut attributes, "protection_status", pg.protection_status);
    if let Some(version) = pg.version {
        attributes.insert("version".to_string(), Value::Int(version));
    }
    if let Some(filter) = pg.object_filter {
        attributes.insert("object_filter".to_string(), object_filter_to_value(filter));
    }
    attributes
}

fn to_state(id: &ResourceId, pg: ProtectionGroup) -> ProviderResult<State> {
    let identifier = pg
        .id
        .clone()
        .ok_or_else(|| ProviderError::nil_response().for_resource(id.clone()))?;
    Ok(State::existing(id.clone(), to_attributes(pg)).with_identifier(identifier))
}

fn build_request(resource: &Resource) -> ProviderResult<ProtectionGroupRequest> {
    let object_filter = match resource.attributes.get("object_filter") {
        Some(value) => Some(object_filter_from_value(&resource.id, value)?),
        None => None,
    };
    Ok(ProtectionGroupRequest {
        name: required_str(resource, "name")?,
        description: optional_str(resource, "description"),
        bucket_rule: optional_str(resource, "bucket_rule"),
        object_filter,
        organizational_unit_id: optional_str(resource, "organizational_unit_id"),
    })
}

// =============================================================================
// Operations
// =============================================================================

pub async fn read(
    provider: &ClumioProvider,
    id: &ResourceId,
    identifier: &str,
) -> ProviderResult<State> {
    match provider.client().read_protection_group(identifier).await {
        Ok(pg) if pg.is_deleted == Some(true) => {
            debug!("protection group {} is marked deleted", identifier);
            Ok(State::not_found(id.clone()))
        }
        Ok(pg) => to_state(id, pg),
        Err(err) if err.is_not_found() => Ok(State::not_found(id.clone())),
        Err(err) => Err(ProviderError::from(err).for_resource(id.clone())),
    }
}

pub async fn create(provider: &ClumioProvider, resource: &Resource) -> ProviderResult<State> {
    let id = &resource.id;
    let request = build_request(resource)?;

    let client = provider.client_for(request.organizational_unit_id.as_deref());
    let created = client
        .create_protection_group(&request)
        .await
        .map_err(|e| ProviderError::from(e).for_resource(id.clone()))?;
    let protection_group_id = created
        .id
        .ok_or_else(|| ProviderError::nil_response().for_resource(id.clone()))?;
    info!("created protection group {}", protection_group_id);

    let pg = wait_for_protection_group(
        client.as_ref(),
        provider.poll(),
        provider.cancel(),
        &protection_group_id,
    )
    .await
    .map_err(|e| e.for_resource(id.clone()))?;
    to_state(id, pg)
}

pub async fn update(
    provider: &ClumioProvider,
    identifier: &str,
    from: &State,
    to: &Resource,
) -> ProviderResult<State> {
    let id = &to.id;
    let request = build_request(to)?;

    let previous_version = match from.get_int("version") {
        Some(version) => version,
        None => provider
            .client()
            .read_protection_group(identifier)
            .await
            .map_err(|e| ProviderError::from(e).for_resource(id.clone()))?
            .version
            .unwrap_or_default(),
    };

    provider
        .client()
        .update_protection_group(identifier, &request)
        .await
        .map_err(|e| ProviderError::from(e).for_resource(id.clone()))?;

    let pg = wait_for_protection_group_version(
        provider.client(),
        provider.poll(),
        provider.cancel(),
        identifier,
        previous_version,
    )
    .await
    .map_err(|e| e.for_resource(id.clone()))?;
    to_state(id, pg)
}

pub async fn delete(
    provider: &ClumioProvider,
    id: &ResourceId,
    identifier: &str,
) -> ProviderResult<()> {
    provider
        .client()
        .delete_protection_group(identifier)
        .await
        .map_err(|e| ProviderError::from(e).for_resource(id.clone()))
}

/// Data source: find a protection group by name
pub async fn lookup(provider: &ClumioProvider, resource: &Resource) -> ProviderResult<State> {
    let id = &resource.id;
    let name = required_str(resource, "name")?;
    let filter = eq_filter(&[("name", name.as_str())]);

    let mut matches: Vec<ProtectionGroup> = provider
        .client()
        .list_protection_groups(Some(&filter))
        .await
        .map_err(|e| ProviderError::from(e).for_resource(id.clone()))?
        .into_iter()
        .filter(|pg| pg.is_deleted != Some(true))
        .collect();
    match matches.len() {
        1 => to_state(id, matches.remove(0)),
        0 => Err(
            ProviderError::invalid_config(format!("no protection group named \"{}\"", name))
                .for_resource(id.clone()),
        ),
        n => Err(ProviderError::invalid_config(format!(
            "{} protection groups named \"{}\", expected exactly one",
            n, name
        ))
        .for_resource(id.clone())),
    }
}
