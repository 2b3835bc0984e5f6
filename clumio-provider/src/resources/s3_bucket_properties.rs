//! s3_bucket_properties - EventBridge settings of a discovered S3 bucket
//!
//! The bucket itself is owned by AWS; this resource only toggles the
//! properties Clumio uses for continuous backup. Every change runs as a
//! backend task that has to finish before the new state is read back.

use std::collections::HashMap;

use clumio_core::provider::{ProviderError, ProviderResult};
use clumio_core::resource::{Resource, ResourceId, State, Value};
use log::info;

use crate::models::{S3Bucket, SetBucketPropertiesRequest};
use crate::provider::ClumioProvider;
use crate::utils::{insert_bool, required_bool, required_str};

fn to_state(id: &ResourceId, bucket_id: &str, bucket: S3Bucket) -> State {
    let mut attributes = HashMap::new();
    attributes.insert("bucket_id".to_string(), Value::String(bucket_id.to_string()));
    insert_bool(
        &mut attributes,
        "event_bridge_enabled",
        bucket.event_bridge_enabled,
    );
    insert_bool(
        &mut attributes,
        "event_bridge_notification_disabled",
        bucket.event_bridge_notification_disabled,
    );
    State::existing(id.clone(), attributes).with_identifier(bucket_id)
}

/// Apply the properties and wait for the task the change starts
async fn apply(
    provider: &ClumioProvider,
    id: &ResourceId,
    bucket_id: &str,
    request: &SetBucketPropertiesRequest,
) -> ProviderResult<()> {
    let task = provider
        .client()
        .set_s3_bucket_properties(bucket_id, request)
        .await
        .map_err(|e| ProviderError::from(e).for_resource(id.clone()))?;
    let task_id = task
        .task_id
        .ok_or_else(|| ProviderError::nil_response().for_resource(id.clone()))?;
    info!("bucket {} properties update running as task {}", bucket_id, task_id);

    provider
        .wait_task(&task_id)
        .await
        .map_err(|e| e.for_resource(id.clone()))?;
    Ok(())
}

fn build_request(resource: &Resource) -> ProviderResult<SetBucketPropertiesRequest> {
    Ok(SetBucketPropertiesRequest {
        event_bridge_enabled: required_bool(resource, "event_bridge_enabled")?,
        event_bridge_notification_disabled: resource.get_bool("event_bridge_notification_disabled"),
    })
}

pub async fn read(
    provider: &ClumioProvider,
    id: &ResourceId,
    identifier: &str,
) -> ProviderResult<State> {
    match provider.client().read_s3_bucket(identifier).await {
        Ok(bucket) => Ok(to_state(id, identifier, bucket)),
        Err(err) if err.is_not_found() => Ok(State::not_found(id.clone())),
        Err(err) => Err(ProviderError::from(err).for_resource(id.clone())),
    }
}

pub async fn create(provider: &ClumioProvider, resource: &Resource) -> ProviderResult<State> {
    let bucket_id = required_str(resource, "bucket_id")?;
    let request = build_request(resource)?;
    apply(provider, &resource.id, &bucket_id, &request).await?;
    read(provider, &resource.id, &bucket_id).await
}

pub async fn update(
    provider: &ClumioProvider,
    identifier: &str,
    to: &Resource,
) -> ProviderResult<State> {
    if let Some(bucket_id) = to.get_str("bucket_id")
        && bucket_id != identifier
    {
        return Err(ProviderError::invalid_config(format!(
            "changing bucket_id from {} to {} requires replacement",
            identifier, bucket_id
        ))
        .for_resource(to.id.clone()));
    }
    let request = build_request(to)?;
    apply(provider, &to.id, identifier, &request).await?;
    read(provider, &to.id, identifier).await
}

/// Turning EventBridge off is all that deleting these properties means
pub async fn delete(
    provider: &ClumioProvider,
    id: &ResourceId,
    identifier: &str,
) -> ProviderResult<()> {
    let request = SetBucketPropertiesRequest {
        event_bridge_enabled: false,
        event_bridge_notification_disabled: None,
    };
    apply(provider, id, identifier, &request).await
}
