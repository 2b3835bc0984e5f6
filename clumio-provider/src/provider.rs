//! Clumio Provider implementation
//!
//! Holds the API client, the poll settings used after mutating calls and a
//! cancellation token shared by every poll loop. Each resource operation is
//! dispatched to the module implementing that resource type.

use std::sync::Arc;

use clumio_core::poll::PollConfig;
use clumio_core::provider::{ProviderError, ProviderResult};
use clumio_core::resource::{Resource, ResourceId, State};
use tokio_util::sync::CancellationToken;

use crate::client::{ClumioApi, HttpClient};
use crate::config::ClumioConfig;
use crate::models::Task;
use crate::resources::{
    AWS_CONNECTION, PROTECTION_GROUP, S3_BUCKET_PROPERTIES, aws_connection, protection_group,
    s3_bucket_properties,
};
use crate::waiters;

/// Clumio Provider
pub struct ClumioProvider {
    client: Arc<dyn ClumioApi>,
    poll: PollConfig,
    cancel: CancellationToken,
}

impl ClumioProvider {
    /// Create a provider talking to the API described by `config`
    pub fn new(config: &ClumioConfig) -> ProviderResult<Self> {
        let client = HttpClient::new(config)?;
        Ok(Self::with_client(Arc::new(client), config.poll))
    }

    /// Create a provider on top of an arbitrary client
    pub fn with_client(client: Arc<dyn ClumioApi>, poll: PollConfig) -> Self {
        Self {
            client,
            poll,
            cancel: CancellationToken::new(),
        }
    }

    /// Use `cancel` to abort in-flight poll loops
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn client(&self) -> &dyn ClumioApi {
        self.client.as_ref()
    }

    /// Client for a call that must run under `organizational_unit_id`.
    /// Without one, the provider-wide context applies.
    pub fn client_for(&self, organizational_unit_id: Option<&str>) -> Arc<dyn ClumioApi> {
        match organizational_unit_id {
            Some(ou) if !ou.is_empty() => self.client.scoped(ou),
            _ => self.client.clone(),
        }
    }

    pub fn poll(&self) -> &PollConfig {
        &self.poll
    }

    pub fn cancel(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Wait for an arbitrary backend task
    pub async fn wait_task(&self, task_id: &str) -> ProviderResult<Task> {
        waiters::wait_for_task(self.client(), &self.poll, &self.cancel, task_id).await
    }

    // =========================================================================
    // Resource Operations
    // =========================================================================

    pub async fn read_resource(&self, id: &ResourceId, identifier: &str) -> ProviderResult<State> {
        match id.resource_type.as_str() {
            AWS_CONNECTION => aws_connection::read(self, id, identifier).await,
            PROTECTION_GROUP => protection_group::read(self, id, identifier).await,
            S3_BUCKET_PROPERTIES => s3_bucket_properties::read(self, id, identifier).await,
            _ => Err(unknown_type(id)),
        }
    }

    pub async fn create_resource(&self, resource: &Resource) -> ProviderResult<State> {
        match resource.id.resource_type.as_str() {
            AWS_CONNECTION => aws_connection::create(self, resource).await,
            PROTECTION_GROUP => protection_group::create(self, resource).await,
            S3_BUCKET_PROPERTIES => s3_bucket_properties::create(self, resource).await,
            _ => Err(unknown_type(&resource.id)),
        }
    }

    pub async fn update_resource(
        &self,
        id: &ResourceId,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> ProviderResult<State> {
        match id.resource_type.as_str() {
            AWS_CONNECTION => aws_connection::update(self, identifier, from, to).await,
            PROTECTION_GROUP => protection_group::update(self, identifier, from, to).await,
            S3_BUCKET_PROPERTIES => s3_bucket_properties::update(self, identifier, to).await,
            _ => Err(unknown_type(id)),
        }
    }

    pub async fn delete_resource(&self, id: &ResourceId, identifier: &str) -> ProviderResult<()> {
        match id.resource_type.as_str() {
            AWS_CONNECTION => aws_connection::delete(self, id, identifier).await,
            PROTECTION_GROUP => protection_group::delete(self, id, identifier).await,
            S3_BUCKET_PROPERTIES => s3_bucket_properties::delete(self, id, identifier).await,
            _ => Err(unknown_type(id)),
        }
    }

    pub async fn read_data_source_resource(&self, resource: &Resource) -> ProviderResult<State> {
        match resource.id.resource_type.as_str() {
            AWS_CONNECTION => aws_connection::lookup(self, resource).await,
            PROTECTION_GROUP => protection_group::lookup(self, resource).await,
            _ => Err(ProviderError::invalid_config(format!(
                "{} is not available as a data source",
                resource.id.resource_type
            ))
            .for_resource(resource.id.clone())),
        }
    }
}

fn unknown_type(id: &ResourceId) -> ProviderError {
    ProviderError::invalid_config(format!("Unknown resource type: {}", id.resource_type))
        .for_resource(id.clone())
}
