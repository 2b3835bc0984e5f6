//! Clumio Provider
//!
//! Manages Clumio backup resources through the Clumio REST API.
//!
//! ## Module Structure
//!
//! - `config` - Provider settings loaded from the environment
//! - `client` - REST client (`ClumioApi` trait and its reqwest implementation)
//! - `models` - Wire models of the API
//! - `waiters` - Polls run after mutating calls
//! - `resources` - Resource type definitions and their CRUD mapping
//! - `provider` - ClumioProvider implementation
//! - `utils` - Attribute and validation helpers

pub mod client;
pub mod config;
pub mod models;
pub mod provider;
pub mod resources;
pub mod utils;
pub mod waiters;

#[cfg(test)]
mod testing;

// Re-export main types
pub use client::{ClumioApi, HttpClient};
pub use config::{ClumioConfig, ConfigError};
pub use provider::ClumioProvider;

use clumio_core::provider::{BoxFuture, Provider, ProviderResult, ResourceType};
use clumio_core::resource::{Resource, ResourceId, State};

use resources::resource_types;

// =============================================================================
// Provider Trait Implementation
// =============================================================================

impl Provider for ClumioProvider {
    fn name(&self) -> &'static str {
        "clumio"
    }

    fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
        resource_types()
    }

    fn read(&self, id: &ResourceId, identifier: &str) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        Box::pin(async move { self.read_resource(&id, &identifier).await })
    }

    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        let resource = resource.clone();
        Box::pin(async move { self.create_resource(&resource).await })
    }

    fn update(
        &self,
        id: &ResourceId,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        let from = from.clone();
        let to = to.clone();
        Box::pin(async move { self.update_resource(&id, &identifier, &from, &to).await })
    }

    fn delete(&self, id: &ResourceId, identifier: &str) -> BoxFuture<'_, ProviderResult<()>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        Box::pin(async move { self.delete_resource(&id, &identifier).await })
    }

    fn read_data_source(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        let resource = resource.clone();
        Box::pin(async move { self.read_data_source_resource(&resource).await })
    }
}
