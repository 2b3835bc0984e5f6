//! Lifecycle - Host side resource operations
//!
//! Each operation drives a [`Provider`] and folds the outcome into a
//! [`Response`]: the resulting state (if any) plus diagnostics. Nothing here
//! returns an error; failures are reported to the caller as diagnostics.

use log::{info, warn};

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::provider::{Provider, ProviderError};
use crate::resource::{Resource, ResourceId, State};

/// Result of a lifecycle operation
#[derive(Debug, Default)]
pub struct Response {
    /// New state. `None` means the resource is absent and must be dropped.
    pub state: Option<State>,
    pub diagnostics: Diagnostics,
}

impl Response {
    fn ok(state: State) -> Self {
        Self {
            state: Some(state),
            diagnostics: Diagnostics::default(),
        }
    }

    fn failed(err: &ProviderError, id: &ResourceId) -> Self {
        Self::error(Diagnostic::from_error(err), id)
    }

    /// Failure of an operation that writes: a 404 is an error, not a removal
    fn rejected(err: &ProviderError, id: &ResourceId) -> Self {
        Self::error(Diagnostic::error_from(err), id)
    }

    fn error(diag: Diagnostic, id: &ResourceId) -> Self {
        let mut diagnostics = Diagnostics::default();
        diagnostics.add(match diag.resource {
            Some(_) => diag,
            None => diag.for_resource(id.clone()),
        });
        Self {
            state: None,
            diagnostics,
        }
    }

    /// The provider answered with an absent state after writing it
    fn vanished(id: &ResourceId, operation: &str) -> Self {
        Self::error(
            Diagnostic::error(
                "Unexpected API response",
                format!("{} was not found after {}", id, operation),
            ),
            id,
        )
    }

    fn removed(id: &ResourceId, detail: String) -> Self {
        let mut diagnostics = Diagnostics::default();
        diagnostics.add(Diagnostic::warning("Resource not found", detail).for_resource(id.clone()));
        Self {
            state: None,
            diagnostics,
        }
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.has_errors()
    }
}

pub async fn create<P: Provider + ?Sized>(provider: &P, resource: &Resource) -> Response {
    info!("creating {}", resource.id);
    match provider.create(resource).await {
        Ok(state) if state.exists => Response::ok(state),
        Ok(_) => Response::vanished(&resource.id, "create"),
        Err(err) => Response::rejected(&err, &resource.id),
    }
}

/// Refresh a resource. A missing resource is removed from state with a warning.
pub async fn read<P: Provider + ?Sized>(
    provider: &P,
    id: &ResourceId,
    identifier: &str,
) -> Response {
    info!("reading {} ({})", id, identifier);
    match provider.read(id, identifier).await {
        Ok(state) if state.exists => Response::ok(state),
        Ok(_) => {
            warn!("{} ({}) no longer exists", id, identifier);
            Response::removed(
                id,
                format!("{} was not found; removing it from state", identifier),
            )
        }
        Err(err) if err.is_not_found() => {
            warn!("{} ({}) no longer exists", id, identifier);
            Response::failed(&err, id)
        }
        Err(err) => Response::failed(&err, id),
    }
}

pub async fn update<P: Provider + ?Sized>(
    provider: &P,
    id: &ResourceId,
    identifier: &str,
    from: &State,
    to: &Resource,
) -> Response {
    info!("updating {} ({})", id, identifier);
    match provider.update(id, identifier, from, to).await {
        Ok(state) if state.exists => Response::ok(state),
        Ok(_) => Response::vanished(id, "update"),
        Err(err) => Response::rejected(&err, id),
    }
}

/// Delete a resource. Deleting something already gone succeeds with a warning.
pub async fn delete<P: Provider + ?Sized>(
    provider: &P,
    id: &ResourceId,
    identifier: &str,
) -> Response {
    info!("deleting {} ({})", id, identifier);
    match provider.delete(id, identifier).await {
        Ok(()) => Response::default(),
        Err(err) if err.is_not_found() => {
            Response::removed(id, format!("{} was already deleted", identifier))
        }
        Err(err) => Response::failed(&err, id),
    }
}

/// Adopt an existing backend object
pub async fn import<P: Provider + ?Sized>(
    provider: &P,
    id: &ResourceId,
    identifier: &str,
) -> Response {
    info!("importing {} ({})", id, identifier);
    match provider.import(id, identifier).await {
        Ok(state) if state.exists => Response::ok(state),
        Ok(_) => not_importable(id, identifier),
        Err(err) if err.is_not_found() => not_importable(id, identifier),
        Err(err) => Response::failed(&err, id),
    }
}

fn not_importable(id: &ResourceId, identifier: &str) -> Response {
    let mut diagnostics = Diagnostics::default();
    diagnostics.add(
        Diagnostic::error(
            "Cannot import non-existent remote object",
            format!("no {} with identifier {}", id.resource_type, identifier),
        )
        .for_resource(id.clone()),
    );
    Response {
        state: None,
        diagnostics,
    }
}

pub async fn read_data_source<P: Provider + ?Sized>(
    provider: &P,
    resource: &Resource,
) -> Response {
    info!("reading data source {}", resource.id);
    if !resource.is_data_source() {
        let mut diagnostics = Diagnostics::default();
        diagnostics.add(
            Diagnostic::error("Invalid configuration", "resource is not a data source")
                .for_resource(resource.id.clone()),
        );
        return Response {
            state: None,
            diagnostics,
        };
    }
    match provider.read_data_source(resource).await {
        Ok(state) => Response::ok(state),
        Err(err) => Response::rejected(&err, &resource.id),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::diagnostics::AUTH_ERROR_DETAIL;
    use crate::provider::{BoxFuture, ErrorKind, ProviderResult, ResourceType};
    use crate::resource::Value;

    // Mock Provider for testing: "missing" identifiers do not exist,
    // "gone" identifiers answer 404 and "denied" answers 401.
    struct MockProvider;

    fn lookup(id: &ResourceId, identifier: &str) -> ProviderResult<State> {
        match identifier {
            "missing" => Ok(State::not_found(id.clone())),
            "gone" => Err(ProviderError::not_found("gone")),
            "denied" => Err(ProviderError::new(ErrorKind::Auth, "401").with_status(401)),
            _ => Ok(State::existing(id.clone(), HashMap::new()).with_identifier(identifier)),
        }
    }

    impl Provider for MockProvider {
        fn name(&self) -> &'static str {
            "mock"
        }

        fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
            vec![]
        }

        fn read(&self, id: &ResourceId, identifier: &str) -> BoxFuture<'_, ProviderResult<State>> {
            let result = lookup(id, identifier);
            Box::pin(async move { result })
        }

        fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
            let id = resource.id.clone();
            let attrs = resource.attributes.clone();
            Box::pin(async move { Ok(State::existing(id, attrs).with_identifier("mock-id-123")) })
        }

        fn update(
            &self,
            id: &ResourceId,
            identifier: &str,
            _from: &State,
            to: &Resource,
        ) -> BoxFuture<'_, ProviderResult<State>> {
            let result = match identifier {
                "gone" => Err(ProviderError::not_found("gone")),
                "missing" => Ok(State::not_found(id.clone())),
                _ => Ok(State::existing(id.clone(), to.attributes.clone())),
            };
            Box::pin(async move { result })
        }

        fn delete(&self, _id: &ResourceId, identifier: &str) -> BoxFuture<'_, ProviderResult<()>> {
            let result = match identifier {
                "gone" => Err(ProviderError::not_found("gone")),
                "locked" => Err(ProviderError::api("resource is locked").with_status(409)),
                _ => Ok(()),
            };
            Box::pin(async move { result })
        }

        fn read_data_source(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
            let id = resource.id.clone();
            Box::pin(async move {
                Ok(State::existing(id, HashMap::new()).with_identifier("ds-1"))
            })
        }
    }

    fn id() -> ResourceId {
        ResourceId::new("protection_group", "main")
    }

    #[tokio::test]
    async fn create_returns_state() {
        let resource = Resource::new("protection_group", "main")
            .with_attribute("name", Value::String("pg".to_string()));
        let response = create(&MockProvider, &resource).await;

        assert!(response.diagnostics.is_empty());
        let state = response.state.unwrap();
        assert_eq!(state.identifier.as_deref(), Some("mock-id-123"));
        assert_eq!(state.get_str("name"), Some("pg"));
    }

    #[tokio::test]
    async fn update_of_missing_object_is_an_error() {
        let to = Resource::new("protection_group", "main");
        let from = State::existing(id(), HashMap::new());

        let response = update(&MockProvider, &id(), "gone", &from, &to).await;
        assert!(response.state.is_none());
        assert!(response.diagnostics.warnings.is_empty());
        assert_eq!(response.diagnostics.errors[0].summary, "API error (HTTP 404)");
        assert_eq!(response.diagnostics.errors[0].resource, Some(id()));

        let response = update(&MockProvider, &id(), "missing", &from, &to).await;
        assert!(response.has_errors());
        assert_eq!(
            response.diagnostics.errors[0].summary,
            "Unexpected API response"
        );
    }

    #[tokio::test]
    async fn read_missing_resource_is_removed_with_warning() {
        for identifier in ["missing", "gone"] {
            let response = read(&MockProvider, &id(), identifier).await;
            assert!(response.state.is_none());
            assert!(!response.has_errors());
            assert_eq!(response.diagnostics.warnings.len(), 1);
        }
    }

    #[tokio::test]
    async fn read_auth_failure_is_an_error() {
        let response = read(&MockProvider, &id(), "denied").await;
        assert!(response.has_errors());
        assert_eq!(response.diagnostics.errors[0].detail, AUTH_ERROR_DETAIL);
        assert_eq!(response.diagnostics.errors[0].resource, Some(id()));
    }

    #[tokio::test]
    async fn delete_tolerates_missing_resource() {
        let response = delete(&MockProvider, &id(), "gone").await;
        assert!(!response.has_errors());
        assert_eq!(response.diagnostics.warnings.len(), 1);

        let response = delete(&MockProvider, &id(), "locked").await;
        assert!(response.has_errors());
    }

    #[tokio::test]
    async fn import_requires_existing_object() {
        let response = import(&MockProvider, &id(), "missing").await;
        assert!(response.has_errors());
        assert_eq!(
            response.diagnostics.errors[0].summary,
            "Cannot import non-existent remote object"
        );

        let response = import(&MockProvider, &id(), "pg-1").await;
        assert_eq!(response.state.unwrap().identifier.as_deref(), Some("pg-1"));
    }

    #[tokio::test]
    async fn data_source_requires_read_only_resource() {
        let resource = Resource::new("protection_group", "lookup");
        let response = read_data_source(&MockProvider, &resource).await;
        assert!(response.has_errors());

        let response = read_data_source(&MockProvider, &resource.with_read_only(true)).await;
        assert!(response.state.is_some());
    }
}
