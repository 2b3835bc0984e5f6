//! Provider - Trait abstracting resource operations
//!
//! A Provider translates lifecycle calls (create/read/update/delete) on
//! resources into backend API calls, and reports failures as a
//! [`ProviderError`] whose [`ErrorKind`] drives the diagnostics shown to the user.

use std::future::Future;
use std::pin::Pin;

use crate::poll::PollError;
use crate::resource::{Resource, ResourceId, State};

/// Classification of a provider failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// HTTP 404: the resource does not exist (anymore)
    NotFound,
    /// HTTP 401/403
    Auth,
    /// Any other HTTP failure reported by the API
    Api,
    /// The API answered without error but returned no payload
    NilResponse,
    /// A network failure before any HTTP status was received
    Transport,
    /// A poll loop ran out of time
    PollTimeout,
    /// A poll loop was cancelled by the caller
    PollCancelled,
    /// The polled condition reported a permanent failure (e.g. task aborted)
    TerminalFailure,
    /// Invalid input: missing attribute, forbidden change, bad configuration
    InvalidConfig,
}

/// Error type for Provider operations
#[derive(Debug)]
pub struct ProviderError {
    pub kind: ErrorKind,
    pub message: String,
    pub resource_id: Option<ResourceId>,
    /// HTTP status code, when the failure came from an API response
    pub status: Option<u16>,
    pub cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(ref id) = self.resource_id {
            write!(f, "[{}] {}", id, self.message)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for ProviderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_ref()
            .map(|e| e.as_ref() as &dyn std::error::Error)
    }
}

impl ProviderError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            resource_id: None,
            status: None,
            cause: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message).with_status(404)
    }

    pub fn api(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Api, message)
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidConfig, message)
    }

    pub fn nil_response() -> Self {
        Self::new(ErrorKind::NilResponse, "unexpected API response")
    }

    pub fn for_resource(mut self, id: ResourceId) -> Self {
        self.resource_id = Some(id);
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_cause(mut self, cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }
}

impl From<PollError<ProviderError>> for ProviderError {
    fn from(err: PollError<ProviderError>) -> Self {
        match err {
            PollError::Api(inner) => inner,
            PollError::TerminalFailure(reason) => Self::new(ErrorKind::TerminalFailure, reason),
            err @ PollError::Timeout { .. } => Self::new(ErrorKind::PollTimeout, err.to_string()),
            err @ PollError::Cancelled { .. } => {
                Self::new(ErrorKind::PollCancelled, err.to_string())
            }
            err @ PollError::InvalidConfig(_) => {
                Self::new(ErrorKind::InvalidConfig, err.to_string())
            }
        }
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Return type for async operations
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Definition of resource types that a Provider can handle
pub trait ResourceType: Send + Sync {
    /// Resource type name (e.g., "protection_group")
    fn name(&self) -> &'static str;

    /// Whether the type is also available as a read-only data source
    fn has_data_source(&self) -> bool {
        false
    }
}

/// Main Provider trait
///
/// All operations are async and involve side effects.
pub trait Provider: Send + Sync {
    /// Name of this Provider (e.g., "clumio")
    fn name(&self) -> &'static str;

    /// List of resource types this Provider can handle
    fn resource_types(&self) -> Vec<Box<dyn ResourceType>>;

    /// Get the current state of a resource
    ///
    /// Returns `State::not_found()` if the resource does not exist.
    fn read(&self, id: &ResourceId, identifier: &str) -> BoxFuture<'_, ProviderResult<State>>;

    /// Create a resource
    ///
    /// Returns State with identifier set to the backend ID
    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>>;

    /// Update a resource in place
    fn update(
        &self,
        id: &ResourceId,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> BoxFuture<'_, ProviderResult<State>>;

    /// Delete a resource
    fn delete(&self, id: &ResourceId, identifier: &str) -> BoxFuture<'_, ProviderResult<()>>;

    /// Look up a data source from its query attributes
    fn read_data_source(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>>;

    /// Import an existing backend object by identifier
    fn import(&self, id: &ResourceId, identifier: &str) -> BoxFuture<'_, ProviderResult<State>> {
        self.read(id, identifier)
    }
}
