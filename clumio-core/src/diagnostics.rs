//! Diagnostics - User facing errors and warnings
//!
//! Every failure of a lifecycle operation is reported as a diagnostic rather
//! than aborting the process. Errors abort the operation, warnings do not.

use std::fmt;

use crate::provider::{ErrorKind, ProviderError};
use crate::resource::ResourceId;

/// Fixed message shown for HTTP 401/403
pub const AUTH_ERROR_DETAIL: &str = "authentication failed: check the API token and base URL";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub summary: String,
    pub detail: String,
    pub resource: Option<ResourceId>,
}

impl Diagnostic {
    pub fn error(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            summary: summary.into(),
            detail: detail.into(),
            resource: None,
        }
    }

    pub fn warning(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            summary: summary.into(),
            detail: detail.into(),
            resource: None,
        }
    }

    pub fn for_resource(mut self, id: ResourceId) -> Self {
        self.resource = Some(id);
        self
    }

    /// Build the diagnostic for a provider failure
    pub fn from_error(err: &ProviderError) -> Self {
        let diag = match err.kind {
            ErrorKind::NotFound => Self::warning(
                "Resource not found",
                format!("{}; removing it from state", err.message),
            ),
            ErrorKind::Auth => Self::error("Authentication error", AUTH_ERROR_DETAIL),
            ErrorKind::Api => {
                let summary = match err.status {
                    Some(status) => format!("API error (HTTP {})", status),
                    None => "API error".to_string(),
                };
                Self::error(summary, err.message.clone())
            }
            ErrorKind::NilResponse => Self::error("Unexpected API response", err.message.clone()),
            ErrorKind::Transport => Self::error("Request failed", err.message.clone()),
            ErrorKind::PollTimeout => {
                Self::error("Timed out waiting for resource", err.message.clone())
            }
            ErrorKind::PollCancelled => Self::error("Operation cancelled", err.message.clone()),
            ErrorKind::TerminalFailure => {
                Self::error("Backend operation failed", err.message.clone())
            }
            ErrorKind::InvalidConfig => Self::error("Invalid configuration", err.message.clone()),
        };
        match &err.resource_id {
            Some(id) => diag.for_resource(id.clone()),
            None => diag,
        }
    }

    /// Like [`Diagnostic::from_error`], but a missing object is an error too.
    /// Create, update and data source reads have no state to drop.
    pub fn error_from(err: &ProviderError) -> Self {
        if err.kind != ErrorKind::NotFound {
            return Self::from_error(err);
        }
        let diag = Self::error(
            format!("API error (HTTP {})", err.status.unwrap_or(404)),
            err.message.clone(),
        );
        match &err.resource_id {
            Some(id) => diag.for_resource(id.clone()),
            None => diag,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref id) = self.resource {
            write!(f, "{}: ", id)?;
        }
        if self.detail.is_empty() {
            write!(f, "{}", self.summary)
        } else {
            write!(f, "{}: {}", self.summary, self.detail)
        }
    }
}

/// List of errors and warnings returned to the caller
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn add(&mut self, diag: Diagnostic) {
        match diag.severity {
            Severity::Error => self.errors.push(diag),
            Severity::Warning => self.warnings.push(diag),
        }
    }

    pub fn error(&mut self, summary: impl Into<String>, detail: impl Into<String>) {
        self.add(Diagnostic::error(summary, detail))
    }

    pub fn warning(&mut self, summary: impl Into<String>, detail: impl Into<String>) {
        self.add(Diagnostic::warning(summary, detail))
    }

    pub fn add_error_from(&mut self, err: &ProviderError) {
        self.add(Diagnostic::from_error(err))
    }

    pub fn extend(&mut self, mut other: Diagnostics) {
        self.errors.append(&mut other.errors);
        self.warnings.append(&mut other.warnings);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }

    /// All diagnostics, errors first
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.errors.iter().chain(self.warnings.iter())
    }
}
