//! Error types for identity resolution
//!
//! Every error in this module is raised before any call reaches the identity
//! service: they describe mistakes in the declared attributes themselves.

use thiserror::Error;

/// Resolution error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// More than one scope attribute was declared
    #[error("Invalid scope combination: {0} are mutually exclusive")]
    InvalidScope(String),

    /// No project, domain or system scope was declared
    #[error("Missing scope: one of project, domain or system is required")]
    MissingScope,

    /// A project domain was declared without a project
    #[error("Invalid scope combination: project_domain requires project")]
    ProjectDomainWithoutProject,

    /// Project or domain scope with an empty name
    #[error("Missing scope name for {0} scope")]
    MissingScopeName(&'static str),

    /// The principal name is empty
    #[error("Missing principal name")]
    MissingPrincipal,

    /// Two declarations resolve to the same assignment target
    #[error("Conflicting declarations '{first}' and '{second}' both resolve to {key}")]
    Conflict {
        /// Label of the declaration seen first.
        first: String,
        /// Label of the declaration that collided with it.
        second: String,
        /// Canonical key both resolved to.
        key: String,
    },

    /// Attempt to set an attribute the identity service owns
    #[error("Attribute '{0}' is read only")]
    ReadOnlyAttribute(&'static str),

    /// A name failed validation
    #[error("Invalid {kind} name: {value:?}")]
    InvalidName {
        /// What was being named (e.g. "role").
        kind: &'static str,
        /// The rejected value.
        value: String,
    },
}

/// Result type for resolution operations.
pub type ResolveResult<T> = Result<T, ResolveError>;

impl ResolveError {
    /// Check if this error stems from two declarations describing the same
    /// assignment.
    ///
    /// Conflicts abort the whole pass for the pair; the other variants only
    /// reject a single declaration.
    pub fn is_conflict(&self) -> bool {
        matches!(self, ResolveError::Conflict { .. })
    }

    /// Check if this error is a mistake in declared configuration, as opposed
    /// to a usage error against the API.
    pub fn is_configuration_error(&self) -> bool {
        !matches!(self, ResolveError::ReadOnlyAttribute(_))
    }

    /// Get a stable error code for reporting.
    pub fn error_code(&self) -> &'static str {
        match self {
            ResolveError::InvalidScope(_) => "INVALID_SCOPE",
            ResolveError::MissingScope => "MISSING_SCOPE",
            ResolveError::ProjectDomainWithoutProject => "PROJECT_DOMAIN_WITHOUT_PROJECT",
            ResolveError::MissingScopeName(_) => "MISSING_SCOPE_NAME",
            ResolveError::MissingPrincipal => "MISSING_PRINCIPAL",
            ResolveError::Conflict { .. } => "CONFLICT",
            ResolveError::ReadOnlyAttribute(_) => "READ_ONLY_ATTRIBUTE",
            ResolveError::InvalidName { .. } => "INVALID_NAME",
        }
    }
}
