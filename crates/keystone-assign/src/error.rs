//! Error types for reconciliation
//!
//! Failures from the command collaborator pass through unchanged; this layer
//! neither retries them nor summarizes partially applied batches.

use keystone_scope::ResolveError;
use thiserror::Error;

use crate::command::CommandError;
use crate::config::ConfigError;

/// Reconciliation error types.
#[derive(Debug, Error)]
pub enum AssignError {
    /// Declared attributes or role names were rejected
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// A grant, revoke or list call failed
    #[error(transparent)]
    Command(#[from] CommandError),

    /// The reconciler configuration is unusable
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for reconciliation operations.
pub type AssignResult<T> = Result<T, AssignError>;

impl AssignError {
    /// Check if this error happened before any call reached the service.
    pub fn is_local(&self) -> bool {
        !matches!(self, AssignError::Command(_))
    }

    /// The collaborator's error, if a call failed.
    pub fn command_error(&self) -> Option<&CommandError> {
        match self {
            AssignError::Command(err) => Some(err),
            _ => None,
        }
    }
}
