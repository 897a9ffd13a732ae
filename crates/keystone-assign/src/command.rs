//! Command collaborator interface.
//!
//! Everything the reconciler knows about the identity service arrives through
//! [`Invoke`]: run one sub-command with arguments, get back structured records
//! or an error.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Command group a call addresses.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// `role`: grants and revokes
    Role,

    /// `role assignment`: queries
    RoleAssignment,
}

impl ResourceKind {
    /// Words making up the command group on the command line.
    pub fn words(&self) -> &'static [&'static str] {
        match self {
            Self::Role => &["role"],
            Self::RoleAssignment => &["role", "assignment"],
        }
    }

    /// Get string representation of the command group.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Role => "role",
            Self::RoleAssignment => "role assignment",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sub-command within a command group.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Grant a role
    Add,

    /// Revoke a role
    Remove,

    /// Query assignments
    List,
}

impl Action {
    /// Get string representation of the action.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Remove => "remove",
            Self::List => "list",
        }
    }

    /// Check if the action only reads.
    pub fn is_read_only(&self) -> bool {
        matches!(self, Self::List)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of command output.
///
/// Field names are normalized on insertion (lowercased, spaces replaced by
/// underscores), so the CLI's `Role` column is read back as `role`.
///
/// # Examples
///
/// ```
/// use keystone_assign::Record;
///
/// let record = Record::new().with("Role", "admin").with("User", "bob@Default");
/// assert_eq!(record.get("role"), Some("admin"));
/// assert_eq!(record.get("USER"), Some("bob@Default"));
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Record {
    fields: BTreeMap<String, String>,
}

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert a field, normalizing its name.
    pub fn insert(&mut self, key: impl AsRef<str>, value: impl Into<String>) {
        self.fields.insert(normalize_key(key.as_ref()), value.into());
    }

    /// Look up a field by name. Empty values read as absent.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .get(&normalize_key(key))
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Record {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut record = Record::new();
        for (key, value) in iter {
            record.insert(key, value);
        }
        record
    }
}

fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase().replace(' ', "_")
}

/// Classification of a failed call.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CommandErrorKind {
    /// The addressed role, principal, scope or assignment does not exist
    NotFound,

    /// The service could not be reached or was temporarily unavailable
    Transient,

    /// Any other failure reported by the command
    Failed,

    /// The command could not be started
    Spawn,

    /// The command's output could not be parsed
    Parse,
}

impl CommandErrorKind {
    /// Get string representation of the error kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not found",
            Self::Transient => "transient",
            Self::Failed => "failed",
            Self::Spawn => "spawn",
            Self::Parse => "parse",
        }
    }
}

impl fmt::Display for CommandErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed call to the command collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("`{command}` failed ({kind}): {message}")]
pub struct CommandError {
    /// Failure classification.
    pub kind: CommandErrorKind,

    /// Command line that failed.
    pub command: String,

    /// Error output or description.
    pub message: String,
}

impl CommandError {
    /// Create a new command error.
    pub fn new(
        kind: CommandErrorKind,
        command: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            command: command.into(),
            message: message.into(),
        }
    }

    /// Check if the addressed object does not exist.
    pub fn is_not_found(&self) -> bool {
        self.kind == CommandErrorKind::NotFound
    }

    /// Check if retrying the call may succeed.
    pub fn is_transient(&self) -> bool {
        self.kind == CommandErrorKind::Transient
    }
}

/// Executes identity service sub-commands.
///
/// Implementations block until the command finishes. Retrying transient
/// failures is the implementation's business; callers never retry.
pub trait Invoke {
    /// Run `resource action args...` and return the parsed output records.
    ///
    /// Grant and revoke calls return no records.
    fn invoke(
        &self,
        resource: ResourceKind,
        action: Action,
        args: &[String],
    ) -> Result<Vec<Record>, CommandError>;
}

impl<T: Invoke + ?Sized> Invoke for &T {
    fn invoke(
        &self,
        resource: ResourceKind,
        action: Action,
        args: &[String],
    ) -> Result<Vec<Record>, CommandError> {
        (**self).invoke(resource, action, args)
    }
}

/// Render a call as a single command line, for logs and errors.
pub fn command_line(program: &str, resource: ResourceKind, action: Action, args: &[String]) -> String {
    let mut line = format!("{} {} {}", program, resource, action);
    for arg in args {
        line.push(' ');
        line.push_str(arg);
    }
    line
}
