//! Scopes and principals
//!
//! A role is always granted to a principal (a user or a group) on exactly one
//! scope: a project, a domain, or the system as a whole.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of boundary a role is granted on.
///
/// # Examples
///
/// ```
/// use keystone_scope::ScopeKind;
///
/// assert_eq!(ScopeKind::parse("Project"), Some(ScopeKind::Project));
/// assert_eq!(ScopeKind::System.as_str(), "system");
/// assert_eq!(ScopeKind::parse("tenant"), None);
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKind {
    /// A single project, owned by a domain
    Project,

    /// A whole domain
    Domain,

    /// The deployment as a whole
    System,
}

impl ScopeKind {
    /// Parse a scope kind (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "project" => Some(Self::Project),
            "domain" => Some(Self::Domain),
            "system" => Some(Self::System),
            _ => None,
        }
    }

    /// Get string representation of the scope kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Domain => "domain",
            Self::System => "system",
        }
    }

    /// Command line flag selecting this scope.
    pub fn flag(&self) -> &'static str {
        match self {
            Self::Project => "--project",
            Self::Domain => "--domain",
            Self::System => "--system",
        }
    }
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the principal is a single user or a group of users.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PrincipalKind {
    /// An individual user
    #[default]
    User,

    /// A group; every member inherits the assignment
    Group,
}

impl PrincipalKind {
    /// Parse a principal kind (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "user" => Some(Self::User),
            "group" => Some(Self::Group),
            _ => None,
        }
    }

    /// Get string representation of the principal kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Group => "group",
        }
    }

    /// Command line flag naming the principal.
    pub fn flag(&self) -> &'static str {
        match self {
            Self::User => "--user",
            Self::Group => "--group",
        }
    }

    /// Command line flag naming the principal's owning domain.
    pub fn domain_flag(&self) -> &'static str {
        match self {
            Self::User => "--user-domain",
            Self::Group => "--group-domain",
        }
    }
}

impl fmt::Display for PrincipalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved principal. The domain is always concrete.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Principal {
    /// User or group
    pub kind: PrincipalKind,

    /// Principal name
    pub name: String,

    /// Domain owning the principal
    pub domain: String,
}

/// A resolved scope.
///
/// Only project scopes carry a domain; system scopes carry a target (normally
/// `all`) instead of a name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Scope {
    /// Project scope with its owning domain
    Project {
        /// Project name
        name: String,
        /// Domain owning the project
        domain: String,
    },

    /// Domain scope
    Domain {
        /// Domain name
        name: String,
    },

    /// System scope
    System {
        /// System target, e.g. `all`
        target: String,
    },
}

impl Scope {
    /// The kind of this scope.
    pub fn kind(&self) -> ScopeKind {
        match self {
            Scope::Project { .. } => ScopeKind::Project,
            Scope::Domain { .. } => ScopeKind::Domain,
            Scope::System { .. } => ScopeKind::System,
        }
    }

    /// Scope name, or the system target for system scope.
    pub fn name(&self) -> &str {
        match self {
            Scope::Project { name, .. } | Scope::Domain { name } => name,
            Scope::System { target } => target,
        }
    }

    /// Owning domain; present only for project scope.
    pub fn domain(&self) -> Option<&str> {
        match self {
            Scope::Project { domain, .. } => Some(domain),
            _ => None,
        }
    }
}
