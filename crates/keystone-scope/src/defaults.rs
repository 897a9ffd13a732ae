//! Default domains applied during resolution
//!
//! The identity service fills in its own default domain when a command omits
//! one. Resolution has to apply the same defaults so that an omitted domain and
//! an explicit default domain produce the same key.

use serde::{Deserialize, Serialize};

/// Name of the domain Keystone creates at bootstrap.
pub const DEFAULT_DOMAIN: &str = "default";

/// Target used for system-scoped assignments.
pub const DEFAULT_SYSTEM_SCOPE: &str = "all";

/// Defaults substituted for absent or empty optional attributes.
///
/// # Examples
///
/// ```
/// use keystone_scope::DomainDefaults;
///
/// let defaults = DomainDefaults::default();
/// assert_eq!(defaults.principal_domain, "default");
///
/// let custom = DomainDefaults::with_domain("Corp");
/// assert_eq!(custom.project_domain, "Corp");
/// assert_eq!(custom.system_scope, "all");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DomainDefaults {
    /// Domain assumed for a principal declared without one
    pub principal_domain: String,

    /// Domain assumed for a project declared without one
    pub project_domain: String,

    /// Target assumed for a system scope declared without one
    pub system_scope: String,
}

impl Default for DomainDefaults {
    fn default() -> Self {
        Self {
            principal_domain: DEFAULT_DOMAIN.to_string(),
            project_domain: DEFAULT_DOMAIN.to_string(),
            system_scope: DEFAULT_SYSTEM_SCOPE.to_string(),
        }
    }
}

impl DomainDefaults {
    /// Use one domain as the default for both principals and projects.
    pub fn with_domain(domain: impl Into<String>) -> Self {
        let domain = domain.into();
        Self {
            principal_domain: domain.clone(),
            project_domain: domain,
            ..Self::default()
        }
    }
}
