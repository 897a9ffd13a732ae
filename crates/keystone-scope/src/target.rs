//! Assignment targets
//!
//! This module turns the raw attributes of a declared role assignment into a
//! resolved [`AssignmentTarget`] and its canonical [`TargetKey`].

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::defaults::DomainDefaults;
use crate::error::{ResolveError, ResolveResult};
use crate::scope::{Principal, PrincipalKind, Scope, ScopeKind};

/// Attributes of a role assignment as declared, before defaults are applied.
///
/// Values are trimmed and empty strings count as absent. The `system`
/// attribute is the exception: its presence selects system scope, and an
/// empty value means the default system target.
///
/// # Examples
///
/// ```
/// use keystone_scope::DeclaredAttributes;
///
/// let declared = DeclaredAttributes::user("bob").project("alpha");
/// assert_eq!(declared.principal, "bob");
/// assert!(declared.project_domain.is_none());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DeclaredAttributes {
    /// User or group
    pub principal_kind: PrincipalKind,

    /// Principal name
    pub principal: String,

    /// Domain owning the principal
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal_domain: Option<String>,

    /// Project scope
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,

    /// Domain owning the project
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_domain: Option<String>,

    /// Domain scope
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,

    /// System scope target
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
}

impl DeclaredAttributes {
    /// Start a declaration for a user principal.
    pub fn user(name: impl Into<String>) -> Self {
        Self {
            principal: name.into(),
            ..Self::default()
        }
    }

    /// Start a declaration for a group principal.
    pub fn group(name: impl Into<String>) -> Self {
        Self {
            principal_kind: PrincipalKind::Group,
            principal: name.into(),
            ..Self::default()
        }
    }

    /// Set the principal's domain.
    pub fn principal_domain(mut self, domain: impl Into<String>) -> Self {
        self.principal_domain = Some(domain.into());
        self
    }

    /// Scope the assignment to a project.
    pub fn project(mut self, name: impl Into<String>) -> Self {
        self.project = Some(name.into());
        self
    }

    /// Set the project's owning domain.
    pub fn project_domain(mut self, domain: impl Into<String>) -> Self {
        self.project_domain = Some(domain.into());
        self
    }

    /// Scope the assignment to a domain.
    pub fn domain(mut self, name: impl Into<String>) -> Self {
        self.domain = Some(name.into());
        self
    }

    /// Scope the assignment to the system, with an optional target.
    pub fn system(mut self, target: impl Into<String>) -> Self {
        self.system = Some(target.into());
        self
    }
}

/// A fully resolved role assignment subject.
///
/// Built once per declaration by [`resolve`]; every optional attribute has been
/// replaced by a concrete value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct AssignmentTarget {
    /// Who receives the roles
    pub principal: Principal,

    /// Where the roles apply
    pub scope: Scope,
}

impl AssignmentTarget {
    /// Canonical identity of this target.
    pub fn key(&self) -> TargetKey {
        TargetKey {
            scope_kind: self.scope.kind(),
            scope_name: self.scope.name().to_string(),
            scope_domain: self.scope.domain().unwrap_or_default().to_string(),
            principal_kind: self.principal.kind,
            principal_name: self.principal.name.clone(),
            principal_domain: self.principal.domain.clone(),
        }
    }

    /// Flag/value pairs identifying this target on the command line.
    ///
    /// Scope flags come first, then principal flags. System scope carries only
    /// `--system <target>`.
    ///
    /// # Examples
    ///
    /// ```
    /// use keystone_scope::{resolve, DeclaredAttributes, DomainDefaults};
    ///
    /// let target = resolve(&DeclaredAttributes::user("bob").system(""), &DomainDefaults::default()).unwrap();
    /// assert_eq!(
    ///     target.command_args(),
    ///     vec!["--system", "all", "--user", "bob", "--user-domain", "default"]
    /// );
    /// ```
    pub fn command_args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(8);
        args.push(self.scope.kind().flag().to_string());
        args.push(self.scope.name().to_string());
        if let Some(domain) = self.scope.domain() {
            args.push("--project-domain".to_string());
            args.push(domain.to_string());
        }
        args.push(self.principal.kind.flag().to_string());
        args.push(self.principal.name.clone());
        args.push(self.principal.kind.domain_flag().to_string());
        args.push(self.principal.domain.clone());
        args
    }
}

/// Order-independent identity of an assignment target.
///
/// Two declarations describe the same real-world assignment exactly when their
/// keys are equal. The scope domain is empty for anything but project scope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TargetKey {
    /// Scope kind
    pub scope_kind: ScopeKind,
    /// Scope name (system target for system scope)
    pub scope_name: String,
    /// Project domain, or empty
    pub scope_domain: String,
    /// User or group
    pub principal_kind: PrincipalKind,
    /// Principal name
    pub principal_name: String,
    /// Principal domain
    pub principal_domain: String,
}

impl fmt::Display for TargetKey {
    /// Formats as `user:bob@default::project:alpha@default`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}@{}::{}:{}",
            self.principal_kind,
            self.principal_name,
            self.principal_domain,
            self.scope_kind,
            self.scope_name
        )?;
        if !self.scope_domain.is_empty() {
            write!(f, "@{}", self.scope_domain)?;
        }
        Ok(())
    }
}

/// Trimmed value of a declared attribute, or `None` when blank.
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Resolve declared attributes into an [`AssignmentTarget`].
///
/// Pure and deterministic. Absent or empty domains are replaced with the
/// configured defaults, so an omitted domain and an explicit default domain
/// resolve to the same target.
///
/// # Errors
///
/// - [`ResolveError::InvalidScope`] when more than one scope is declared
/// - [`ResolveError::MissingScope`] when none is declared
/// - [`ResolveError::MissingScopeName`] for a blank project or domain name
/// - [`ResolveError::ProjectDomainWithoutProject`] for a dangling project domain
/// - [`ResolveError::MissingPrincipal`] for an empty principal
///
/// # Examples
///
/// ```
/// use keystone_scope::{resolve, DeclaredAttributes, DomainDefaults};
///
/// let defaults = DomainDefaults::default();
/// let implicit = resolve(&DeclaredAttributes::user("bob").project("alpha"), &defaults).unwrap();
/// let explicit = resolve(
///     &DeclaredAttributes::user("bob")
///         .principal_domain("default")
///         .project("alpha")
///         .project_domain("default"),
///     &defaults,
/// )
/// .unwrap();
/// assert_eq!(implicit.key(), explicit.key());
/// ```
pub fn resolve(
    declared: &DeclaredAttributes,
    defaults: &DomainDefaults,
) -> ResolveResult<AssignmentTarget> {
    let principal_name = declared.principal.trim();
    if principal_name.is_empty() {
        return Err(ResolveError::MissingPrincipal);
    }

    let project = present(&declared.project);
    let project_domain = present(&declared.project_domain);
    let domain = present(&declared.domain);
    let system = declared.system.as_deref();

    let mut declared_scopes = Vec::new();
    if project.is_some() {
        declared_scopes.push(ScopeKind::Project.as_str());
    }
    if domain.is_some() {
        declared_scopes.push(ScopeKind::Domain.as_str());
    }
    if system.is_some() {
        declared_scopes.push(ScopeKind::System.as_str());
    }
    if declared_scopes.len() > 1 {
        return Err(ResolveError::InvalidScope(declared_scopes.join(", ")));
    }
    if project.is_none() && project_domain.is_some() {
        return Err(ResolveError::ProjectDomainWithoutProject);
    }

    let scope = match (project, domain, system) {
        (Some(name), None, None) => Scope::Project {
            name: name.to_string(),
            domain: project_domain
                .unwrap_or(defaults.project_domain.as_str())
                .to_string(),
        },
        (None, Some(name), None) => Scope::Domain {
            name: name.to_string(),
        },
        (None, None, Some(target)) => {
            let target = target.trim();
            Scope::System {
                target: if target.is_empty() {
                    defaults.system_scope.clone()
                } else {
                    target.to_string()
                },
            }
        }
        _ if declared.project.is_some() => return Err(ResolveError::MissingScopeName("project")),
        _ if declared.domain.is_some() => return Err(ResolveError::MissingScopeName("domain")),
        _ => return Err(ResolveError::MissingScope),
    };

    let principal = Principal {
        kind: declared.principal_kind,
        name: principal_name.to_string(),
        domain: present(&declared.principal_domain)
            .unwrap_or(defaults.principal_domain.as_str())
            .to_string(),
    };

    Ok(AssignmentTarget { principal, scope })
}
