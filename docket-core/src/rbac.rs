//! Role-based permissions.
//!
//! A static role to permission mapping plus the [`SecurityContext`] that
//! derives a signed-in user's effective permissions. The result gates what
//! the back office shows; the API server does its own enforcement.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

use crate::resource::ResourceKind;

bitflags! {
    /// Permissions over back-office resources.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Permission: u32 {
        const VIEW_CASES = 1 << 0;
        const MANAGE_CASES = 1 << 1;
        const VIEW_CLIENTS = 1 << 2;
        const MANAGE_CLIENTS = 1 << 3;
        const VIEW_SESSIONS = 1 << 4;
        const MANAGE_SESSIONS = 1 << 5;
        const VIEW_PROCEDURES = 1 << 6;
        const MANAGE_PROCEDURES = 1 << 7;
        const VIEW_COURTS = 1 << 8;
        const MANAGE_COURTS = 1 << 9;
        const VIEW_LAWYERS = 1 << 10;
        const MANAGE_LAWYERS = 1 << 11;
        const VIEW_CONTENT = 1 << 12;
        const MANAGE_CONTENT = 1 << 13;
        const VIEW_USERS = 1 << 14;
        const MANAGE_USERS = 1 << 15;
        const VIEW_REPORTS = 1 << 16;
        /// System settings and role administration.
        const MANAGE_SETTINGS = 1 << 17;
    }
}

impl Default for Permission {
    fn default() -> Self {
        Self::empty()
    }
}

impl Permission {
    /// Permission needed to see a resource.
    pub fn view(kind: ResourceKind) -> Self {
        match kind {
            ResourceKind::Case => Self::VIEW_CASES,
            ResourceKind::Client => Self::VIEW_CLIENTS,
            ResourceKind::Session => Self::VIEW_SESSIONS,
            ResourceKind::Procedure => Self::VIEW_PROCEDURES,
            ResourceKind::Court => Self::VIEW_COURTS,
            ResourceKind::Lawyer => Self::VIEW_LAWYERS,
            ResourceKind::Content => Self::VIEW_CONTENT,
            ResourceKind::User => Self::VIEW_USERS,
        }
    }

    /// Permission needed to create, edit, or delete a resource.
    pub fn manage(kind: ResourceKind) -> Self {
        match kind {
            ResourceKind::Case => Self::MANAGE_CASES,
            ResourceKind::Client => Self::MANAGE_CLIENTS,
            ResourceKind::Session => Self::MANAGE_SESSIONS,
            ResourceKind::Procedure => Self::MANAGE_PROCEDURES,
            ResourceKind::Court => Self::MANAGE_COURTS,
            ResourceKind::Lawyer => Self::MANAGE_LAWYERS,
            ResourceKind::Content => Self::MANAGE_CONTENT,
            ResourceKind::User => Self::MANAGE_USERS,
        }
    }

    /// Parse a backend permission string such as `"manage_cases"` or
    /// `"view-clients"`.
    pub fn parse(name: &str) -> Option<Self> {
        let normalized = name
            .trim()
            .replace(['-', '.', ' '], "_")
            .to_ascii_uppercase();
        Self::from_name(&normalized)
    }
}

/// Back-office roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    Admin,
    Lawyer,
    Secretary,
    Viewer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::Admin => "admin",
            Role::Lawyer => "lawyer",
            Role::Secretary => "secretary",
            Role::Viewer => "viewer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let compact: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .collect::<String>()
            .to_ascii_lowercase();
        match compact.as_str() {
            "superadmin" => Ok(Role::SuperAdmin),
            "admin" => Ok(Role::Admin),
            "lawyer" => Ok(Role::Lawyer),
            "secretary" => Ok(Role::Secretary),
            "viewer" => Ok(Role::Viewer),
            _ => Err(format!("unknown role: {}", s)),
        }
    }
}

/// Static role to permission mapping.
pub fn permissions_for(role: Role) -> Permission {
    let view_case_work = Permission::VIEW_CASES
        | Permission::VIEW_CLIENTS
        | Permission::VIEW_SESSIONS
        | Permission::VIEW_PROCEDURES
        | Permission::VIEW_COURTS
        | Permission::VIEW_LAWYERS;

    match role {
        Role::SuperAdmin => Permission::all(),
        Role::Admin => Permission::all() - Permission::MANAGE_SETTINGS,
        Role::Lawyer => {
            view_case_work
                | Permission::MANAGE_CASES
                | Permission::MANAGE_SESSIONS
                | Permission::MANAGE_PROCEDURES
                | Permission::VIEW_REPORTS
        }
        Role::Secretary => {
            view_case_work | Permission::MANAGE_CLIENTS | Permission::MANAGE_SESSIONS
        }
        Role::Viewer => {
            Permission::VIEW_CASES
                | Permission::VIEW_CLIENTS
                | Permission::VIEW_SESSIONS
                | Permission::VIEW_COURTS
        }
    }
}

/// Effective permissions of the signed-in user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecurityContext {
    roles: Vec<Role>,
    permissions: Permission,
}

impl SecurityContext {
    /// Derive the effective permission set from backend strings.
    ///
    /// The result is the union of every recognised role's permissions plus
    /// the explicitly granted ones, minus the explicitly denied ones.
    /// Unrecognised strings are skipped.
    pub fn derive<R, G, D>(roles: R, granted: G, denied: D) -> Self
    where
        R: IntoIterator,
        R::Item: AsRef<str>,
        G: IntoIterator,
        G::Item: AsRef<str>,
        D: IntoIterator,
        D::Item: AsRef<str>,
    {
        let mut parsed_roles = Vec::new();
        let mut permissions = Permission::empty();

        for raw in roles {
            match raw.as_ref().parse::<Role>() {
                Ok(role) => {
                    if !parsed_roles.contains(&role) {
                        parsed_roles.push(role);
                    }
                    permissions |= permissions_for(role);
                }
                Err(_) => warn!(role = raw.as_ref(), "Ignoring unknown role"),
            }
        }

        permissions |= parse_permissions(granted);
        permissions -= parse_permissions(denied);

        Self {
            roles: parsed_roles,
            permissions,
        }
    }

    /// Build a context straight from typed roles.
    pub fn from_roles(roles: &[Role]) -> Self {
        let mut ctx = Self::default();
        for role in roles {
            if !ctx.roles.contains(role) {
                ctx.roles.push(*role);
            }
            ctx.permissions |= permissions_for(*role);
        }
        ctx
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    pub fn permissions(&self) -> Permission {
        self.permissions
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn can(&self, permission: Permission) -> bool {
        self.permissions.contains(permission)
    }

    pub fn can_all(&self, permissions: &[Permission]) -> bool {
        permissions.iter().all(|p| self.can(*p))
    }

    pub fn can_any(&self, permissions: &[Permission]) -> bool {
        permissions.iter().any(|p| self.can(*p))
    }

    pub fn can_view(&self, kind: ResourceKind) -> bool {
        self.can(Permission::view(kind))
    }

    pub fn can_manage(&self, kind: ResourceKind) -> bool {
        self.can(Permission::manage(kind))
    }

    /// Resources the user may see, in menu order.
    pub fn visible_resources(&self) -> Vec<ResourceKind> {
        ResourceKind::ALL
            .into_iter()
            .filter(|kind| self.can_view(*kind))
            .collect()
    }
}

fn parse_permissions<I>(names: I) -> Permission
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut permissions = Permission::empty();
    for name in names {
        match Permission::parse(name.as_ref()) {
            Some(p) => permissions |= p,
            None => warn!(permission = name.as_ref(), "Ignoring unknown permission"),
        }
    }
    permissions
}
