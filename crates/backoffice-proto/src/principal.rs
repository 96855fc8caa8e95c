//! Principals and their role.
//!
//! A principal always carries exactly one [`Role`]. A role holds a list of
//! [`RoleGrant`]s, each pointing at a [`Permission`] or at nothing when the
//! permission was deleted after being granted.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::EntityId;

/// Role values that identify the built-in super role.
pub const SUPER_ROLE_VALUES: &[&str] = &["superadmin", "super-admin"];

/// Which collection a principal lives in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrincipalKind {
    /// Back-office administrator.
    #[default]
    Admin,
    /// Business user.
    User,
}

impl PrincipalKind {
    /// Collection name used in record paths.
    pub fn collection(&self) -> &'static str {
        match self {
            PrincipalKind::Admin => "admins",
            PrincipalKind::User => "users",
        }
    }
}

impl fmt::Display for PrincipalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrincipalKind::Admin => write!(f, "admin"),
            PrincipalKind::User => write!(f, "user"),
        }
    }
}

/// A grantable capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Unique key compared during authorization, e.g. `admin-create`.
    pub action_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Permission {
    /// Create a permission identified only by its action key.
    pub fn new(action_key: impl Into<String>) -> Self {
        Self {
            id: None,
            name: None,
            action_key: action_key.into(),
            category: None,
            description: None,
        }
    }

    /// Set the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the category.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

/// Association between a role and a permission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleGrant {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    /// `None` when the permission no longer exists.
    #[serde(default)]
    pub permission: Option<Permission>,
}

impl RoleGrant {
    /// A grant of `permission`.
    pub fn of(permission: Permission) -> Self {
        Self {
            id: None,
            permission: Some(permission),
        }
    }

    /// A grant whose permission has been deleted.
    pub fn dangling() -> Self {
        Self {
            id: None,
            permission: None,
        }
    }
}

/// A named bundle of grants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    pub name: String,
    /// Machine-readable role name.
    pub value: String,
    #[serde(default, rename = "rolePermissions", alias = "grants")]
    pub grants: Vec<RoleGrant>,
}

impl Role {
    /// Create a role without grants.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            value: value.into(),
            grants: Vec::new(),
        }
    }

    /// Add a grant for the given action key.
    pub fn with_permission(mut self, action_key: impl Into<String>) -> Self {
        self.grants.push(RoleGrant::of(Permission::new(action_key)));
        self
    }

    /// Add a grant.
    pub fn with_grant(mut self, grant: RoleGrant) -> Self {
        self.grants.push(grant);
        self
    }

    /// Action keys of the grants that still point at a permission.
    pub fn action_keys(&self) -> impl Iterator<Item = &str> {
        self.grants
            .iter()
            .filter_map(|grant| grant.permission.as_ref())
            .map(|permission| permission.action_key.as_str())
    }

    /// Whether this is the built-in super role.
    pub fn is_super_role(&self) -> bool {
        SUPER_ROLE_VALUES
            .iter()
            .any(|value| self.value.eq_ignore_ascii_case(value))
    }
}

/// The authenticated actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub id: EntityId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub kind: PrincipalKind,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Principal {
    /// Create a principal.
    pub fn new(id: impl Into<EntityId>, kind: PrincipalKind, role: Role) -> Self {
        Self {
            id: id.into(),
            username: None,
            email: None,
            name: None,
            kind,
            role,
            created_at: None,
        }
    }

    /// Set the username.
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Set the email.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Name to show for this principal.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.username.as_deref())
            .or(self.email.as_deref())
            .unwrap_or_else(|| self.id.as_str())
    }

    /// Stable identity used to tell sessions apart.
    pub fn identity(&self) -> (PrincipalKind, &EntityId) {
        (self.kind, &self.id)
    }
}
