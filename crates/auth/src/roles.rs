use std::borrow::Cow;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use beacon_core::{DomainError, RoleId};

/// Role name used for RBAC.
///
/// Role definitions form a global catalog shared by every tenant; only the
/// *assignment* of a role to a user is tenant-scoped. Two names carry meaning
/// for the request gates: [`RoleName::SUPER_ADMIN`] and
/// [`RoleName::TENANT_ADMIN`]. That is a naming convention, the catalog does
/// not treat them specially.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleName(Cow<'static, str>);

impl RoleName {
    pub const SUPER_ADMIN: RoleName = RoleName(Cow::Borrowed("super_admin"));
    pub const TENANT_ADMIN: RoleName = RoleName(Cow::Borrowed("tenant_admin"));
    pub const TENANT_USER: RoleName = RoleName(Cow::Borrowed("tenant_user"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for RoleName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for RoleName {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

/// A catalog role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: RoleName,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for adding a role to the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRole {
    pub name: RoleName,
    pub description: Option<String>,
}

impl NewRole {
    pub fn new(name: impl Into<Cow<'static, str>>, description: Option<String>) -> Self {
        Self {
            name: RoleName::new(name),
            description,
        }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        let name = self.name.as_str();
        if name.trim().is_empty() {
            return Err(DomainError::validation("role name cannot be empty"));
        }
        if name.trim() != name {
            return Err(DomainError::validation(
                "role name cannot have surrounding whitespace",
            ));
        }
        Ok(())
    }
}
