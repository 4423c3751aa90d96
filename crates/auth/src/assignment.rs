use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use beacon_core::{AssignmentId, PermissionId, RoleId, TenantId, UserId};

/// A (user, role, optional tenant) grant.
///
/// `tenant_id == None` means the role applies in every tenant context.
/// Rows are never deleted; revocation flips `is_active` so history stays
/// auditable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRole {
    pub id: AssignmentId,
    pub user_id: UserId,
    pub role_id: RoleId,
    pub tenant_id: Option<TenantId>,
    pub assigned_by: UserId,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRole {
    pub fn is_global(&self) -> bool {
        self.tenant_id.is_none()
    }

    /// Whether this row contributes to resolution in the given tenant context.
    pub fn applies_to(&self, tenant: Option<TenantId>) -> bool {
        if !self.is_active {
            return false;
        }
        match self.tenant_id {
            None => true,
            Some(scoped) => tenant == Some(scoped),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewAssignment {
    pub user_id: UserId,
    pub role_id: RoleId,
    pub tenant_id: Option<TenantId>,
    pub assigned_by: UserId,
}

/// A role → permission link. At most one per pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RolePermission {
    pub role_id: RoleId,
    pub permission_id: PermissionId,
}
