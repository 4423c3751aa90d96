use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use beacon_auth::{Session, User, UserChanges, UserRole};
use beacon_core::{AssignmentId, RoleId, TenantId, UserId};

// -------------------------
// Request DTOs
// -------------------------

/// Missing fields deserialize as empty so validation can report them with
/// one message.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default, alias = "tenantId")]
    pub tenant_id: Option<TenantId>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    #[serde(default, alias = "currentPassword")]
    pub current_password: String,
    #[serde(default, alias = "newPassword")]
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct GrantRoleRequest {
    pub role: String,
    /// Defaults to the caller's tenant context.
    #[serde(default)]
    pub tenant_id: Option<TenantId>,
    /// Grant in every tenant instead. Super admins only.
    #[serde(default)]
    pub global: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct RevokeRoleQuery {
    #[serde(default)]
    pub tenant_id: Option<TenantId>,
    #[serde(default)]
    pub global: bool,
}

/// Absent fields stay unchanged. Only super admins may set `tenant_id`.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, alias = "tenantId")]
    pub tenant_id: Option<TenantId>,
}

impl From<UpdateUserRequest> for UserChanges {
    fn from(req: UpdateUserRequest) -> Self {
        Self {
            name: req.name,
            email: req.email,
            home_tenant_id: req.tenant_id,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListUsersQuery {
    #[serde(default)]
    pub tenant_id: Option<TenantId>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTenantRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct UserView {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub home_tenant_id: Option<TenantId>,
    pub is_active: bool,
    pub is_system_admin: bool,
    pub last_login: Option<DateTime<Utc>>,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            home_tenant_id: user.home_tenant_id,
            is_active: user.is_active,
            is_system_admin: user.is_system_admin,
            last_login: user.last_login,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub message: &'static str,
    pub user: UserView,
    pub roles: Vec<String>,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl SessionResponse {
    pub fn new(message: &'static str, session: &Session) -> Self {
        Self {
            message,
            user: UserView::from(&session.user),
            roles: session.roles.iter().map(ToString::to_string).collect(),
            token: session.token.token.clone(),
            expires_at: session.token.expires_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AssignmentView {
    pub id: AssignmentId,
    pub user_id: UserId,
    pub role_id: RoleId,
    pub role: Option<String>,
    pub tenant_id: Option<TenantId>,
    pub assigned_by: UserId,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AssignmentView {
    pub fn new(row: &UserRole, role: Option<String>) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            role_id: row.role_id,
            role,
            tenant_id: row.tenant_id,
            assigned_by: row.assigned_by,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
