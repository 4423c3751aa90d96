//! Persistence contract for tenants, users, the role/permission catalog and
//! role assignments.
//!
//! Implementations live in `beacon-infra` (in-memory and Postgres). The trait
//! is object-safe so services share one `Arc<dyn CredentialStore>`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use beacon_core::{DomainError, PermissionId, RoleId, TenantId, UserId};

use crate::assignment::{NewAssignment, UserRole};
use crate::permissions::{NewPermission, Permission};
use crate::roles::{NewRole, Role};
use crate::tenant::{NewTenant, Tenant};
use crate::user::{NewUserRecord, User, UserChanges};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A uniqueness rule was violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A referenced row does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation failed: {0}")]
    Validation(String),

    /// Backend could not be reached or failed mid-operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<DomainError> for StoreError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg)
            | DomainError::InvalidId(msg)
            | DomainError::InvariantViolation(msg) => Self::Validation(msg),
            DomainError::NotFound(msg) => Self::NotFound(msg),
            DomainError::Conflict(msg) => Self::Conflict(msg),
            DomainError::Unavailable(msg) => Self::Unavailable(msg),
        }
    }
}

/// Durable storage for every auth record.
///
/// Contract shared by all implementations:
/// - user emails are stored lower-cased and looked up case-insensitively;
/// - at most one *active* assignment exists per (user, role, tenant), where
///   `None` is its own tenant slot;
/// - assignments are never deleted, only deactivated;
/// - role/permission links are idempotent (granting twice is not an error).
#[async_trait]
pub trait CredentialStore: Send + Sync {
    // tenants
    async fn create_tenant(&self, input: NewTenant) -> Result<Tenant, StoreError>;
    async fn get_tenant(&self, id: TenantId) -> Result<Option<Tenant>, StoreError>;
    async fn find_tenant_by_name(&self, name: &str) -> Result<Option<Tenant>, StoreError>;

    // users
    async fn insert_user(&self, input: NewUserRecord) -> Result<User, StoreError>;
    async fn get_user(&self, id: UserId) -> Result<Option<User>, StoreError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn update_password_hash(
        &self,
        id: UserId,
        password_hash: String,
    ) -> Result<User, StoreError>;
    async fn record_login(&self, id: UserId, at: DateTime<Utc>) -> Result<User, StoreError>;
    async fn set_user_active(&self, id: UserId, active: bool) -> Result<User, StoreError>;
    /// Applies the `Some` fields. Email stays unique (`Conflict`); an unknown
    /// home tenant is `NotFound`.
    async fn update_user(&self, id: UserId, changes: UserChanges) -> Result<User, StoreError>;
    /// Users whose home tenant is `home_tenant`, or every user for `None`,
    /// oldest first.
    async fn list_users(&self, home_tenant: Option<TenantId>) -> Result<Vec<User>, StoreError>;
    /// Removes the user row. Assignment history is kept. Returns whether a
    /// row existed.
    async fn delete_user(&self, id: UserId) -> Result<bool, StoreError>;

    // roles
    async fn create_role(&self, input: NewRole) -> Result<Role, StoreError>;
    async fn find_role_by_name(&self, name: &str) -> Result<Option<Role>, StoreError>;
    async fn roles_by_ids(&self, ids: &[RoleId]) -> Result<Vec<Role>, StoreError>;
    async fn list_roles(&self) -> Result<Vec<Role>, StoreError>;

    // permissions
    async fn create_permission(&self, input: NewPermission) -> Result<Permission, StoreError>;
    async fn find_permission(
        &self,
        resource: &str,
        action: &str,
    ) -> Result<Option<Permission>, StoreError>;
    async fn list_permissions(&self) -> Result<Vec<Permission>, StoreError>;

    // role -> permission links
    /// Returns `true` when a new link was created.
    async fn grant_permission(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> Result<bool, StoreError>;
    /// Returns `true` when a link was removed.
    async fn revoke_permission(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> Result<bool, StoreError>;
    /// Distinct permissions linked to any of the given roles.
    async fn permissions_for_roles(
        &self,
        role_ids: &[RoleId],
    ) -> Result<Vec<Permission>, StoreError>;

    // assignments
    /// Fails with `Conflict` when an active row for the same
    /// (user, role, tenant) already exists.
    async fn insert_assignment(&self, input: NewAssignment) -> Result<UserRole, StoreError>;
    /// Every assignment row for the user, active or not, oldest first.
    async fn assignments_for_user(&self, user_id: UserId) -> Result<Vec<UserRole>, StoreError>;
    /// Deactivates matching active rows and returns them. Matching nothing is
    /// not an error.
    async fn deactivate_assignments(
        &self,
        user_id: UserId,
        role_id: RoleId,
        tenant_id: Option<TenantId>,
    ) -> Result<Vec<UserRole>, StoreError>;
}
