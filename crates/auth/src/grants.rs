//! Assigning and revoking roles on behalf of an authenticated actor.

use std::sync::Arc;

use tracing::{info, instrument};

use beacon_core::{TenantId, UserId};

use crate::assignment::{NewAssignment, UserRole};
use crate::authorize::AuthContext;
use crate::error::AuthError;
use crate::roles::{Role, RoleName};
use crate::store::{CredentialStore, StoreError};

pub const ROLE_ALREADY_ASSIGNED: &str = "Role already assigned";

#[derive(Clone)]
pub struct RoleGrantService {
    store: Arc<dyn CredentialStore>,
}

impl RoleGrantService {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    /// Assign `role` to `user_id`, scoped to `tenant` (or globally when `None`).
    #[instrument(skip(self, actor), fields(actor = %actor.user_id(), role = %role))]
    pub async fn grant(
        &self,
        actor: &AuthContext,
        user_id: UserId,
        role: &RoleName,
        tenant: Option<TenantId>,
    ) -> Result<UserRole, AuthError> {
        ensure_may_manage(actor, role, tenant)?;
        let role = self.role(role).await?;
        self.ensure_user(user_id).await?;
        if let Some(tenant_id) = tenant {
            if self.store.get_tenant(tenant_id).await?.is_none() {
                return Err(AuthError::not_found("Tenant not found"));
            }
        }

        let row = self
            .store
            .insert_assignment(NewAssignment {
                user_id,
                role_id: role.id,
                tenant_id: tenant,
                assigned_by: actor.user_id(),
            })
            .await
            .map_err(|e| match e {
                StoreError::Conflict(_) => AuthError::conflict(ROLE_ALREADY_ASSIGNED),
                other => other.into(),
            })?;

        info!(assignment_id = %row.id, user_id = %user_id, "role granted");
        Ok(row)
    }

    /// Deactivate the matching active assignment. Returns the rows that were
    /// deactivated; revoking something not held is a no-op.
    #[instrument(skip(self, actor), fields(actor = %actor.user_id(), role = %role))]
    pub async fn revoke(
        &self,
        actor: &AuthContext,
        user_id: UserId,
        role: &RoleName,
        tenant: Option<TenantId>,
    ) -> Result<Vec<UserRole>, AuthError> {
        ensure_may_manage(actor, role, tenant)?;
        let role = self.role(role).await?;
        let rows = self
            .store
            .deactivate_assignments(user_id, role.id, tenant)
            .await?;
        info!(user_id = %user_id, revoked = rows.len(), "role revoked");
        Ok(rows)
    }

    /// Every assignment row for the user, including inactive ones.
    pub async fn history(&self, user_id: UserId) -> Result<Vec<UserRole>, AuthError> {
        Ok(self.store.assignments_for_user(user_id).await?)
    }

    async fn role(&self, name: &RoleName) -> Result<Role, AuthError> {
        self.store
            .find_role_by_name(name.as_str())
            .await?
            .ok_or_else(|| AuthError::not_found(format!("Role '{name}' not found")))
    }

    async fn ensure_user(&self, user_id: UserId) -> Result<(), AuthError> {
        match self.store.get_user(user_id).await? {
            Some(_) => Ok(()),
            None => Err(AuthError::not_found("User not found")),
        }
    }
}

/// Super admins may manage any role anywhere. Tenant admins may manage
/// tenant-scoped assignments in their own context tenant, except
/// `super_admin`.
fn ensure_may_manage(
    actor: &AuthContext,
    role: &RoleName,
    tenant: Option<TenantId>,
) -> Result<(), AuthError> {
    if actor.is_super_admin() {
        return Ok(());
    }
    if !actor.is_tenant_admin() {
        return Err(AuthError::forbidden("Tenant admin access required"));
    }
    if *role == RoleName::SUPER_ADMIN {
        return Err(AuthError::forbidden("Only a super admin can manage super_admin"));
    }
    match (tenant, actor.tenant_id()) {
        (Some(target), Some(own)) if target == own => Ok(()),
        _ => Err(AuthError::forbidden(
            "Tenant admins can only manage roles within their own tenant",
        )),
    }
}
