//! Tenant-confined user administration.
//!
//! Super admins reach every account. Tenant admins reach accounts whose home
//! tenant is their current tenant context, never system admin accounts, and
//! may not move a user to another tenant.

use std::sync::Arc;

use tracing::{info, instrument};

use beacon_core::{TenantId, UserId};

use crate::authorize::AuthContext;
use crate::error::AuthError;
use crate::service::EMAIL_TAKEN;
use crate::store::{CredentialStore, StoreError};
use crate::user::{User, UserChanges};

pub const ACCESS_DENIED: &str = "Access denied";
pub const CANNOT_CHANGE_TENANT: &str = "Cannot change user tenant";
pub const CANNOT_DELETE_SELF: &str = "Cannot delete yourself";
pub const CANNOT_DEACTIVATE_SELF: &str = "Cannot deactivate yourself";

#[derive(Clone)]
pub struct UserAdminService {
    store: Arc<dyn CredentialStore>,
}

impl UserAdminService {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    /// Users homed in `tenant`. Tenant admins always get their own tenant,
    /// whatever they ask for.
    pub async fn list(
        &self,
        actor: &AuthContext,
        tenant: Option<TenantId>,
    ) -> Result<Vec<User>, AuthError> {
        if actor.is_super_admin() {
            return Ok(self.store.list_users(tenant).await?);
        }
        let own = own_tenant(actor)?;
        Ok(self.store.list_users(Some(own)).await?)
    }

    pub async fn get(&self, actor: &AuthContext, id: UserId) -> Result<User, AuthError> {
        let user = self.load(id).await?;
        ensure_may_reach(actor, &user)?;
        Ok(user)
    }

    #[instrument(skip(self, actor, changes), fields(actor = %actor.user_id(), user_id = %id))]
    pub async fn update(
        &self,
        actor: &AuthContext,
        id: UserId,
        changes: UserChanges,
    ) -> Result<User, AuthError> {
        let user = self.load(id).await?;
        ensure_may_reach(actor, &user)?;
        if changes.home_tenant_id.is_some() && !actor.is_super_admin() {
            return Err(AuthError::forbidden(CANNOT_CHANGE_TENANT));
        }
        if changes.is_empty() {
            return Err(AuthError::validation("No changes supplied"));
        }
        let changes = changes.normalized()?;
        let moving = changes.home_tenant_id.is_some();

        let updated = self
            .store
            .update_user(user.id, changes)
            .await
            .map_err(|e| match e {
                StoreError::Conflict(_) => AuthError::conflict(EMAIL_TAKEN),
                StoreError::NotFound(_) if moving => AuthError::not_found("Tenant not found"),
                StoreError::NotFound(_) => AuthError::not_found("User not found"),
                other => other.into(),
            })?;
        info!("user updated");
        Ok(updated)
    }

    #[instrument(skip(self, actor), fields(actor = %actor.user_id()))]
    pub async fn set_active(
        &self,
        actor: &AuthContext,
        id: UserId,
        active: bool,
    ) -> Result<User, AuthError> {
        let user = self.load(id).await?;
        ensure_may_reach(actor, &user)?;
        if !active && user.id == actor.user_id() {
            return Err(AuthError::validation(CANNOT_DEACTIVATE_SELF));
        }
        let updated = self.store.set_user_active(user.id, active).await?;
        info!(user_id = %id, active, "user activation changed");
        Ok(updated)
    }

    /// Hard delete of the account. Role assignment history is kept.
    #[instrument(skip(self, actor), fields(actor = %actor.user_id()))]
    pub async fn delete(&self, actor: &AuthContext, id: UserId) -> Result<(), AuthError> {
        let user = self.load(id).await?;
        ensure_may_reach(actor, &user)?;
        if user.id == actor.user_id() {
            return Err(AuthError::validation(CANNOT_DELETE_SELF));
        }
        if !self.store.delete_user(user.id).await? {
            return Err(AuthError::not_found("User not found"));
        }
        info!(user_id = %id, "user deleted");
        Ok(())
    }

    async fn load(&self, id: UserId) -> Result<User, AuthError> {
        self.store
            .get_user(id)
            .await?
            .ok_or_else(|| AuthError::not_found("User not found"))
    }
}

fn own_tenant(actor: &AuthContext) -> Result<TenantId, AuthError> {
    if !actor.is_tenant_admin() {
        return Err(AuthError::forbidden("Tenant admin access required"));
    }
    actor
        .tenant_id()
        .ok_or_else(|| AuthError::forbidden(ACCESS_DENIED))
}

fn ensure_may_reach(actor: &AuthContext, target: &User) -> Result<(), AuthError> {
    if actor.is_super_admin() {
        return Ok(());
    }
    let own = own_tenant(actor)?;
    if target.is_system_admin || target.home_tenant_id != Some(own) {
        return Err(AuthError::forbidden(ACCESS_DENIED));
    }
    Ok(())
}
