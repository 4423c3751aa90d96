//! Effective role and permission resolution.
//!
//! Nothing is cached: every call reads the store, so a revocation or a
//! permission change is visible on the next request.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::instrument;

use beacon_core::{RoleId, TenantId};

use crate::permissions::PermissionKey;
use crate::roles::RoleName;
use crate::store::{CredentialStore, StoreError};
use crate::user::User;

/// Permissions a user holds in one tenant context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionSet {
    /// System administrators hold every permission, including ones added to
    /// the catalog later.
    All,
    Only(BTreeSet<PermissionKey>),
}

impl PermissionSet {
    pub fn contains(&self, resource: &str, action: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(keys) => keys.iter().any(|key| key.matches(resource, action)),
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }

    /// `["*"]` for [`PermissionSet::All`], otherwise sorted `resource:action` strings.
    pub fn to_strings(&self) -> Vec<String> {
        match self {
            Self::All => vec!["*".to_string()],
            Self::Only(keys) => keys.iter().map(ToString::to_string).collect(),
        }
    }
}

impl Default for PermissionSet {
    fn default() -> Self {
        Self::Only(BTreeSet::new())
    }
}

/// Resolved roles and permissions for a user in a tenant context.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EffectiveAccess {
    pub tenant_id: Option<TenantId>,
    pub roles: BTreeSet<RoleName>,
    pub permissions: PermissionSet,
}

impl EffectiveAccess {
    pub fn system_admin(tenant_id: Option<TenantId>) -> Self {
        Self {
            tenant_id,
            roles: BTreeSet::from([RoleName::SUPER_ADMIN]),
            permissions: PermissionSet::All,
        }
    }

    pub fn has_role(&self, name: &str) -> bool {
        self.roles.iter().any(|role| role.as_str() == name)
    }

    pub fn has_permission(&self, resource: &str, action: &str) -> bool {
        self.permissions.contains(resource, action)
    }
}

#[derive(Clone)]
pub struct RoleResolver {
    store: Arc<dyn CredentialStore>,
}

impl RoleResolver {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    /// Roles and permissions for `user` in `tenant`.
    ///
    /// An assignment contributes when it is active and either global or scoped
    /// to exactly `tenant`. With `tenant == None` only global assignments
    /// count. System admins short-circuit to `super_admin` with every
    /// permission.
    #[instrument(skip(self, user), fields(user_id = %user.id), err)]
    pub async fn resolve(
        &self,
        user: &User,
        tenant: Option<TenantId>,
    ) -> Result<EffectiveAccess, StoreError> {
        if user.is_system_admin {
            return Ok(EffectiveAccess::system_admin(tenant));
        }

        let role_ids = self.applicable_role_ids(user, tenant).await?;
        if role_ids.is_empty() {
            return Ok(EffectiveAccess {
                tenant_id: tenant,
                ..EffectiveAccess::default()
            });
        }

        let roles = self
            .store
            .roles_by_ids(&role_ids)
            .await?
            .into_iter()
            .map(|role| role.name)
            .collect();
        let permissions = self
            .store
            .permissions_for_roles(&role_ids)
            .await?
            .iter()
            .map(|permission| permission.key())
            .collect();

        Ok(EffectiveAccess {
            tenant_id: tenant,
            roles,
            permissions: PermissionSet::Only(permissions),
        })
    }

    pub async fn roles(
        &self,
        user: &User,
        tenant: Option<TenantId>,
    ) -> Result<BTreeSet<RoleName>, StoreError> {
        if user.is_system_admin {
            return Ok(BTreeSet::from([RoleName::SUPER_ADMIN]));
        }
        let role_ids = self.applicable_role_ids(user, tenant).await?;
        if role_ids.is_empty() {
            return Ok(BTreeSet::new());
        }
        Ok(self
            .store
            .roles_by_ids(&role_ids)
            .await?
            .into_iter()
            .map(|role| role.name)
            .collect())
    }

    pub async fn permissions(
        &self,
        user: &User,
        tenant: Option<TenantId>,
    ) -> Result<PermissionSet, StoreError> {
        Ok(self.resolve(user, tenant).await?.permissions)
    }

    pub async fn has_role(
        &self,
        user: &User,
        role: &str,
        tenant: Option<TenantId>,
    ) -> Result<bool, StoreError> {
        Ok(self
            .roles(user, tenant)
            .await?
            .iter()
            .any(|name| name.as_str() == role))
    }

    pub async fn has_permission(
        &self,
        user: &User,
        resource: &str,
        action: &str,
        tenant: Option<TenantId>,
    ) -> Result<bool, StoreError> {
        Ok(self.permissions(user, tenant).await?.contains(resource, action))
    }

    async fn applicable_role_ids(
        &self,
        user: &User,
        tenant: Option<TenantId>,
    ) -> Result<Vec<RoleId>, StoreError> {
        let ids: BTreeSet<RoleId> = self
            .store
            .assignments_for_user(user.id)
            .await?
            .iter()
            .filter(|row| row.applies_to(tenant))
            .map(|row| row.role_id)
            .collect();
        Ok(ids.into_iter().collect())
    }
}
