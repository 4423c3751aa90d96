//! Default role/permission catalog.

use tracing::info;

use crate::permissions::{NewPermission, Permission};
use crate::roles::{NewRole, Role};
use crate::store::{CredentialStore, StoreError};

/// `(resource, action, description)` for every seeded permission.
pub const DEFAULT_PERMISSIONS: &[(&str, &str, &str)] = &[
    ("tenant", "create", "Create tenants"),
    ("tenant", "read", "View tenant information"),
    ("tenant", "update", "Update tenant information"),
    ("tenant", "delete", "Delete tenants"),
    ("user", "create", "Create users"),
    ("user", "read", "View users"),
    ("user", "update", "Update users"),
    ("user", "delete", "Delete users"),
    ("metric", "create", "Create metrics"),
    ("metric", "read", "View metrics"),
    ("metric", "update", "Update metrics"),
    ("metric", "delete", "Delete metrics"),
    ("role", "assign", "Assign roles to users"),
    ("role", "read", "View roles"),
    ("role", "manage", "Manage roles and permissions"),
    ("system", "admin", "System administration"),
];

#[derive(Debug, Clone, Copy)]
pub struct RoleSeed {
    pub name: &'static str,
    pub description: &'static str,
    /// `None` grants every seeded permission.
    pub permissions: Option<&'static [&'static str]>,
}

pub const DEFAULT_ROLES: &[RoleSeed] = &[
    RoleSeed {
        name: "super_admin",
        description: "Full system access across all tenants",
        permissions: None,
    },
    RoleSeed {
        name: "tenant_admin",
        description: "Administrative access within a tenant",
        permissions: Some(&[
            "tenant:read",
            "tenant:update",
            "user:create",
            "user:read",
            "user:update",
            "user:delete",
            "metric:create",
            "metric:read",
            "metric:update",
            "metric:delete",
            "role:assign",
            "role:read",
        ]),
    },
    RoleSeed {
        name: "tenant_user",
        description: "Standard user access within a tenant",
        permissions: Some(&["tenant:read", "user:read", "metric:read"]),
    },
];

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub permissions_created: usize,
    pub roles_created: usize,
    pub grants_created: usize,
}

impl SeedReport {
    pub fn is_noop(&self) -> bool {
        *self == Self::default()
    }
}

/// Create whatever part of the default catalog is missing. Safe to run on
/// every start-up.
pub async fn seed_default_catalog(store: &dyn CredentialStore) -> Result<SeedReport, StoreError> {
    let mut report = SeedReport::default();

    let mut permissions = Vec::with_capacity(DEFAULT_PERMISSIONS.len());
    for (resource, action, description) in DEFAULT_PERMISSIONS {
        let (permission, created) = ensure_permission(store, resource, action, description).await?;
        report.permissions_created += usize::from(created);
        permissions.push(permission);
    }

    for seed in DEFAULT_ROLES {
        let (role, created) = ensure_role(store, seed).await?;
        report.roles_created += usize::from(created);

        for permission in &permissions {
            let key = permission.key().to_string();
            let included = seed
                .permissions
                .is_none_or(|wanted| wanted.iter().any(|w| *w == key));
            if included && store.grant_permission(role.id, permission.id).await? {
                report.grants_created += 1;
            }
        }
    }

    if !report.is_noop() {
        info!(
            permissions = report.permissions_created,
            roles = report.roles_created,
            grants = report.grants_created,
            "seeded default catalog"
        );
    }
    Ok(report)
}

async fn ensure_permission(
    store: &dyn CredentialStore,
    resource: &str,
    action: &str,
    description: &str,
) -> Result<(Permission, bool), StoreError> {
    if let Some(existing) = store.find_permission(resource, action).await? {
        return Ok((existing, false));
    }
    let input = NewPermission::new(resource, action, Some(description.to_string()));
    match store.create_permission(input).await {
        Ok(created) => Ok((created, true)),
        Err(StoreError::Conflict(_)) => store
            .find_permission(resource, action)
            .await?
            .map(|p| (p, false))
            .ok_or_else(|| StoreError::NotFound(format!("permission {resource}:{action}"))),
        Err(e) => Err(e),
    }
}

async fn ensure_role(store: &dyn CredentialStore, seed: &RoleSeed) -> Result<(Role, bool), StoreError> {
    if let Some(existing) = store.find_role_by_name(seed.name).await? {
        return Ok((existing, false));
    }
    let input = NewRole::new(seed.name, Some(seed.description.to_string()));
    match store.create_role(input).await {
        Ok(created) => Ok((created, true)),
        Err(StoreError::Conflict(_)) => store
            .find_role_by_name(seed.name)
            .await?
            .map(|r| (r, false))
            .ok_or_else(|| StoreError::NotFound(format!("role {}", seed.name))),
        Err(e) => Err(e),
    }
}
