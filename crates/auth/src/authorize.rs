//! Request gates over an authenticated context.

use std::collections::BTreeSet;

use thiserror::Error;

use beacon_core::{TenantId, UserId};

use crate::error::AuthError;
use crate::permissions::PermissionKey;
use crate::resolver::EffectiveAccess;
use crate::roles::RoleName;
use crate::user::User;

/// Authenticated identity for one request: the user plus what they may do in
/// the request's tenant context. Built once and never mutated.
#[derive(Debug, Clone)]
pub struct AuthContext {
    user: User,
    access: EffectiveAccess,
}

impl AuthContext {
    pub fn new(user: User, access: EffectiveAccess) -> Self {
        Self { user, access }
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn user_id(&self) -> UserId {
        self.user.id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.access.tenant_id
    }

    pub fn roles(&self) -> &BTreeSet<RoleName> {
        &self.access.roles
    }

    pub fn access(&self) -> &EffectiveAccess {
        &self.access
    }

    pub fn has_role(&self, name: &str) -> bool {
        self.access.has_role(name)
    }

    pub fn has_permission(&self, resource: &str, action: &str) -> bool {
        self.access.has_permission(resource, action)
    }

    pub fn is_super_admin(&self) -> bool {
        self.access.roles.contains(&RoleName::SUPER_ADMIN)
    }

    /// Super admins pass every tenant-admin check.
    pub fn is_tenant_admin(&self) -> bool {
        self.is_super_admin() || self.access.roles.contains(&RoleName::TENANT_ADMIN)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("Authentication required")]
    Unauthenticated,

    #[error("Admin access required")]
    AdminRequired,

    #[error("Tenant admin access required")]
    TenantAdminRequired,

    #[error("Insufficient permissions")]
    MissingPermission(PermissionKey),

    #[error("Insufficient role")]
    MissingRole(Vec<RoleName>),

    #[error("Access denied: tenant access not allowed")]
    TenantAccessDenied(TenantId),
}

impl From<AuthzError> for AuthError {
    fn from(value: AuthzError) -> Self {
        match value {
            AuthzError::Unauthenticated => AuthError::unauthorized(value.to_string()),
            other => AuthError::forbidden(other.to_string()),
        }
    }
}

pub fn require_system_admin(ctx: Option<&AuthContext>) -> Result<&AuthContext, AuthzError> {
    let ctx = ctx.ok_or(AuthzError::Unauthenticated)?;
    if !ctx.is_super_admin() {
        return Err(AuthzError::AdminRequired);
    }
    Ok(ctx)
}

pub fn require_tenant_admin(ctx: Option<&AuthContext>) -> Result<&AuthContext, AuthzError> {
    let ctx = ctx.ok_or(AuthzError::Unauthenticated)?;
    if !ctx.is_tenant_admin() {
        return Err(AuthzError::TenantAdminRequired);
    }
    Ok(ctx)
}

pub fn require_permission<'a>(
    ctx: Option<&'a AuthContext>,
    key: &PermissionKey,
) -> Result<&'a AuthContext, AuthzError> {
    let ctx = ctx.ok_or(AuthzError::Unauthenticated)?;
    if !ctx.has_permission(key.resource(), key.action()) {
        return Err(AuthzError::MissingPermission(key.clone()));
    }
    Ok(ctx)
}

/// Passes when the context holds at least one of `roles`. Super admins always
/// pass.
pub fn require_any_role<'a>(
    ctx: Option<&'a AuthContext>,
    roles: &[RoleName],
) -> Result<&'a AuthContext, AuthzError> {
    let ctx = ctx.ok_or(AuthzError::Unauthenticated)?;
    if !ctx.is_super_admin() && !roles.iter().any(|r| ctx.roles().contains(r)) {
        return Err(AuthzError::MissingRole(roles.to_vec()));
    }
    Ok(ctx)
}

/// Access to `tenant` as a resource: super admins, members homed there, and
/// tenant admins acting in that tenant.
pub fn require_tenant_access(
    ctx: Option<&AuthContext>,
    tenant: TenantId,
) -> Result<&AuthContext, AuthzError> {
    let ctx = ctx.ok_or(AuthzError::Unauthenticated)?;
    let member = ctx.user().home_tenant_id == Some(tenant);
    let admin_here = ctx.is_tenant_admin() && ctx.tenant_id() == Some(tenant);
    if !(ctx.is_super_admin() || member || admin_here) {
        return Err(AuthzError::TenantAccessDenied(tenant));
    }
    Ok(ctx)
}

/// Human-readable reason for a gate decision.
pub fn explain(result: &Result<&AuthContext, AuthzError>) -> String {
    match result {
        Ok(ctx) => format!("allowed: user {} in tenant {:?}", ctx.user_id(), ctx.tenant_id()),
        Err(AuthzError::MissingPermission(key)) => format!("denied: missing permission {key}"),
        Err(AuthzError::MissingRole(roles)) => {
            let names: Vec<&str> = roles.iter().map(RoleName::as_str).collect();
            format!("denied: needs one of [{}]", names.join(", "))
        }
        Err(AuthzError::TenantAccessDenied(tenant)) => {
            format!("denied: no access to tenant {tenant}")
        }
        Err(other) => format!("denied: {other}"),
    }
}
