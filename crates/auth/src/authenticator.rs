//! Bearer-token authentication.
//!
//! Turns an `Authorization` header value into an [`AuthContext`], with the
//! exact failure messages clients rely on.

use std::sync::Arc;

use tracing::{debug, error, warn};

use beacon_core::TenantId;

use crate::authorize::AuthContext;
use crate::error::AuthError;
use crate::resolver::RoleResolver;
use crate::store::CredentialStore;
use crate::token::{TokenError, TokenService};

pub const ACCESS_TOKEN_REQUIRED: &str = "Access token required";
pub const USER_NOT_FOUND: &str = "User not found";
pub const ACCOUNT_DEACTIVATED: &str = "Account is deactivated";
pub const TOKEN_EXPIRED: &str = "Token expired";
pub const INVALID_TOKEN: &str = "Invalid token";
pub const AUTHENTICATION_FAILED: &str = "Authentication failed";

/// Extract the token from a `Bearer <token>` header value.
pub fn bearer_token(header: Option<&str>) -> Option<&str> {
    let token = header?.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        return None;
    }
    Some(token)
}

#[derive(Clone)]
pub struct Authenticator {
    tokens: Arc<TokenService>,
    store: Arc<dyn CredentialStore>,
    resolver: RoleResolver,
}

impl Authenticator {
    pub fn new(tokens: Arc<TokenService>, store: Arc<dyn CredentialStore>) -> Self {
        let resolver = RoleResolver::new(store.clone());
        Self {
            tokens,
            store,
            resolver,
        }
    }

    pub fn resolver(&self) -> &RoleResolver {
        &self.resolver
    }

    /// Mandatory authentication.
    ///
    /// The tenant context is `tenant` when given, else the user's home tenant.
    /// Roles come from the store, never from the token.
    pub async fn authenticate(
        &self,
        authorization: Option<&str>,
        tenant: Option<TenantId>,
    ) -> Result<AuthContext, AuthError> {
        let token = bearer_token(authorization)
            .ok_or_else(|| AuthError::unauthorized(ACCESS_TOKEN_REQUIRED))?;

        let claims = self.tokens.verify(token).map_err(|e| match e {
            TokenError::Expired => AuthError::unauthorized(TOKEN_EXPIRED),
            TokenError::Invalid(reason) => {
                debug!(%reason, "rejected bearer token");
                AuthError::unauthorized(INVALID_TOKEN)
            }
            TokenError::Signing(reason) => {
                error!(%reason, "token verification failed");
                AuthError::internal(AUTHENTICATION_FAILED)
            }
        })?;

        let user = match self.store.get_user(claims.user_id).await {
            Ok(Some(user)) => user,
            Ok(None) => return Err(AuthError::unauthorized(USER_NOT_FOUND)),
            Err(e) => {
                error!(error = %e, user_id = %claims.user_id, "user lookup failed during authentication");
                return Err(AuthError::internal(AUTHENTICATION_FAILED));
            }
        };
        if !user.is_active {
            warn!(user_id = %user.id, "token presented for deactivated account");
            return Err(AuthError::unauthorized(ACCOUNT_DEACTIVATED));
        }

        let tenant = tenant.or(user.home_tenant_id);
        let access = self.resolver.resolve(&user, tenant).await.map_err(|e| {
            error!(error = %e, user_id = %user.id, "role resolution failed during authentication");
            AuthError::internal(AUTHENTICATION_FAILED)
        })?;

        Ok(AuthContext::new(user, access))
    }

    /// Whether the context's user holds `role` in `tenant`, which may differ
    /// from the tenant the context was resolved for.
    pub async fn has_role_in(
        &self,
        ctx: &AuthContext,
        role: &str,
        tenant: Option<TenantId>,
    ) -> Result<bool, AuthError> {
        if tenant == ctx.tenant_id() {
            return Ok(ctx.has_role(role));
        }
        Ok(self.resolver.has_role(ctx.user(), role, tenant).await?)
    }

    pub async fn has_permission_in(
        &self,
        ctx: &AuthContext,
        resource: &str,
        action: &str,
        tenant: Option<TenantId>,
    ) -> Result<bool, AuthError> {
        if tenant == ctx.tenant_id() {
            return Ok(ctx.has_permission(resource, action));
        }
        Ok(self
            .resolver
            .has_permission(ctx.user(), resource, action, tenant)
            .await?)
    }

    /// Optional authentication: any failure degrades to anonymous.
    pub async fn authenticate_optional(
        &self,
        authorization: Option<&str>,
        tenant: Option<TenantId>,
    ) -> Option<AuthContext> {
        authorization?;
        match self.authenticate(authorization, tenant).await {
            Ok(ctx) => Some(ctx),
            Err(e) => {
                debug!(error = %e, "optional authentication fell back to anonymous");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_token_requires_scheme_and_value() {
        assert_eq!(bearer_token(Some("Bearer abc.def")), Some("abc.def"));
        assert_eq!(bearer_token(Some("Bearer   abc  ")), Some("abc"));
        assert_eq!(bearer_token(Some("Bearer ")), None);
        assert_eq!(bearer_token(Some("Basic abc")), None);
        assert_eq!(bearer_token(Some("abc")), None);
        assert_eq!(bearer_token(None), None);
    }
}
