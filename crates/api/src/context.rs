use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;

use beacon_auth::{AuthContext, AuthError};
use beacon_core::TenantId;

/// Header naming the tenant a request operates in.
pub const TENANT_HEADER: &str = "x-tenant-id";

/// Result of optional authentication, inserted into request extensions.
///
/// `None` means the caller is anonymous (no token or an unusable one).
#[derive(Debug, Clone, Default)]
pub struct MaybeAuth(pub Option<AuthContext>);

impl MaybeAuth {
    pub fn context(&self) -> Option<&AuthContext> {
        self.0.as_ref()
    }
}

/// Tenant named by the `X-Tenant-Id` header, if any.
pub fn tenant_hint(headers: &HeaderMap) -> Result<Option<TenantId>, AuthError> {
    let Some(value) = headers.get(TENANT_HEADER) else {
        return Ok(None);
    };
    value
        .to_str()
        .ok()
        .and_then(|raw| raw.parse::<TenantId>().ok())
        .map(Some)
        .ok_or_else(|| AuthError::validation("Invalid X-Tenant-Id header"))
}

/// Raw `Authorization` header value. Non-ASCII values count as absent.
pub fn authorization(headers: &HeaderMap) -> Option<&str> {
    headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok())
}
