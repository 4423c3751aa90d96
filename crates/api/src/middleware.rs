//! Request gates.
//!
//! Apply `authenticate` (or `optional_authenticate`) outermost; the role and
//! permission gates read the [`AuthContext`] it leaves in the request
//! extensions and must run inside it.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::{debug, info};

use beacon_auth::{AuthContext, AuthzError, PermissionKey, RoleName, authorize};

use crate::app::AppState;
use crate::app::errors::ApiError;
use crate::context::{self, MaybeAuth};

/// Mandatory authentication: bearer token → [`AuthContext`] in extensions.
pub async fn authenticate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let tenant = context::tenant_hint(req.headers())?;
    let ctx = state
        .authenticator
        .authenticate(context::authorization(req.headers()), tenant)
        .await?;

    req.extensions_mut().insert(ctx);
    Ok(next.run(req).await)
}

/// Optional authentication: always inserts [`MaybeAuth`], never rejects.
pub async fn optional_authenticate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let tenant = match context::tenant_hint(req.headers()) {
        Ok(tenant) => tenant,
        Err(e) => {
            debug!(error = %e, "ignoring tenant header for optional authentication");
            None
        }
    };
    let ctx = state
        .authenticator
        .authenticate_optional(context::authorization(req.headers()), tenant)
        .await;

    if let Some(ctx) = &ctx {
        req.extensions_mut().insert(ctx.clone());
    }
    req.extensions_mut().insert(MaybeAuth(ctx));
    next.run(req).await
}

pub async fn require_system_admin(req: Request, next: Next) -> Result<Response, ApiError> {
    decide(authorize::require_system_admin(req.extensions().get::<AuthContext>()))?;
    Ok(next.run(req).await)
}

pub async fn require_tenant_admin(req: Request, next: Next) -> Result<Response, ApiError> {
    decide(authorize::require_tenant_admin(req.extensions().get::<AuthContext>()))?;
    Ok(next.run(req).await)
}

/// Permission gate. The required key is the layer state:
/// `from_fn_with_state(PermissionKey::new("metric", "read"), require_permission)`.
pub async fn require_permission(
    State(key): State<PermissionKey>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    decide(authorize::require_permission(req.extensions().get::<AuthContext>(), &key))?;
    Ok(next.run(req).await)
}

/// Role gate: any one of the roles in the layer state is enough.
pub async fn require_any_role(
    State(roles): State<Arc<[RoleName]>>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    decide(authorize::require_any_role(req.extensions().get::<AuthContext>(), &roles))?;
    Ok(next.run(req).await)
}

fn decide(decision: Result<&AuthContext, AuthzError>) -> Result<(), ApiError> {
    debug!(decision = %authorize::explain(&decision), "gate");
    decision.map(|_| ()).map_err(ApiError::from)
}

/// One log line per request.
pub async fn trace_requests(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(req).await;

    info!(
        %method,
        %path,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "request handled"
    );
    response
}
