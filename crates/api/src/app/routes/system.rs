use axum::{
    Extension, Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use tracing::info;

use beacon_auth::{AuthContext, AuthError, NewTenant, StoreError, authorize};
use beacon_core::TenantId;

use crate::app::AppState;
use crate::app::dto::CreateTenantRequest;
use crate::app::errors::ApiError;
use crate::context::MaybeAuth;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(Extension(auth): Extension<MaybeAuth>) -> impl IntoResponse {
    match auth.context() {
        Some(ctx) => Json(json!({
            "authenticated": true,
            "user_id": ctx.user_id(),
            "tenant_id": ctx.tenant_id(),
            "roles": ctx.roles(),
            "permissions": ctx.access().permissions.to_strings(),
        })),
        None => Json(json!({ "authenticated": false })),
    }
}

pub async fn create_tenant(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    payload: Result<Json<CreateTenantRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let mut input = NewTenant::new(req.name.trim());
    if let Some(description) = req.description {
        input = input.with_description(description);
    }
    input.validate().map_err(AuthError::from)?;

    let tenant = state.store.create_tenant(input).await.map_err(|e| match e {
        StoreError::Conflict(_) => AuthError::conflict("Tenant already exists"),
        other => other.into(),
    })?;

    info!(tenant_id = %tenant.id, actor = %ctx.user_id(), "tenant created");
    Ok((StatusCode::CREATED, Json(tenant)))
}

/// Routed behind a tenant role gate; the path tenant must still be one the
/// caller belongs to or administers.
pub async fn get_tenant(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    path: Result<Path<TenantId>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(tenant_id) = path?;
    authorize::require_tenant_access(Some(&ctx), tenant_id)?;
    let tenant = state
        .store
        .get_tenant(tenant_id)
        .await?
        .ok_or_else(|| AuthError::not_found("Tenant not found"))?;
    Ok(Json(tenant))
}

/// Every role with its permission keys, plus the full permission list.
pub async fn catalog(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let mut roles = Vec::new();
    for role in state.store.list_roles().await? {
        let mut keys: Vec<String> = state
            .store
            .permissions_for_roles(&[role.id])
            .await?
            .iter()
            .map(|p| p.key().to_string())
            .collect();
        keys.sort();
        roles.push(json!({
            "id": role.id,
            "name": role.name,
            "description": role.description,
            "permissions": keys,
        }));
    }
    let permissions = state.store.list_permissions().await?;

    Ok(Json(json!({ "roles": roles, "permissions": permissions })))
}
