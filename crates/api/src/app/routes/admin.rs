//! Role administration.
//!
//! Routed behind `require_tenant_admin`; the finer rules (own tenant only,
//! `super_admin` reserved for super admins) are enforced by
//! [`RoleGrantService`](beacon_auth::RoleGrantService).

use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use beacon_auth::{AuthContext, AuthError, RoleName, UserRole};
use beacon_core::{RoleId, TenantId, UserId};

use crate::app::AppState;
use crate::app::dto::{AssignmentView, GrantRoleRequest, RevokeRoleQuery};
use crate::app::errors::ApiError;

/// Assignment history. Tenant admins only see rows in their own tenant.
pub async fn list_user_roles(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    path: Result<Path<UserId>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(user_id) = path?;
    if state.store.get_user(user_id).await?.is_none() {
        return Err(AuthError::not_found("User not found").into());
    }

    let rows: Vec<UserRole> = state
        .grants
        .history(user_id)
        .await?
        .into_iter()
        .filter(|row| ctx.is_super_admin() || row.tenant_id == ctx.tenant_id())
        .collect();
    let views = with_role_names(&state, &rows).await?;

    Ok(Json(json!({ "user_id": user_id, "assignments": views })))
}

pub async fn grant_role(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    path: Result<Path<UserId>, PathRejection>,
    payload: Result<Json<GrantRoleRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(user_id) = path?;
    let Json(req) = payload?;
    let role = role_name(req.role)?;
    let tenant = scope(&ctx, req.tenant_id, req.global);

    let row = state.grants.grant(&ctx, user_id, &role, tenant).await?;
    let view = AssignmentView::new(&row, Some(role.to_string()));

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Role assigned successfully", "assignment": view })),
    ))
}

pub async fn revoke_role(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    path: Result<Path<(UserId, String)>, PathRejection>,
    query: Result<Query<RevokeRoleQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path((user_id, role)) = path?;
    let Query(q) = query?;
    let role = role_name(role)?;
    let tenant = scope(&ctx, q.tenant_id, q.global);

    let rows = state.grants.revoke(&ctx, user_id, &role, tenant).await?;

    Ok(Json(json!({
        "message": "Role revoked successfully",
        "revoked": rows.len(),
    })))
}

/// `global` wins; otherwise the explicit tenant, else the caller's context.
fn scope(ctx: &AuthContext, tenant_id: Option<TenantId>, global: bool) -> Option<TenantId> {
    if global {
        None
    } else {
        tenant_id.or(ctx.tenant_id())
    }
}

fn role_name(raw: String) -> Result<RoleName, ApiError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AuthError::validation("Role is required").into());
    }
    Ok(RoleName::new(trimmed.to_string()))
}

async fn with_role_names(
    state: &AppState,
    rows: &[UserRole],
) -> Result<Vec<AssignmentView>, ApiError> {
    let mut ids: Vec<RoleId> = rows.iter().map(|r| r.role_id).collect();
    ids.sort();
    ids.dedup();
    let names: HashMap<RoleId, String> = state
        .store
        .roles_by_ids(&ids)
        .await?
        .into_iter()
        .map(|role| (role.id, role.name.to_string()))
        .collect();

    Ok(rows
        .iter()
        .map(|row| AssignmentView::new(row, names.get(&row.role_id).cloned()))
        .collect())
}
