//! User administration, routed behind `require_tenant_admin`.
//!
//! Tenant confinement is decided by
//! [`UserAdminService`](beacon_auth::UserAdminService).

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

use beacon_auth::AuthContext;
use beacon_core::UserId;

use crate::app::AppState;
use crate::app::dto::{ListUsersQuery, UpdateUserRequest, UserView};
use crate::app::errors::ApiError;

pub async fn list_users(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    query: Result<Query<ListUsersQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(q) = query?;
    let users = state.users.list(&ctx, q.tenant_id).await?;
    let views: Vec<UserView> = users.iter().map(UserView::from).collect();
    Ok(Json(json!({ "users": views })))
}

pub async fn get_user(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    path: Result<Path<UserId>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(id) = path?;
    let user = state.users.get(&ctx, id).await?;
    Ok(Json(UserView::from(&user)))
}

pub async fn update_user(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    path: Result<Path<UserId>, PathRejection>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(id) = path?;
    let Json(req) = payload?;
    let user = state.users.update(&ctx, id, req.into()).await?;
    Ok(Json(json!({
        "message": "User updated successfully",
        "user": UserView::from(&user),
    })))
}

pub async fn deactivate_user(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    path: Result<Path<UserId>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(id) = path?;
    let user = state.users.set_active(&ctx, id, false).await?;
    Ok(Json(json!({
        "message": "User deactivated successfully",
        "user": UserView::from(&user),
    })))
}

pub async fn activate_user(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    path: Result<Path<UserId>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(id) = path?;
    let user = state.users.set_active(&ctx, id, true).await?;
    Ok(Json(json!({
        "message": "User activated successfully",
        "user": UserView::from(&user),
    })))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    path: Result<Path<UserId>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = path?;
    state.users.delete(&ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
