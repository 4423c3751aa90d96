use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use tracing::info;

use beacon_auth::{AuthContext, RegisterInput};

use crate::app::AppState;
use crate::app::dto::{
    ChangePasswordRequest, LoginRequest, RegisterRequest, SessionResponse, UserView,
};
use crate::app::errors::ApiError;

pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let session = state
        .accounts
        .register(RegisterInput {
            name: req.name,
            email: req.email,
            password: req.password,
            tenant_id: req.tenant_id,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SessionResponse::new("User registered successfully", &session)),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let session = state.accounts.login(&req.email, &req.password).await?;
    Ok(Json(SessionResponse::new("Login successful", &session)))
}

pub async fn profile(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = state
        .accounts
        .profile(ctx.user_id(), ctx.tenant_id())
        .await?;

    Ok(Json(json!({
        "user": UserView::from(&profile.user),
        "tenant_id": profile.tenant_id,
        "roles": profile.roles,
        "permissions": profile.permissions.to_strings(),
    })))
}

pub async fn change_password(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    payload: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    state
        .accounts
        .change_password(ctx.user(), &req.current_password, &req.new_password)
        .await?;

    info!(user_id = %ctx.user_id(), "password changed");
    Ok(Json(json!({ "message": "Password changed successfully" })))
}

/// Tokens are stateless; the client discards its copy.
pub async fn logout(Extension(ctx): Extension<AuthContext>) -> impl IntoResponse {
    info!(user_id = %ctx.user_id(), "logout");
    Json(json!({ "message": "Logout successful" }))
}
