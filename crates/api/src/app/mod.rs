//! HTTP application wiring (Axum router + service wiring).
//!
//! - `routes/`: handlers, one file per area
//! - `dto.rs`: request/response DTOs
//! - `errors.rs`: JSON error responses

use std::sync::Arc;

use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post},
};
use tower::ServiceBuilder;

use beacon_auth::{
    AccountService, AuthConfig, Authenticator, CredentialStore, PermissionKey, RoleGrantService,
    RoleName, TokenError, TokenService, UserAdminService,
};

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;

/// Shared handler state. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CredentialStore>,
    pub accounts: Arc<AccountService>,
    pub authenticator: Arc<Authenticator>,
    pub grants: Arc<RoleGrantService>,
    pub users: Arc<UserAdminService>,
}

impl AppState {
    pub fn new(store: Arc<dyn CredentialStore>, config: AuthConfig) -> Result<Self, TokenError> {
        let tokens = Arc::new(TokenService::new(&config)?);
        Ok(Self {
            accounts: Arc::new(AccountService::new(store.clone(), tokens.clone(), config)),
            authenticator: Arc::new(Authenticator::new(tokens, store.clone())),
            grants: Arc::new(RoleGrantService::new(store.clone())),
            users: Arc::new(UserAdminService::new(store.clone())),
            store,
        })
    }
}

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(state: AppState) -> Router {
    let public = Router::new()
        .route("/health", get(routes::system::health))
        .route("/auth/register", post(routes::auth::register))
        .route("/auth/login", post(routes::auth::login));

    let optional = Router::new()
        .route("/whoami", get(routes::system::whoami))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware::optional_authenticate,
        ));

    let tenant_admin = Router::new()
        .route("/admin/users", get(routes::users::list_users))
        .route(
            "/admin/users/:id",
            get(routes::users::get_user)
                .patch(routes::users::update_user)
                .delete(routes::users::delete_user),
        )
        .route(
            "/admin/users/:id/deactivate",
            post(routes::users::deactivate_user),
        )
        .route("/admin/users/:id/activate", post(routes::users::activate_user))
        .route(
            "/admin/users/:id/roles",
            get(routes::admin::list_user_roles).post(routes::admin::grant_role),
        )
        .route(
            "/admin/users/:id/roles/:role",
            delete(routes::admin::revoke_role),
        )
        .route_layer(from_fn(middleware::require_tenant_admin));

    let tenant_member = Router::new()
        .route("/tenants/:id", get(routes::system::get_tenant))
        .route_layer(from_fn_with_state(
            Arc::<[RoleName]>::from([RoleName::TENANT_ADMIN, RoleName::TENANT_USER]),
            middleware::require_any_role,
        ));

    let system_admin = Router::new()
        .route("/admin/tenants", post(routes::system::create_tenant))
        .route("/admin/catalog", get(routes::system::catalog))
        .route_layer(from_fn(middleware::require_system_admin));

    let metrics = Router::new()
        .route("/metrics/overview", get(routes::metrics::overview))
        .route_layer(from_fn_with_state(
            PermissionKey::new("metric", "read"),
            middleware::require_permission,
        ));

    // Role gates are added first so `authenticate` wraps them.
    let protected = Router::new()
        .route("/auth/profile", get(routes::auth::profile))
        .route("/auth/change-password", post(routes::auth::change_password))
        .route("/auth/logout", post(routes::auth::logout))
        .merge(tenant_admin)
        .merge(tenant_member)
        .merge(system_admin)
        .merge(metrics)
        .route_layer(from_fn_with_state(state.clone(), middleware::authenticate));

    Router::new()
        .merge(public)
        .merge(optional)
        .merge(protected)
        .layer(ServiceBuilder::new().layer(from_fn(middleware::trace_requests)))
        .with_state(state)
}
