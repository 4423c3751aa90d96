//! `beacon-auth`: multi-tenant authentication and role-based authorization.
//!
//! Framework-agnostic. Persistence is reached through [`CredentialStore`]
//! (implemented in `beacon-infra`); HTTP concerns live in `beacon-api`.
//!
//! Flow: [`AccountService`] verifies credentials and issues a token through
//! [`TokenService`]; on every request [`Authenticator`] verifies the token,
//! loads the user and asks [`RoleResolver`] for their effective access in the
//! request's tenant, producing an immutable [`AuthContext`] the gates in
//! [`authorize`] decide on.

pub mod assignment;
pub mod authenticator;
pub mod authorize;
pub mod catalog;
pub mod config;
pub mod error;
pub mod grants;
pub mod password;
pub mod permissions;
pub mod resolver;
pub mod roles;
pub mod service;
pub mod store;
pub mod tenant;
pub mod token;
pub mod user;
pub mod user_admin;

pub use assignment::{NewAssignment, RolePermission, UserRole};
pub use authenticator::Authenticator;
pub use authorize::{
    AuthContext, AuthzError, require_any_role, require_permission, require_system_admin,
    require_tenant_access, require_tenant_admin,
};
pub use catalog::{SeedReport, seed_default_catalog};
pub use config::{AuthConfig, PasswordHashConfig};
pub use error::AuthError;
pub use grants::RoleGrantService;
pub use permissions::{NewPermission, Permission, PermissionKey};
pub use resolver::{EffectiveAccess, PermissionSet, RoleResolver};
pub use roles::{NewRole, Role, RoleName};
pub use service::{AccountService, Profile, RegisterInput, Session};
pub use store::{CredentialStore, StoreError};
pub use tenant::{NewTenant, Tenant};
pub use token::{IssuedToken, TokenClaims, TokenError, TokenService};
pub use user::{NewUser, NewUserRecord, User, UserChanges};
pub use user_admin::UserAdminService;
