//! Account lifecycle: creation, login, password changes, profile lookup.

use std::collections::BTreeSet;
use std::sync::{Arc, OnceLock};

use chrono::Utc;
use serde::Serialize;
use tracing::{error, info, instrument, warn};

use beacon_core::TenantId;

use crate::config::{AuthConfig, PasswordHashConfig};
use crate::error::{AuthError, INTERNAL_ERROR};
use crate::password;
use crate::resolver::{PermissionSet, RoleResolver};
use crate::roles::RoleName;
use crate::store::{CredentialStore, StoreError};
use crate::tenant::{DEFAULT_TENANT_NAME, NewTenant, Tenant};
use crate::token::{IssuedToken, TokenService};
use crate::user::{self, NewUser, NewUserRecord, User, normalize_email};

pub const EMAIL_TAKEN: &str = "User with this email already exists";
pub const INVALID_CREDENTIALS: &str = "Invalid email or password";
pub const ACCOUNT_DEACTIVATED: &str = "Account is deactivated";
pub const INVALID_TENANT: &str = "Invalid tenant";
pub const WRONG_CURRENT_PASSWORD: &str = "Current password is incorrect";
pub const TOKEN_ISSUE_FAILED: &str = "Failed to issue token";

/// Plaintext behind the decoy hash checked for unknown emails.
const DECOY_PASSWORD: &str = "beacon-decoy-password";

/// Self-service registration input.
#[derive(Clone)]
pub struct RegisterInput {
    pub name: String,
    pub email: String,
    pub password: String,
    /// Home tenant. Falls back to the default tenant, which is created on
    /// first use.
    pub tenant_id: Option<TenantId>,
}

/// A freshly authenticated user with their token.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub user: User,
    pub token: IssuedToken,
    pub roles: BTreeSet<RoleName>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    pub user: User,
    pub tenant_id: Option<TenantId>,
    pub roles: BTreeSet<RoleName>,
    pub permissions: PermissionSet,
}

#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn CredentialStore>,
    tokens: Arc<TokenService>,
    resolver: RoleResolver,
    config: AuthConfig,
    /// Hashed with the live parameters on first use so an unknown email costs
    /// the same as a wrong password.
    decoy_hash: Arc<OnceLock<String>>,
}

impl AccountService {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        tokens: Arc<TokenService>,
        config: AuthConfig,
    ) -> Self {
        let resolver = RoleResolver::new(store.clone());
        Self {
            store,
            tokens,
            resolver,
            config,
            decoy_hash: Arc::new(OnceLock::new()),
        }
    }

    /// Validate, hash and persist a new account.
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn create_user(&self, input: NewUser) -> Result<User, AuthError> {
        input.validate(self.config.min_password_length)?;
        let email = normalize_email(&input.email);

        if self.store.find_user_by_email(&email).await?.is_some() {
            return Err(AuthError::conflict(EMAIL_TAKEN));
        }

        let password_hash = hash_blocking(input.password, self.config.password_hash).await?;
        let record = NewUserRecord {
            name: input.name.trim().to_string(),
            email,
            password_hash,
            home_tenant_id: input.home_tenant_id,
            is_system_admin: input.is_system_admin,
        };
        let user = self.store.insert_user(record).await.map_err(|e| match e {
            StoreError::Conflict(_) => AuthError::conflict(EMAIL_TAKEN),
            other => other.into(),
        })?;

        info!(user_id = %user.id, "user created");
        Ok(user)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        Ok(self.store.find_user_by_email(&normalize_email(email)).await?)
    }

    /// Replace a user's password. The plaintext is hashed before it reaches
    /// the store.
    pub async fn set_password(&self, user: &User, new_password: &str) -> Result<User, AuthError> {
        user::validate_password(new_password, self.config.min_password_length)?;
        let hash = hash_blocking(new_password.to_string(), self.config.password_hash).await?;
        let updated = self.store.update_password_hash(user.id, hash).await?;
        info!(user_id = %user.id, "password updated");
        Ok(updated)
    }

    pub async fn check_password(&self, user: &User, candidate: &str) -> Result<bool, AuthError> {
        verify_blocking(candidate.to_string(), user.password_hash.clone()).await
    }

    pub async fn update_last_login(&self, user: &User) -> Result<User, AuthError> {
        Ok(self.store.record_login(user.id, Utc::now()).await?)
    }

    pub async fn register(&self, input: RegisterInput) -> Result<Session, AuthError> {
        let candidate = NewUser::new(input.name, input.email, input.password);
        candidate.validate(self.config.min_password_length)?;

        let tenant = match input.tenant_id {
            Some(id) => self
                .store
                .get_tenant(id)
                .await?
                .ok_or_else(|| AuthError::validation(INVALID_TENANT))?,
            None => self.default_tenant().await?,
        };

        let user = self.create_user(candidate.in_tenant(tenant.id)).await?;
        self.open_session(user).await
    }

    /// Email/password login. Unknown email and wrong password share one
    /// message.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AuthError::validation("Email and password are required"));
        }
        let Some(user) = self.find_by_email(email).await? else {
            self.check_decoy(password).await;
            return Err(AuthError::unauthorized(INVALID_CREDENTIALS));
        };
        if !self.check_password(&user, password).await? {
            return Err(AuthError::unauthorized(INVALID_CREDENTIALS));
        }
        // Only reported once the password matched.
        if !user.is_active {
            return Err(AuthError::unauthorized(ACCOUNT_DEACTIVATED));
        }

        let user = match self.update_last_login(&user).await {
            Ok(updated) => updated,
            Err(e) => {
                warn!(user_id = %user.id, error = %e, "could not record last login");
                user
            }
        };
        self.open_session(user).await
    }

    pub async fn change_password(
        &self,
        user: &User,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        if current_password.is_empty() || new_password.is_empty() {
            return Err(AuthError::validation(
                "Current password and new password are required",
            ));
        }
        user::validate_password(new_password, self.config.min_password_length)?;
        if !self.check_password(user, current_password).await? {
            return Err(AuthError::validation(WRONG_CURRENT_PASSWORD));
        }
        self.set_password(user, new_password).await?;
        Ok(())
    }

    /// Fresh user record plus what they hold in `tenant` (or their home tenant).
    pub async fn profile(
        &self,
        user_id: beacon_core::UserId,
        tenant: Option<TenantId>,
    ) -> Result<Profile, AuthError> {
        let user = self
            .store
            .get_user(user_id)
            .await?
            .ok_or_else(|| AuthError::not_found("User not found"))?;
        let tenant_id = tenant.or(user.home_tenant_id);
        let access = self.resolver.resolve(&user, tenant_id).await?;
        Ok(Profile {
            user,
            tenant_id,
            roles: access.roles,
            permissions: access.permissions,
        })
    }

    async fn open_session(&self, user: User) -> Result<Session, AuthError> {
        let roles = self.resolver.roles(&user, user.home_tenant_id).await?;
        let token = self.tokens.issue(&user).map_err(|e| {
            error!(error = %e, user_id = %user.id, "token issuance failed");
            AuthError::internal(TOKEN_ISSUE_FAILED)
        })?;
        Ok(Session { user, token, roles })
    }

    /// Burns one password verification for a login with an unknown email.
    async fn check_decoy(&self, candidate: &str) {
        let hash = match self.decoy_hash.get() {
            Some(hash) => hash.clone(),
            None => match hash_blocking(DECOY_PASSWORD.to_string(), self.config.password_hash).await {
                Ok(hash) => self.decoy_hash.get_or_init(|| hash).clone(),
                Err(e) => {
                    warn!(error = %e, "could not prepare decoy password hash");
                    return;
                }
            },
        };
        if let Err(e) = verify_blocking(candidate.to_string(), hash).await {
            warn!(error = %e, "decoy password check failed");
        }
    }

    async fn default_tenant(&self) -> Result<Tenant, AuthError> {
        if let Some(tenant) = self.store.find_tenant_by_name(DEFAULT_TENANT_NAME).await? {
            return Ok(tenant);
        }
        let input = NewTenant::new(DEFAULT_TENANT_NAME).with_description("Default tenant for new users");
        match self.store.create_tenant(input).await {
            Ok(tenant) => Ok(tenant),
            // lost a creation race
            Err(StoreError::Conflict(_)) => self
                .store
                .find_tenant_by_name(DEFAULT_TENANT_NAME)
                .await?
                .ok_or_else(|| {
                    error!("default tenant missing after a creation conflict");
                    AuthError::internal(INTERNAL_ERROR)
                }),
            Err(e) => Err(e.into()),
        }
    }
}

async fn hash_blocking(password: String, config: PasswordHashConfig) -> Result<String, AuthError> {
    tokio::task::spawn_blocking(move || password::hash_password(&password, &config))
        .await
        .map_err(|e| {
            error!(error = %e, "password hashing task failed");
            AuthError::internal(INTERNAL_ERROR)
        })?
}

async fn verify_blocking(candidate: String, stored: String) -> Result<bool, AuthError> {
    tokio::task::spawn_blocking(move || password::verify_password(&candidate, &stored))
        .await
        .map_err(|e| {
            error!(error = %e, "password verification task failed");
            AuthError::internal(INTERNAL_ERROR)
        })?
}
