#![allow(dead_code)]

use std::sync::Arc;

use beacon_auth::store::CredentialStore;
use beacon_auth::{
    AccountService, AuthConfig, Authenticator, NewAssignment, NewPermission, NewRole, NewTenant,
    NewUserRecord, PasswordHashConfig, Role, RoleGrantService, Tenant, TokenService, User,
    UserAdminService,
};
use beacon_core::TenantId;
use beacon_infra::InMemoryCredentialStore;

pub const SECRET: &str = "integration-test-secret";

pub fn config() -> AuthConfig {
    AuthConfig {
        password_hash: PasswordHashConfig::insecure_fast(),
        ..AuthConfig::with_secret(SECRET)
    }
}

pub struct Harness {
    pub memory: Arc<InMemoryCredentialStore>,
    pub store: Arc<dyn CredentialStore>,
    pub tokens: Arc<TokenService>,
    pub accounts: AccountService,
    pub authenticator: Authenticator,
    pub grants: RoleGrantService,
    pub users: UserAdminService,
}

impl Harness {
    pub fn new() -> Self {
        let memory = Arc::new(InMemoryCredentialStore::new());
        let store: Arc<dyn CredentialStore> = memory.clone();
        let tokens = Arc::new(TokenService::new(&config()).unwrap());
        Self {
            accounts: AccountService::new(store.clone(), tokens.clone(), config()),
            authenticator: Authenticator::new(tokens.clone(), store.clone()),
            grants: RoleGrantService::new(store.clone()),
            users: UserAdminService::new(store.clone()),
            memory,
            store,
            tokens,
        }
    }

    pub async fn tenant(&self, name: &str) -> Tenant {
        self.store.create_tenant(NewTenant::new(name)).await.unwrap()
    }

    /// User inserted straight into the store (no password hashing).
    pub async fn user(&self, email: &str, home: Option<TenantId>) -> User {
        self.store
            .insert_user(NewUserRecord {
                name: email.split('@').next().unwrap_or("user").to_string(),
                email: email.to_string(),
                password_hash: "$argon2id$not-a-real-hash".to_string(),
                home_tenant_id: home,
                is_system_admin: false,
            })
            .await
            .unwrap()
    }

    pub async fn system_admin(&self, email: &str) -> User {
        self.store
            .insert_user(NewUserRecord {
                name: "Root".to_string(),
                email: email.to_string(),
                password_hash: "$argon2id$not-a-real-hash".to_string(),
                home_tenant_id: None,
                is_system_admin: true,
            })
            .await
            .unwrap()
    }

    /// Role with the given `resource:action` permissions, creating any that
    /// are missing.
    pub async fn role(&self, name: &str, permissions: &[&str]) -> Role {
        let role = match self.store.find_role_by_name(name).await.unwrap() {
            Some(existing) => existing,
            None => self
                .store
                .create_role(NewRole::new(name.to_string(), None))
                .await
                .unwrap(),
        };
        for key in permissions {
            let (resource, action) = key.split_once(':').unwrap();
            let permission = match self.store.find_permission(resource, action).await.unwrap() {
                Some(p) => p,
                None => self
                    .store
                    .create_permission(NewPermission::new(resource, action, None))
                    .await
                    .unwrap(),
            };
            self.store.grant_permission(role.id, permission.id).await.unwrap();
        }
        role
    }

    pub async fn assign(&self, user: &User, role: &Role, tenant: Option<TenantId>) {
        self.store
            .insert_assignment(NewAssignment {
                user_id: user.id,
                role_id: role.id,
                tenant_id: tenant,
                assigned_by: user.id,
            })
            .await
            .unwrap();
    }

    pub fn bearer(&self, user: &User) -> String {
        format!("Bearer {}", self.tokens.issue(user).unwrap().token)
    }
}
