use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use beacon_auth::assignment::{NewAssignment, RolePermission, UserRole};
use beacon_auth::permissions::{NewPermission, Permission};
use beacon_auth::roles::{NewRole, Role};
use beacon_auth::store::{CredentialStore, StoreError};
use beacon_auth::tenant::{NewTenant, Tenant};
use beacon_auth::user::{NewUserRecord, User, UserChanges, normalize_email};
use beacon_core::{AssignmentId, PermissionId, RoleId, TenantId, UserId};

#[derive(Debug, Default)]
struct State {
    tenants: HashMap<TenantId, Tenant>,
    users: HashMap<UserId, User>,
    roles: HashMap<RoleId, Role>,
    permissions: HashMap<PermissionId, Permission>,
    role_permissions: BTreeSet<RolePermission>,
    /// Insertion order is creation order.
    assignments: Vec<UserRole>,
}

impl State {
    fn user_mut(&mut self, id: UserId) -> Result<&mut User, StoreError> {
        self.users
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("user {id}")))
    }
}

/// In-memory credential store.
///
/// Intended for tests/dev. Enforces the same uniqueness rules as the
/// Postgres schema. [`InMemoryCredentialStore::set_offline`] simulates an
/// outage: every call then fails with `Unavailable`.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    state: RwLock<State>,
    offline: AtomicBool,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>, StoreError> {
        self.check_online()?;
        self.state
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>, StoreError> {
        self.check_online()?;
        self.state
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("store is offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn create_tenant(&self, input: NewTenant) -> Result<Tenant, StoreError> {
        input.validate()?;
        let mut state = self.write()?;
        if state.tenants.values().any(|t| t.name == input.name) {
            return Err(StoreError::Conflict(format!("tenant '{}' already exists", input.name)));
        }
        let tenant = Tenant {
            id: TenantId::new(),
            name: input.name,
            meta: input.meta,
            created_at: Utc::now(),
        };
        state.tenants.insert(tenant.id, tenant.clone());
        Ok(tenant)
    }

    async fn get_tenant(&self, id: TenantId) -> Result<Option<Tenant>, StoreError> {
        Ok(self.read()?.tenants.get(&id).cloned())
    }

    async fn find_tenant_by_name(&self, name: &str) -> Result<Option<Tenant>, StoreError> {
        Ok(self.read()?.tenants.values().find(|t| t.name == name).cloned())
    }

    async fn insert_user(&self, input: NewUserRecord) -> Result<User, StoreError> {
        let email = normalize_email(&input.email);
        let mut state = self.write()?;
        if state.users.values().any(|u| u.email == email) {
            return Err(StoreError::Conflict(format!("email '{email}' already registered")));
        }
        if let Some(tenant_id) = input.home_tenant_id {
            if !state.tenants.contains_key(&tenant_id) {
                return Err(StoreError::NotFound(format!("tenant {tenant_id}")));
            }
        }
        let now = Utc::now();
        let user = User {
            id: UserId::new(),
            name: input.name,
            email,
            password_hash: input.password_hash,
            home_tenant_id: input.home_tenant_id,
            is_active: true,
            is_system_admin: input.is_system_admin,
            last_login: None,
            created_at: now,
            updated_at: now,
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let email = normalize_email(email);
        Ok(self.read()?.users.values().find(|u| u.email == email).cloned())
    }

    async fn update_password_hash(
        &self,
        id: UserId,
        password_hash: String,
    ) -> Result<User, StoreError> {
        let mut state = self.write()?;
        let user = state.user_mut(id)?;
        user.password_hash = password_hash;
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn record_login(&self, id: UserId, at: DateTime<Utc>) -> Result<User, StoreError> {
        let mut state = self.write()?;
        let user = state.user_mut(id)?;
        user.last_login = Some(at);
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn set_user_active(&self, id: UserId, active: bool) -> Result<User, StoreError> {
        let mut state = self.write()?;
        let user = state.user_mut(id)?;
        user.is_active = active;
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn update_user(&self, id: UserId, changes: UserChanges) -> Result<User, StoreError> {
        let mut state = self.write()?;
        if let Some(email) = &changes.email {
            let email = normalize_email(email);
            if state.users.values().any(|u| u.id != id && u.email == email) {
                return Err(StoreError::Conflict(format!("email '{email}' already registered")));
            }
        }
        if let Some(tenant_id) = changes.home_tenant_id {
            if !state.tenants.contains_key(&tenant_id) {
                return Err(StoreError::NotFound(format!("tenant {tenant_id}")));
            }
        }
        let user = state.user_mut(id)?;
        if let Some(name) = changes.name {
            user.name = name;
        }
        if let Some(email) = changes.email {
            user.email = normalize_email(&email);
        }
        if let Some(tenant_id) = changes.home_tenant_id {
            user.home_tenant_id = Some(tenant_id);
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn list_users(&self, home_tenant: Option<TenantId>) -> Result<Vec<User>, StoreError> {
        let state = self.read()?;
        let mut users: Vec<User> = state
            .users
            .values()
            .filter(|u| home_tenant.is_none() || u.home_tenant_id == home_tenant)
            .cloned()
            .collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(users)
    }

    async fn delete_user(&self, id: UserId) -> Result<bool, StoreError> {
        Ok(self.write()?.users.remove(&id).is_some())
    }

    async fn create_role(&self, input: NewRole) -> Result<Role, StoreError> {
        input.validate()?;
        let mut state = self.write()?;
        if state.roles.values().any(|r| r.name == input.name) {
            return Err(StoreError::Conflict(format!("role '{}' already exists", input.name)));
        }
        let role = Role {
            id: RoleId::new(),
            name: input.name,
            description: input.description,
            created_at: Utc::now(),
        };
        state.roles.insert(role.id, role.clone());
        Ok(role)
    }

    async fn find_role_by_name(&self, name: &str) -> Result<Option<Role>, StoreError> {
        Ok(self
            .read()?
            .roles
            .values()
            .find(|r| r.name.as_str() == name)
            .cloned())
    }

    async fn roles_by_ids(&self, ids: &[RoleId]) -> Result<Vec<Role>, StoreError> {
        let state = self.read()?;
        let mut roles: Vec<Role> = state
            .roles
            .values()
            .filter(|r| ids.contains(&r.id))
            .cloned()
            .collect();
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(roles)
    }

    async fn list_roles(&self) -> Result<Vec<Role>, StoreError> {
        let mut roles: Vec<Role> = self.read()?.roles.values().cloned().collect();
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(roles)
    }

    async fn create_permission(&self, input: NewPermission) -> Result<Permission, StoreError> {
        input.validate()?;
        let mut state = self.write()?;
        if state
            .permissions
            .values()
            .any(|p| p.resource == input.resource && p.action == input.action)
        {
            return Err(StoreError::Conflict(format!(
                "permission {}:{} already exists",
                input.resource, input.action
            )));
        }
        let permission = Permission {
            id: PermissionId::new(),
            resource: input.resource,
            action: input.action,
            description: input.description,
            created_at: Utc::now(),
        };
        state.permissions.insert(permission.id, permission.clone());
        Ok(permission)
    }

    async fn find_permission(
        &self,
        resource: &str,
        action: &str,
    ) -> Result<Option<Permission>, StoreError> {
        Ok(self
            .read()?
            .permissions
            .values()
            .find(|p| p.resource == resource && p.action == action)
            .cloned())
    }

    async fn list_permissions(&self) -> Result<Vec<Permission>, StoreError> {
        let mut permissions: Vec<Permission> =
            self.read()?.permissions.values().cloned().collect();
        permissions.sort_by(|a, b| (&a.resource, &a.action).cmp(&(&b.resource, &b.action)));
        Ok(permissions)
    }

    async fn grant_permission(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> Result<bool, StoreError> {
        let mut state = self.write()?;
        if !state.roles.contains_key(&role_id) {
            return Err(StoreError::NotFound(format!("role {role_id}")));
        }
        if !state.permissions.contains_key(&permission_id) {
            return Err(StoreError::NotFound(format!("permission {permission_id}")));
        }
        Ok(state.role_permissions.insert(RolePermission {
            role_id,
            permission_id,
        }))
    }

    async fn revoke_permission(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> Result<bool, StoreError> {
        Ok(self.write()?.role_permissions.remove(&RolePermission {
            role_id,
            permission_id,
        }))
    }

    async fn permissions_for_roles(
        &self,
        role_ids: &[RoleId],
    ) -> Result<Vec<Permission>, StoreError> {
        let state = self.read()?;
        let ids: BTreeSet<PermissionId> = state
            .role_permissions
            .iter()
            .filter(|link| role_ids.contains(&link.role_id))
            .map(|link| link.permission_id)
            .collect();
        let mut permissions: Vec<Permission> = ids
            .iter()
            .filter_map(|id| state.permissions.get(id).cloned())
            .collect();
        permissions.sort_by(|a, b| (&a.resource, &a.action).cmp(&(&b.resource, &b.action)));
        Ok(permissions)
    }

    async fn insert_assignment(&self, input: NewAssignment) -> Result<UserRole, StoreError> {
        let mut state = self.write()?;
        if !state.roles.contains_key(&input.role_id) {
            return Err(StoreError::NotFound(format!("role {}", input.role_id)));
        }
        if let Some(tenant_id) = input.tenant_id {
            if !state.tenants.contains_key(&tenant_id) {
                return Err(StoreError::NotFound(format!("tenant {tenant_id}")));
            }
        }
        let duplicate = state.assignments.iter().any(|row| {
            row.is_active
                && row.user_id == input.user_id
                && row.role_id == input.role_id
                && row.tenant_id == input.tenant_id
        });
        if duplicate {
            return Err(StoreError::Conflict(
                "an active assignment already exists".to_string(),
            ));
        }
        let now = Utc::now();
        let row = UserRole {
            id: AssignmentId::new(),
            user_id: input.user_id,
            role_id: input.role_id,
            tenant_id: input.tenant_id,
            assigned_by: input.assigned_by,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        state.assignments.push(row.clone());
        Ok(row)
    }

    async fn assignments_for_user(&self, user_id: UserId) -> Result<Vec<UserRole>, StoreError> {
        Ok(self
            .read()?
            .assignments
            .iter()
            .filter(|row| row.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn deactivate_assignments(
        &self,
        user_id: UserId,
        role_id: RoleId,
        tenant_id: Option<TenantId>,
    ) -> Result<Vec<UserRole>, StoreError> {
        let mut state = self.write()?;
        let now = Utc::now();
        let mut changed = Vec::new();
        for row in state.assignments.iter_mut().filter(|row| {
            row.is_active
                && row.user_id == user_id
                && row.role_id == role_id
                && row.tenant_id == tenant_id
        }) {
            row.is_active = false;
            row.updated_at = now;
            changed.push(row.clone());
        }
        Ok(changed)
    }
}
