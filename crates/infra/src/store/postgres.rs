//! Postgres-backed credential store.
//!
//! ## Error Mapping
//!
//! | SQLx error | PostgreSQL code | `StoreError` |
//! |------------|-----------------|--------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (foreign key violation) | `23503` | `NotFound` |
//! | Database (check / data exception) | `23514`, `22xxx` | `Validation` |
//! | Database (other) | any other | `Unavailable` |
//! | RowNotFound | n/a | `NotFound` |
//! | Pool / I/O / TLS / protocol | n/a | `Unavailable` |
//!
//! The "one active assignment per slot" rule is a partial unique index
//! (`user_roles_active_key`), so concurrent grants race safely at the
//! database.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Row};
use tracing::{info, instrument};
use uuid::Uuid;

use beacon_auth::assignment::{NewAssignment, UserRole};
use beacon_auth::permissions::{NewPermission, Permission};
use beacon_auth::roles::{NewRole, Role, RoleName};
use beacon_auth::store::{CredentialStore, StoreError};
use beacon_auth::tenant::{NewTenant, Tenant};
use beacon_auth::user::{NewUserRecord, User, UserChanges, normalize_email};
use beacon_core::{AssignmentId, PermissionId, RoleId, TenantId, UserId};

/// Schema applied by [`PostgresCredentialStore::migrate`].
pub const SCHEMA: &str = include_str!("../../migrations/0001_credentials.sql");

const USER_COLUMNS: &str = "id, name, email, password_hash, home_tenant_id, is_active, \
     is_system_admin, last_login, created_at, updated_at";
const ASSIGNMENT_COLUMNS: &str =
    "id, user_id, role_id, tenant_id, assigned_by, is_active, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct PostgresCredentialStore {
    pool: Arc<PgPool>,
}

impl PostgresCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create tables and indexes if missing.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        info!("credential schema is up to date");
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for PostgresCredentialStore {
    #[instrument(skip(self, input), fields(name = %input.name), err)]
    async fn create_tenant(&self, input: NewTenant) -> Result<Tenant, StoreError> {
        input.validate()?;
        let row = sqlx::query_as::<_, TenantRow>(
            r#"
            INSERT INTO tenants (id, name, meta, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, meta, created_at
            "#,
        )
        .bind(TenantId::new().as_uuid())
        .bind(&input.name)
        .bind(&input.meta)
        .bind(Utc::now())
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_tenant", e))?;
        Ok(row.into())
    }

    async fn get_tenant(&self, id: TenantId) -> Result<Option<Tenant>, StoreError> {
        let row = sqlx::query_as::<_, TenantRow>(
            "SELECT id, name, meta, created_at FROM tenants WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_tenant", e))?;
        Ok(row.map(Into::into))
    }

    async fn find_tenant_by_name(&self, name: &str) -> Result<Option<Tenant>, StoreError> {
        let row = sqlx::query_as::<_, TenantRow>(
            "SELECT id, name, meta, created_at FROM tenants WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_tenant_by_name", e))?;
        Ok(row.map(Into::into))
    }

    #[instrument(skip(self, input), err)]
    async fn insert_user(&self, input: NewUserRecord) -> Result<User, StoreError> {
        let now = Utc::now();
        let sql = format!(
            "INSERT INTO users (id, name, email, password_hash, home_tenant_id, is_active, \
             is_system_admin, last_login, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, TRUE, $6, NULL, $7, $7) RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(UserId::new().as_uuid())
            .bind(&input.name)
            .bind(normalize_email(&input.email))
            .bind(&input.password_hash)
            .bind(input.home_tenant_id.map(|t| *t.as_uuid()))
            .bind(input.is_system_admin)
            .bind(now)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_user", e))?;
        Ok(row.into())
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_user", e))?;
        Ok(row.map(Into::into))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE lower(email) = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(normalize_email(email))
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_user_by_email", e))?;
        Ok(row.map(Into::into))
    }

    #[instrument(skip(self, password_hash), fields(user_id = %id), err)]
    async fn update_password_hash(
        &self,
        id: UserId,
        password_hash: String,
    ) -> Result<User, StoreError> {
        let sql = format!(
            "UPDATE users SET password_hash = $2, updated_at = now() WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id.as_uuid())
            .bind(password_hash)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_password_hash", e))?;
        row.map(Into::into)
            .ok_or_else(|| StoreError::NotFound(format!("user {id}")))
    }

    async fn record_login(&self, id: UserId, at: DateTime<Utc>) -> Result<User, StoreError> {
        let sql = format!(
            "UPDATE users SET last_login = $2, updated_at = now() WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id.as_uuid())
            .bind(at)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("record_login", e))?;
        row.map(Into::into)
            .ok_or_else(|| StoreError::NotFound(format!("user {id}")))
    }

    #[instrument(skip(self), err)]
    async fn set_user_active(&self, id: UserId, active: bool) -> Result<User, StoreError> {
        let sql = format!(
            "UPDATE users SET is_active = $2, updated_at = now() WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id.as_uuid())
            .bind(active)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("set_user_active", e))?;
        row.map(Into::into)
            .ok_or_else(|| StoreError::NotFound(format!("user {id}")))
    }

    #[instrument(skip(self, changes), fields(user_id = %id), err)]
    async fn update_user(&self, id: UserId, changes: UserChanges) -> Result<User, StoreError> {
        let sql = format!(
            "UPDATE users SET name = COALESCE($2, name), email = COALESCE($3, email), \
             home_tenant_id = COALESCE($4, home_tenant_id), updated_at = now() \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id.as_uuid())
            .bind(changes.name)
            .bind(changes.email.as_deref().map(normalize_email))
            .bind(changes.home_tenant_id.map(|t| *t.as_uuid()))
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_user", e))?;
        row.map(Into::into)
            .ok_or_else(|| StoreError::NotFound(format!("user {id}")))
    }

    async fn list_users(&self, home_tenant: Option<TenantId>) -> Result<Vec<User>, StoreError> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE $1::uuid IS NULL OR home_tenant_id = $1 \
             ORDER BY created_at, id"
        );
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .bind(home_tenant.map(|t| *t.as_uuid()))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_users", e))?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self), err)]
    async fn delete_user(&self, id: UserId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_user", e))?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, input), fields(name = %input.name), err)]
    async fn create_role(&self, input: NewRole) -> Result<Role, StoreError> {
        input.validate()?;
        let row = sqlx::query_as::<_, RoleRow>(
            r#"
            INSERT INTO roles (id, name, description, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, description, created_at
            "#,
        )
        .bind(RoleId::new().as_uuid())
        .bind(input.name.as_str())
        .bind(&input.description)
        .bind(Utc::now())
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_role", e))?;
        Ok(row.into())
    }

    async fn find_role_by_name(&self, name: &str) -> Result<Option<Role>, StoreError> {
        let row = sqlx::query_as::<_, RoleRow>(
            "SELECT id, name, description, created_at FROM roles WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_role_by_name", e))?;
        Ok(row.map(Into::into))
    }

    async fn roles_by_ids(&self, ids: &[RoleId]) -> Result<Vec<Role>, StoreError> {
        let ids: Vec<Uuid> = ids.iter().map(|id| *id.as_uuid()).collect();
        let rows = sqlx::query_as::<_, RoleRow>(
            "SELECT id, name, description, created_at FROM roles WHERE id = ANY($1) ORDER BY name",
        )
        .bind(ids)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("roles_by_ids", e))?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list_roles(&self) -> Result<Vec<Role>, StoreError> {
        let rows = sqlx::query_as::<_, RoleRow>(
            "SELECT id, name, description, created_at FROM roles ORDER BY name",
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_roles", e))?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self, input), fields(resource = %input.resource, action = %input.action), err)]
    async fn create_permission(&self, input: NewPermission) -> Result<Permission, StoreError> {
        input.validate()?;
        let row = sqlx::query_as::<_, PermissionRow>(
            r#"
            INSERT INTO permissions (id, resource, action, description, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, resource, action, description, created_at
            "#,
        )
        .bind(PermissionId::new().as_uuid())
        .bind(&input.resource)
        .bind(&input.action)
        .bind(&input.description)
        .bind(Utc::now())
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_permission", e))?;
        Ok(row.into())
    }

    async fn find_permission(
        &self,
        resource: &str,
        action: &str,
    ) -> Result<Option<Permission>, StoreError> {
        let row = sqlx::query_as::<_, PermissionRow>(
            r#"
            SELECT id, resource, action, description, created_at
            FROM permissions
            WHERE resource = $1 AND action = $2
            "#,
        )
        .bind(resource)
        .bind(action)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_permission", e))?;
        Ok(row.map(Into::into))
    }

    async fn list_permissions(&self) -> Result<Vec<Permission>, StoreError> {
        let rows = sqlx::query_as::<_, PermissionRow>(
            r#"
            SELECT id, resource, action, description, created_at
            FROM permissions
            ORDER BY resource, action
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_permissions", e))?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self), err)]
    async fn grant_permission(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO role_permissions (role_id, permission_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(role_id.as_uuid())
        .bind(permission_id.as_uuid())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("grant_permission", e))?;
        Ok(result.rows_affected() == 1)
    }

    #[instrument(skip(self), err)]
    async fn revoke_permission(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> Result<bool, StoreError> {
        let result =
            sqlx::query("DELETE FROM role_permissions WHERE role_id = $1 AND permission_id = $2")
                .bind(role_id.as_uuid())
                .bind(permission_id.as_uuid())
                .execute(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("revoke_permission", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn permissions_for_roles(
        &self,
        role_ids: &[RoleId],
    ) -> Result<Vec<Permission>, StoreError> {
        let ids: Vec<Uuid> = role_ids.iter().map(|id| *id.as_uuid()).collect();
        let rows = sqlx::query_as::<_, PermissionRow>(
            r#"
            SELECT DISTINCT p.id, p.resource, p.action, p.description, p.created_at
            FROM permissions p
            JOIN role_permissions rp ON rp.permission_id = p.id
            WHERE rp.role_id = ANY($1)
            ORDER BY p.resource, p.action
            "#,
        )
        .bind(ids)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("permissions_for_roles", e))?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(
        skip(self, input),
        fields(user_id = %input.user_id, role_id = %input.role_id, tenant_id = ?input.tenant_id),
        err
    )]
    async fn insert_assignment(&self, input: NewAssignment) -> Result<UserRole, StoreError> {
        let now = Utc::now();
        let sql = format!(
            "INSERT INTO user_roles (id, user_id, role_id, tenant_id, assigned_by, is_active, \
             created_at, updated_at) VALUES ($1, $2, $3, $4, $5, TRUE, $6, $6) \
             RETURNING {ASSIGNMENT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, AssignmentRow>(&sql)
            .bind(AssignmentId::new().as_uuid())
            .bind(input.user_id.as_uuid())
            .bind(input.role_id.as_uuid())
            .bind(input.tenant_id.map(|t| *t.as_uuid()))
            .bind(input.assigned_by.as_uuid())
            .bind(now)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_assignment", e))?;
        Ok(row.into())
    }

    async fn assignments_for_user(&self, user_id: UserId) -> Result<Vec<UserRole>, StoreError> {
        let sql = format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM user_roles WHERE user_id = $1 \
             ORDER BY created_at, id"
        );
        let rows = sqlx::query_as::<_, AssignmentRow>(&sql)
            .bind(user_id.as_uuid())
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("assignments_for_user", e))?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self), err)]
    async fn deactivate_assignments(
        &self,
        user_id: UserId,
        role_id: RoleId,
        tenant_id: Option<TenantId>,
    ) -> Result<Vec<UserRole>, StoreError> {
        let sql = format!(
            "UPDATE user_roles SET is_active = FALSE, updated_at = now() \
             WHERE user_id = $1 AND role_id = $2 AND tenant_id IS NOT DISTINCT FROM $3 \
             AND is_active RETURNING {ASSIGNMENT_COLUMNS}"
        );
        let rows = sqlx::query_as::<_, AssignmentRow>(&sql)
            .bind(user_id.as_uuid())
            .bind(role_id.as_uuid())
            .bind(tenant_id.map(|t| *t.as_uuid()))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("deactivate_assignments", e))?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

/// Map SQLx errors to `StoreError`.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {operation}: {}", db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Conflict(msg),
                Some("23503") => StoreError::NotFound(msg),
                Some("23514") => StoreError::Validation(msg),
                Some(code) if code.starts_with("22") => StoreError::Validation(msg),
                _ => StoreError::Unavailable(msg),
            }
        }
        sqlx::Error::RowNotFound => {
            StoreError::NotFound(format!("unexpected row not found in {operation}"))
        }
        sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut => {
            StoreError::Unavailable(format!("connection pool unavailable in {operation}"))
        }
        other => StoreError::Unavailable(format!("sqlx error in {operation}: {other}")),
    }
}

struct TenantRow {
    id: Uuid,
    name: String,
    meta: serde_json::Value,
    created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for TenantRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            meta: row.try_get("meta")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl From<TenantRow> for Tenant {
    fn from(row: TenantRow) -> Self {
        Self {
            id: TenantId::from_uuid(row.id),
            name: row.name,
            meta: row.meta,
            created_at: row.created_at,
        }
    }
}

struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    password_hash: String,
    home_tenant_id: Option<Uuid>,
    is_active: bool,
    is_system_admin: bool,
    last_login: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for UserRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            home_tenant_id: row.try_get("home_tenant_id")?,
            is_active: row.try_get("is_active")?,
            is_system_admin: row.try_get("is_system_admin")?,
            last_login: row.try_get("last_login")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: UserId::from_uuid(row.id),
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            home_tenant_id: row.home_tenant_id.map(TenantId::from_uuid),
            is_active: row.is_active,
            is_system_admin: row.is_system_admin,
            last_login: row.last_login,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

struct RoleRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for RoleRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl From<RoleRow> for Role {
    fn from(row: RoleRow) -> Self {
        Self {
            id: RoleId::from_uuid(row.id),
            name: RoleName::new(row.name),
            description: row.description,
            created_at: row.created_at,
        }
    }
}

struct PermissionRow {
    id: Uuid,
    resource: String,
    action: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for PermissionRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            resource: row.try_get("resource")?,
            action: row.try_get("action")?,
            description: row.try_get("description")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl From<PermissionRow> for Permission {
    fn from(row: PermissionRow) -> Self {
        Self {
            id: PermissionId::from_uuid(row.id),
            resource: row.resource,
            action: row.action,
            description: row.description,
            created_at: row.created_at,
        }
    }
}

struct AssignmentRow {
    id: Uuid,
    user_id: Uuid,
    role_id: Uuid,
    tenant_id: Option<Uuid>,
    assigned_by: Uuid,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for AssignmentRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            role_id: row.try_get("role_id")?,
            tenant_id: row.try_get("tenant_id")?,
            assigned_by: row.try_get("assigned_by")?,
            is_active: row.try_get("is_active")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl From<AssignmentRow> for UserRole {
    fn from(row: AssignmentRow) -> Self {
        Self {
            id: AssignmentId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            role_id: RoleId::from_uuid(row.role_id),
            tenant_id: row.tenant_id.map(TenantId::from_uuid),
            assigned_by: UserId::from_uuid(row.assigned_by),
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
