use chrono::{DateTime, Utc};
use serde::Serialize;

use beacon_core::{DomainError, TenantId, UserId};

/// Message returned when any of name, email or password is missing.
pub const MISSING_FIELDS: &str = "Name, email, and password are required";

/// A stored user account.
///
/// `password_hash` is an Argon2 PHC string and is never serialized.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Tenant used as request context when the caller names none.
    pub home_tenant_id: Option<TenantId>,
    pub is_active: bool,
    /// Platform-level flag. Bypasses tenant scoping during resolution.
    pub is_system_admin: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl core::fmt::Debug for User {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("home_tenant_id", &self.home_tenant_id)
            .field("is_active", &self.is_active)
            .field("is_system_admin", &self.is_system_admin)
            .finish_non_exhaustive()
    }
}

/// Caller input for creating an account (plaintext password).
#[derive(Clone, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub home_tenant_id: Option<TenantId>,
    pub is_system_admin: bool,
}

impl core::fmt::Debug for NewUser {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NewUser")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("home_tenant_id", &self.home_tenant_id)
            .field("is_system_admin", &self.is_system_admin)
            .finish()
    }
}

impl NewUser {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            password: password.into(),
            home_tenant_id: None,
            is_system_admin: false,
        }
    }

    pub fn in_tenant(mut self, tenant_id: TenantId) -> Self {
        self.home_tenant_id = Some(tenant_id);
        self
    }

    pub fn system_admin(mut self) -> Self {
        self.is_system_admin = true;
        self
    }

    pub fn validate(&self, min_password_length: usize) -> Result<(), DomainError> {
        if self.name.trim().is_empty() || self.email.trim().is_empty() || self.password.is_empty() {
            return Err(DomainError::validation(MISSING_FIELDS));
        }
        validate_email(&self.email)?;
        validate_password(&self.password, min_password_length)
    }
}

/// What a store persists for a new account. The store assigns id and
/// timestamps; accounts start active.
#[derive(Clone, PartialEq, Eq)]
pub struct NewUserRecord {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub home_tenant_id: Option<TenantId>,
    pub is_system_admin: bool,
}

impl core::fmt::Debug for NewUserRecord {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NewUserRecord")
            .field("email", &self.email)
            .field("home_tenant_id", &self.home_tenant_id)
            .finish_non_exhaustive()
    }
}

/// Partial profile update. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub home_tenant_id: Option<TenantId>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.home_tenant_id.is_none()
    }

    /// Trims the name, normalizes the email and checks both.
    pub fn normalized(self) -> Result<Self, DomainError> {
        let name = match self.name {
            Some(name) if name.trim().is_empty() => {
                return Err(DomainError::validation("Name cannot be empty"));
            }
            Some(name) => Some(name.trim().to_string()),
            None => None,
        };
        let email = match self.email {
            Some(email) => {
                validate_email(&email)?;
                Some(normalize_email(&email))
            }
            None => None,
        };
        Ok(Self {
            name,
            email,
            home_tenant_id: self.home_tenant_id,
        })
    }
}

/// Emails are unique case-insensitively; everything is stored lower-cased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_email(email: &str) -> Result<(), DomainError> {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !email.contains(char::is_whitespace) => Ok(()),
        _ => Err(DomainError::validation("Invalid email address")),
    }
}

pub fn validate_password(password: &str, min_length: usize) -> Result<(), DomainError> {
    if password.chars().count() < min_length {
        return Err(DomainError::validation(format!(
            "Password must be at least {min_length} characters long"
        )));
    }
    Ok(())
}
