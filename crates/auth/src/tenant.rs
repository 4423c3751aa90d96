use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use beacon_core::{DomainError, TenantId};

/// Name of the tenant self-registration falls back to when none is given.
pub const DEFAULT_TENANT_NAME: &str = "default-tenant";

/// An isolation unit. Tenant names are unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    pub name: String,
    /// Free-form metadata (`{"description": ...}` for seeded tenants).
    pub meta: Value,
    pub created_at: DateTime<Utc>,
}

impl Tenant {
    pub fn description(&self) -> Option<&str> {
        self.meta.get("description").and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTenant {
    pub name: String,
    pub meta: Value,
}

impl NewTenant {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            meta: json!({}),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.meta = json!({ "description": description.into() });
        self
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("tenant name cannot be empty"));
        }
        if !self.meta.is_object() {
            return Err(DomainError::validation("tenant meta must be a JSON object"));
        }
        Ok(())
    }
}
