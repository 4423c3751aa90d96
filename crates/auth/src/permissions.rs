use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use beacon_core::{DomainError, PermissionId};

/// An atomic `(resource, action)` capability, e.g. `campaign:create`.
///
/// Matching is exact on both parts; there is no wildcard form. Serialized
/// as its `resource:action` string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct PermissionKey {
    resource: String,
    action: String,
}

impl PermissionKey {
    pub fn new(resource: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            action: action.into(),
        }
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn matches(&self, resource: &str, action: &str) -> bool {
        self.resource == resource && self.action == action
    }
}

impl core::fmt::Display for PermissionKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}:{}", self.resource, self.action)
    }
}

impl FromStr for PermissionKey {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (resource, action) = s
            .split_once(':')
            .ok_or_else(|| DomainError::validation(format!("permission '{s}' is not resource:action")))?;
        validate_part("resource", resource)?;
        validate_part("action", action)?;
        Ok(Self::new(resource, action))
    }
}

impl From<PermissionKey> for String {
    fn from(value: PermissionKey) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for PermissionKey {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

fn validate_part(label: &str, value: &str) -> Result<(), DomainError> {
    if value.trim().is_empty() {
        return Err(DomainError::validation(format!("permission {label} cannot be empty")));
    }
    if value.contains(':') {
        return Err(DomainError::validation(format!(
            "permission {label} cannot contain ':'"
        )));
    }
    Ok(())
}

/// A catalog permission. The `(resource, action)` pair is unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub id: PermissionId,
    pub resource: String,
    pub action: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Permission {
    pub fn key(&self) -> PermissionKey {
        PermissionKey::new(self.resource.clone(), self.action.clone())
    }
}

/// Input for adding a permission to the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPermission {
    pub resource: String,
    pub action: String,
    pub description: Option<String>,
}

impl NewPermission {
    pub fn new(
        resource: impl Into<String>,
        action: impl Into<String>,
        description: Option<String>,
    ) -> Self {
        Self {
            resource: resource.into(),
            action: action.into(),
            description,
        }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        validate_part("resource", &self.resource)?;
        validate_part("action", &self.action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_and_parse_agree() {
        let key = PermissionKey::new("campaign", "create");
        assert_eq!(key.to_string(), "campaign:create");
        assert_eq!("campaign:create".parse::<PermissionKey>().unwrap(), key);
    }

    #[test]
    fn parse_rejects_malformed_keys() {
        for bad in ["campaign", ":create", "campaign:", "a:b:c", " :x"] {
            assert!(bad.parse::<PermissionKey>().is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn serde_uses_string_form() {
        let key = PermissionKey::new("metric", "read");
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "\"metric:read\"");
        let back: PermissionKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
    }

    #[test]
    fn matching_is_exact() {
        let key = PermissionKey::new("campaign", "create");
        assert!(key.matches("campaign", "create"));
        assert!(!key.matches("campaign", "delete"));
        assert!(!key.matches("Campaign", "create"));
    }

    #[test]
    fn new_permission_validation() {
        assert!(NewPermission::new("user", "read", None).validate().is_ok());
        assert!(NewPermission::new("", "read", None).validate().is_err());
        assert!(NewPermission::new("user", "re:ad", None).validate().is_err());
    }
}
