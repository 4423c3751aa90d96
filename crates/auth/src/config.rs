//! Authentication settings.

use argon2::Params;

/// Argon2id cost parameters for new password hashes.
///
/// Existing hashes carry their own parameters in the PHC string, so changing
/// these only affects hashes produced afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordHashConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for PasswordHashConfig {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

impl PasswordHashConfig {
    /// Cheapest parameters Argon2 accepts. Tests only.
    pub fn insecure_fast() -> Self {
        Self {
            memory_kib: Params::MIN_M_COST,
            iterations: Params::MIN_T_COST,
            parallelism: Params::MIN_P_COST,
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct AuthConfig {
    /// HMAC secret for HS256 tokens. Must not be empty.
    pub jwt_secret: String,
    pub jwt_issuer: String,
    /// Token lifetime (24h by default).
    pub token_ttl_secs: u64,
    /// Clock skew tolerated when checking `exp`.
    pub token_leeway_secs: u64,
    pub min_password_length: usize,
    pub password_hash: PasswordHashConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            jwt_issuer: "beacon".to_string(),
            token_ttl_secs: 24 * 60 * 60,
            token_leeway_secs: 0,
            min_password_length: 6,
            password_hash: PasswordHashConfig::default(),
        }
    }
}

impl AuthConfig {
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: secret.into(),
            ..Self::default()
        }
    }
}

impl core::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("jwt_issuer", &self.jwt_issuer)
            .field("token_ttl_secs", &self.token_ttl_secs)
            .field("token_leeway_secs", &self.token_leeway_secs)
            .field("min_password_length", &self.min_password_length)
            .field("password_hash", &self.password_hash)
            .finish()
    }
}
