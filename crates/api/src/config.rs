//! Environment configuration for the API binary.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use beacon_auth::AuthConfig;

const DEV_SECRET: &str = "dev-secret-change-me";

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    /// `None` selects the in-memory credential store.
    pub database_url: Option<String>,
    pub auth: AuthConfig,
}

impl ApiConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the process environment in
    /// production).
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let bind_addr = get("BIND_ADDR")
            .unwrap_or_else(|| "0.0.0.0:8080".to_string())
            .parse()
            .context("BIND_ADDR must be a socket address")?;

        let database_url = get("DATABASE_URL").filter(|url| !url.trim().is_empty());

        let mut auth = AuthConfig::default();
        auth.jwt_secret = match get("JWT_SECRET").filter(|s| !s.is_empty()) {
            Some(secret) => secret,
            None => {
                tracing::warn!("JWT_SECRET not set; using insecure dev default");
                DEV_SECRET.to_string()
            }
        };
        if let Some(issuer) = get("JWT_ISSUER") {
            auth.jwt_issuer = issuer;
        }
        if let Some(ttl) = get("JWT_TTL_SECS") {
            auth.token_ttl_secs = ttl.parse().context("JWT_TTL_SECS must be an integer")?;
        }
        if let Some(min) = get("PASSWORD_MIN_LENGTH") {
            auth.min_password_length =
                min.parse().context("PASSWORD_MIN_LENGTH must be an integer")?;
        }

        Ok(Self {
            bind_addr,
            database_url,
            auth,
        })
    }
}
