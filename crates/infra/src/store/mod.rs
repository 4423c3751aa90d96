//! Credential store backends.
//!
//! - [`in_memory::InMemoryCredentialStore`]: tests and local development.
//! - [`postgres::PostgresCredentialStore`]: durable storage via `sqlx`.

pub mod in_memory;
pub mod postgres;
