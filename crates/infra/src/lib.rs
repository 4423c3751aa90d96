//! Infrastructure layer: `CredentialStore` implementations and schema
//! migration.

pub mod store;

pub use store::in_memory::InMemoryCredentialStore;
pub use store::postgres::PostgresCredentialStore;
