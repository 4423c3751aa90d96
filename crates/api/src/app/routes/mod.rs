pub mod admin;
pub mod auth;
pub mod metrics;
pub mod system;
pub mod users;
