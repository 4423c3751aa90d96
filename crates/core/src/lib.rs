//! `beacon-core`: shared identifiers and the domain error model.
//!
//! This crate has no infrastructure concerns; every other crate in the
//! workspace builds on it.

pub mod error;
pub mod id;

pub use error::{DomainError, DomainResult};
pub use id::{AssignmentId, PermissionId, RoleId, TenantId, UserId};
