//! HTTP API: router, request gates, and error mapping over `beacon-auth`.

pub mod app;
pub mod config;
pub mod context;
pub mod middleware;
