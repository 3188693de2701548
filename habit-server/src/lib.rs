//! habit-server: HTTP API for Habit Hero
//!
//! Axum routes over a service layer; services talk to repository traits
//! implemented by PostgreSQL (sqlx) and an in-memory store.

pub mod auth;
pub mod db;
pub mod http;
pub mod services;
pub mod store;

pub use http::{build_router, run_server, ApiError, AppState, ServerConfig};
pub use store::{DbError, Repositories};
