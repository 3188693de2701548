//! PostgreSQL layer - connection pool, schema and repositories
//!
//! - Connection pool (default 5 connections) shared through `AppState`
//! - Multi-step writes (toggle, read-modify-write updates) run in a transaction
//! - Ids are generated in Rust, so no database extension is needed

pub mod migrations;
pub mod pool;
pub mod repos;

pub use pool::{create_pool, create_pool_with_options};
