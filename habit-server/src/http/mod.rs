//! HTTP server layer
//!
//! Axum server with:
//! - CORS (configured origins by default)
//! - Request tracing
//! - Graceful shutdown
//! - JSON envelopes for data and errors

pub mod server;
pub mod error;
pub mod extractors;
pub mod response;
pub mod routes;

pub use server::{build_router, run_server, AppState, ServerConfig, ServerError};
pub use error::ApiError;
