//! Liveness endpoint, the only route without auth

use std::sync::Arc;

use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::http::server::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Liveness {
    pub status: &'static str,
    pub version: &'static str,
    /// Which repository backend is serving requests
    pub storage: &'static str,
    pub default_timezone: String,
}

async fn liveness(State(state): State<Arc<AppState>>) -> Json<Liveness> {
    Json(Liveness {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        storage: state.storage,
        default_timezone: state.default_tz.name().to_owned(),
    })
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(liveness))
}
