use axum::response::IntoResponse;
use serde::Serialize;

use crate::response::Reply;

#[derive(Serialize)]
pub struct HealthResponse {
    pub service: &'static str,
    pub version: &'static str,
}

/// Liveness probe.
pub async fn health() -> impl IntoResponse {
    Reply::ok(HealthResponse {
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
    })
}
