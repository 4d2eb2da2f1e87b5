//! API response types.

use serde::Serialize;

/// Health probe response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// The authenticated identity as seen by handlers.
#[derive(Debug, Serialize)]
pub struct WhoamiResponse {
    pub username: String,
    pub active: bool,
    pub authenticated: bool,
}
