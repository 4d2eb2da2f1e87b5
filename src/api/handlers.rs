//! HTTP request handlers.
//!
//! A small surface that exercises the guard end-to-end: an open health
//! probe, an identity echo, and a body echo that round-trips payload
//! signing.

use axum::{
    body::Bytes,
    http::{header::CONTENT_TYPE, HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
    Extension, Json,
};

use crate::api::types::{HealthResponse, WhoamiResponse};
use crate::auth::{authentication_required, AuthenticatedPrincipal};

/// Liveness probe; reachable without credentials.
///
/// GET /v1/health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Return the authenticated identity.
///
/// GET /v1/whoami
pub async fn whoami(principal: Option<Extension<AuthenticatedPrincipal>>) -> Response {
    match principal {
        Some(Extension(principal)) => Json(WhoamiResponse {
            username: principal.username().to_string(),
            active: principal.is_active(),
            authenticated: principal.is_authenticated(),
        })
        .into_response(),
        None => authentication_required(),
    }
}

/// Return the request body unchanged, preserving its content type.
///
/// POST /v1/echo
pub async fn echo(
    principal: Option<Extension<AuthenticatedPrincipal>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if principal.is_none() {
        return authentication_required();
    }
    let content_type = headers
        .get(CONTENT_TYPE)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static("application/octet-stream"));
    ([(CONTENT_TYPE, content_type)], body).into_response()
}
