//! Route definitions for the API.

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::handlers;
use crate::auth::{hawk_auth, sign_response, RequestAuthenticator};

/// Build the API router with the guard and signer wired around it.
///
/// The signer is layered outside the guard so it observes the
/// verification state the guard records on each response.
pub fn build_router(authenticator: Arc<RequestAuthenticator>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/v1/health", get(handlers::health_check))
        .route("/v1/whoami", get(handlers::whoami))
        .route("/v1/echo", post(handlers::echo))
        .layer(middleware::from_fn_with_state(
            authenticator.clone(),
            hawk_auth,
        ))
        .layer(middleware::from_fn_with_state(
            authenticator,
            sign_response,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
