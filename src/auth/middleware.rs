//! Request-guard and response-signing middleware for axum.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE, HOST},
        request::Parts,
        HeaderName, HeaderValue, StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use crate::auth::authenticator::{
    AuthenticationOutcome, RequestAuthenticator, VerificationState,
};
use crate::error::ErrorResponse;

/// Response header carrying the server's signature.
pub const SERVER_AUTHORIZATION: HeaderName = HeaderName::from_static("server-authorization");

/// Generic 401 sent when a handler requires an identity that is not
/// there.
pub fn authentication_required() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse::authentication_failed()),
    )
        .into_response()
}

/// Verify the request MAC before the handler runs.
///
/// On success the principal lands in the request extensions and the
/// verification context is recorded on the response for the signer. On
/// denial the handler never runs. Requests without the scheme pass
/// through unauthenticated.
pub async fn hawk_auth(
    State(authenticator): State<Arc<RequestAuthenticator>>,
    request: Request,
    next: Next,
) -> Response {
    let (parts, body) = request.into_parts();
    let bytes = match to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, "failed to buffer request body");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    let url = absolute_url(&parts);
    let outcome = authenticator.authenticate(&parts, &bytes, &url);

    let mut response = match outcome {
        AuthenticationOutcome::Authenticated { principal, context } => {
            let mut request = Request::from_parts(parts, Body::from(bytes));
            request.extensions_mut().insert(principal);
            let mut response = next.run(request).await;
            response.extensions_mut().insert(VerificationState(context));
            return response;
        }
        AuthenticationOutcome::Skipped => {
            let request = Request::from_parts(parts, Body::from(bytes));
            next.run(request).await
        }
        AuthenticationOutcome::Denied(error) => error.into_response(),
    };

    response
        .extensions_mut()
        .insert(VerificationState(None));
    response
}

/// Sign the outgoing response with the context recorded by [`hawk_auth`].
///
/// Layered outside the guard. A scheme-bearing request that reaches this
/// stage without any recorded state means the authenticator never ran;
/// that is a wiring bug, not a client condition, and response processing
/// is aborted.
pub async fn sign_response(
    State(authenticator): State<Arc<RequestAuthenticator>>,
    request: Request,
    next: Next,
) -> Response {
    let is_signed_scheme = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| authenticator.uses_scheme(v));

    let response = next.run(request).await;

    let state = response.extensions().get::<VerificationState>().cloned();
    match state {
        None if is_signed_scheme => {
            tracing::error!(
                scheme = %authenticator.scheme(),
                "request used the signing scheme but never passed the authenticator; \
                 check middleware wiring"
            );
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::internal()),
            )
                .into_response()
        }
        Some(VerificationState(Some(receiver))) => {
            let (mut parts, body) = response.into_parts();
            let bytes = match to_bytes(body, usize::MAX).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::error!(error = %e, "failed to buffer response body for signing");
                    return StatusCode::INTERNAL_SERVER_ERROR.into_response();
                }
            };
            let content_type = parts
                .headers
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("");

            match receiver
                .respond(&bytes, content_type)
                .and_then(|value| {
                    HeaderValue::from_str(&value).map_err(|e| {
                        crate::error::AuthError::Internal(format!(
                            "unencodable signature header: {e}"
                        ))
                    })
                }) {
                Ok(value) => {
                    tracing::debug!("signing the response");
                    parts.headers.insert(SERVER_AUTHORIZATION, value);
                    Response::from_parts(parts, Body::from(bytes))
                }
                Err(e) => {
                    tracing::error!(error = %e, "failed to sign response");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(ErrorResponse::internal()),
                    )
                        .into_response()
                }
            }
        }
        _ => response,
    }
}

/// Rebuild the absolute URL the client signed.
///
/// The MAC covers host, port, and resource; the scheme only selects the
/// default port, and TLS termination upstream is out of scope here.
fn absolute_url(parts: &Parts) -> String {
    if parts.uri.scheme().is_some() {
        return parts.uri.to_string();
    }
    let host = parts
        .headers
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    format!("http://{host}{path_and_query}")
}
