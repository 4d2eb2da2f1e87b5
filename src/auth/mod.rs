//! Authentication module for Hawkgate.
//!
//! Orchestrates the MAC scheme around application handlers:
//! - RequestAuthenticator: scheme detection, credential resolution,
//!   replay delegation, error classification
//! - NonceRegistry / NonceStore: replay protection
//! - hawk_auth / sign_response: the axum middleware pair

mod authenticator;
mod middleware;
mod nonce;
mod principal;

pub use authenticator::*;
pub use middleware::*;
pub use nonce::*;
pub use principal::*;
