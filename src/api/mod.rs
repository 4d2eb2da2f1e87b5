//! HTTP API for Hawkgate.
//!
//! A demo surface that exercises the guard end-to-end.

pub mod handlers;
mod routes;
mod types;

pub use routes::build_router;
pub use types::*;
