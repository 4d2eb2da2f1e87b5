//! Hawkgate - MAC authentication gateway.
//!
//! This service verifies Hawk-signed requests before they reach the
//! application handlers and signs responses for mutual authentication.

use std::sync::Arc;

use tokio::net::TcpListener;

use hawkgate::api::build_router;
use hawkgate::auth::{InMemoryNonceStore, RequestAuthenticator};
use hawkgate::config::Config;
use hawkgate::logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file (if present)
    // This is optional and won't fail if .env doesn't exist
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("Note: No .env file loaded ({e})");
    }

    // Initialize logging
    logging::init();

    tracing::info!("Starting Hawkgate v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = Config::load().map_err(|e| {
        tracing::error!(error = %e, "Failed to load configuration");
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    tracing::info!(
        host = %config.server.host,
        port = %config.server.port,
        scheme = %config.hawk.scheme,
        credentials = config.hawk.credentials.len(),
        use_nonce_cache = config.hawk.use_nonce_cache,
        message_expiration_seconds = config.hawk.message_expiration_seconds,
        "Configuration loaded"
    );

    if config.hawk.skip_auth {
        tracing::warn!("MAC authentication is DISABLED - enable for production");
    }

    // Build the authenticator around the shared nonce store
    let nonce_store = Arc::new(InMemoryNonceStore::new());
    let authenticator = Arc::new(RequestAuthenticator::new(&config.hawk, nonce_store));

    // Build router
    let app = build_router(authenticator);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;

    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
