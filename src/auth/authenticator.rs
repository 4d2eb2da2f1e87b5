//! Request authentication orchestration.

use std::sync::Arc;

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::request::Parts;

use crate::auth::nonce::{NonceRegistry, NonceStore};
use crate::auth::principal::AuthenticatedPrincipal;
use crate::config::HawkSettings;
use crate::error::{AuthError, AuthResult};
use crate::hawk::{
    Credentials, CredentialResolver, Receiver, SeenNonce, StaticCredentialResolver,
};

/// Result of inspecting one request.
pub enum AuthenticationOutcome {
    /// MAC verified. The context is `None` only when verification was
    /// skipped by configuration.
    Authenticated {
        principal: AuthenticatedPrincipal,
        context: Option<Receiver>,
    },
    /// No or foreign scheme; other authenticators in a chain may run.
    Skipped,
    /// Verification failed; the request must not reach the handler.
    Denied(AuthError),
}

/// Typed context recorded on every response that passed through the
/// authenticator, read back by the response signer.
#[derive(Clone, Default)]
pub struct VerificationState(pub Option<Receiver>);

/// Maps verified credentials to an application identity.
pub trait PrincipalResolver: Send + Sync {
    fn resolve(&self, parts: &Parts, credentials: &Credentials)
        -> AuthResult<AuthenticatedPrincipal>;
}

/// Default identity mapping: the credential id becomes the username.
pub struct CredentialPrincipalResolver;

impl PrincipalResolver for CredentialPrincipalResolver {
    fn resolve(
        &self,
        _parts: &Parts,
        credentials: &Credentials,
    ) -> AuthResult<AuthenticatedPrincipal> {
        Ok(AuthenticatedPrincipal::new(&credentials.id))
    }
}

/// Orchestrates scheme detection, credential resolution, nonce-check
/// delegation, and error classification.
pub struct RequestAuthenticator {
    scheme: String,
    scheme_prefix: String,
    skip_auth: bool,
    scheme_mandatory: bool,
    timestamp_skew_secs: i64,
    credential_resolver: Arc<dyn CredentialResolver>,
    principal_resolver: Arc<dyn PrincipalResolver>,
    nonce_registry: Option<Arc<NonceRegistry>>,
}

impl RequestAuthenticator {
    /// Build an authenticator from settings, wiring the default
    /// credential table and identity mapping around the given store.
    pub fn new(settings: &HawkSettings, store: Arc<dyn NonceStore>) -> Self {
        let nonce_registry = settings
            .use_nonce_cache
            .then(|| Arc::new(NonceRegistry::new(store, settings.nonce_ttl())));
        Self {
            scheme: settings.scheme.clone(),
            scheme_prefix: format!("{} ", settings.scheme),
            skip_auth: settings.skip_auth,
            scheme_mandatory: settings.scheme_mandatory,
            timestamp_skew_secs: settings.message_expiration_seconds as i64,
            credential_resolver: Arc::new(StaticCredentialResolver::new(
                settings.credentials.clone(),
            )),
            principal_resolver: Arc::new(CredentialPrincipalResolver),
            nonce_registry,
        }
    }

    /// Replace the credential lookup.
    pub fn with_credential_resolver(mut self, resolver: Arc<dyn CredentialResolver>) -> Self {
        self.credential_resolver = resolver;
        self
    }

    /// Replace the identity mapping.
    pub fn with_principal_resolver(mut self, resolver: Arc<dyn PrincipalResolver>) -> Self {
        self.principal_resolver = resolver;
        self
    }

    /// Scheme keyword this authenticator recognizes.
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Whether an authorization header value targets this scheme.
    pub fn uses_scheme(&self, header_value: &str) -> bool {
        header_value.starts_with(&self.scheme_prefix)
    }

    /// Inspect the authorization header and verify the request MAC.
    pub fn authenticate(
        &self,
        parts: &Parts,
        body: &[u8],
        absolute_url: &str,
    ) -> AuthenticationOutcome {
        if self.skip_auth {
            tracing::warn!("MAC authentication disabled via configuration");
            return AuthenticationOutcome::Authenticated {
                principal: AuthenticatedPrincipal::default(),
                context: None,
            };
        }

        let header = match parts.headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) {
            Some(value) => value,
            None => {
                tracing::debug!("request did not send an authorization header");
                return AuthenticationOutcome::Skipped;
            }
        };

        if !self.uses_scheme(header) {
            if self.scheme_mandatory {
                return self.deny(AuthError::MissingScheme(self.scheme.clone()));
            }
            tracing::debug!(scheme = %self.scheme, "authorization header uses a foreign scheme");
            return AuthenticationOutcome::Skipped;
        }

        let content_type = parts
            .headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");

        let verified = Receiver::authenticate(
            self.credential_resolver.as_ref(),
            header,
            &self.scheme,
            absolute_url,
            parts.method.as_str(),
            body,
            content_type,
            self.nonce_registry
                .as_deref()
                .map(|registry| registry as &dyn SeenNonce),
            self.timestamp_skew_secs,
        );

        match verified {
            Ok(receiver) => match self.principal_resolver.resolve(parts, receiver.credentials()) {
                Ok(principal) => {
                    tracing::debug!(
                        credential_id = %receiver.credentials().id,
                        "request MAC verified"
                    );
                    AuthenticationOutcome::Authenticated {
                        principal,
                        context: Some(receiver),
                    }
                }
                Err(e) => self.deny(e),
            },
            Err(e) => self.deny(e),
        }
    }

    fn deny(&self, error: AuthError) -> AuthenticationOutcome {
        tracing::info!(
            kind = error.kind(),
            error = %error,
            "denying access"
        );
        AuthenticationOutcome::Denied(error)
    }
}
