//! Minimal authenticated identity handed to request handlers.

use crate::error::{AuthError, AuthResult};

/// Identity attached to a request after MAC verification.
///
/// Exactly one instance exists per authenticated request; it is never
/// persisted.
#[derive(Debug, Clone)]
pub struct AuthenticatedPrincipal {
    username: String,
    active: bool,
}

impl AuthenticatedPrincipal {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            active: true,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn display_name(&self) -> &str {
        &self.username
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Always true; an instance only exists after verification.
    pub fn is_authenticated(&self) -> bool {
        true
    }

    /// MAC clients carry no password.
    pub fn has_usable_password(&self) -> bool {
        false
    }

    /// Credential mutation must fail loudly rather than silently no-op.
    pub fn set_password(&mut self, _password: &str) -> AuthResult<()> {
        Err(AuthError::Internal(
            "MAC-authenticated principals have no password to set".to_string(),
        ))
    }
}

impl Default for AuthenticatedPrincipal {
    /// Placeholder identity used when verification is disabled.
    fn default() -> Self {
        Self::new("anonymous")
    }
}
