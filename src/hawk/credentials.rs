//! Credential types and the lookup seam.

use std::collections::HashMap;

use serde::Deserialize;

use crate::error::{AuthError, AuthResult};

/// Digest algorithm tied to a credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    Sha256,
    Sha1,
}

/// Shared-secret credentials for one client.
///
/// Immutable once resolved; owned by the resolver and never cached
/// beyond the resolution call.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub id: String,
    pub key: String,
    pub algorithm: Algorithm,
}

/// Pure lookup from an opaque credential id to key material.
pub trait CredentialResolver: Send + Sync {
    fn resolve(&self, credential_id: &str) -> AuthResult<Credentials>;
}

/// Table-backed resolver over statically configured credentials.
pub struct StaticCredentialResolver {
    table: HashMap<String, Credentials>,
}

impl StaticCredentialResolver {
    pub fn new(configured: Vec<ConfiguredCredential>) -> Self {
        let table = configured
            .into_iter()
            .map(|c| {
                (
                    c.id.clone(),
                    Credentials {
                        id: c.id,
                        key: c.key,
                        algorithm: c.algorithm,
                    },
                )
            })
            .collect();
        Self { table }
    }
}

impl CredentialResolver for StaticCredentialResolver {
    fn resolve(&self, credential_id: &str) -> AuthResult<Credentials> {
        self.table
            .get(credential_id)
            .cloned()
            .ok_or_else(|| AuthError::CredentialsLookup(credential_id.to_string()))
    }
}

/// Credential entry from the config file.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfiguredCredential {
    /// Opaque id the client sends in the authorization header.
    pub id: String,
    /// Shared secret.
    pub key: String,
    /// Digest algorithm.
    pub algorithm: Algorithm,
}
