//! Canonicalization, payload hashing, and MAC computation.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::{Digest, Sha256};

use super::credentials::{Algorithm, Credentials};
use crate::error::{AuthError, AuthResult};

const HEADER_VERSION: &str = "hawk.1";

type HmacSha256 = Hmac<Sha256>;
type HmacSha1 = Hmac<Sha1>;

/// Which normalized string a MAC covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacKind {
    /// Inbound request signature.
    Header,
    /// Server response signature, bound to the request's ts and nonce.
    Response,
}

impl MacKind {
    fn label(self) -> &'static str {
        match self {
            MacKind::Header => "header",
            MacKind::Response => "response",
        }
    }
}

/// Request artifacts covered by a MAC.
#[derive(Debug, Clone)]
pub struct RequestArtifacts {
    pub method: String,
    pub host: String,
    pub port: u16,
    /// Path plus query string.
    pub resource: String,
    pub timestamp: i64,
    pub nonce: String,
    pub content_hash: Option<String>,
    pub ext: Option<String>,
}

/// Build the newline-delimited string a MAC is computed over.
///
/// Field order is part of the wire contract and must not change.
pub fn normalized_string(kind: MacKind, artifacts: &RequestArtifacts) -> String {
    let mut out = String::with_capacity(128);
    out.push_str(HEADER_VERSION);
    out.push('.');
    out.push_str(kind.label());
    out.push('\n');
    out.push_str(&artifacts.timestamp.to_string());
    out.push('\n');
    out.push_str(&artifacts.nonce);
    out.push('\n');
    out.push_str(&artifacts.method.to_uppercase());
    out.push('\n');
    out.push_str(&artifacts.resource);
    out.push('\n');
    out.push_str(&artifacts.host.to_lowercase());
    out.push('\n');
    out.push_str(&artifacts.port.to_string());
    out.push('\n');
    out.push_str(artifacts.content_hash.as_deref().unwrap_or(""));
    out.push('\n');
    out.push_str(artifacts.ext.as_deref().unwrap_or(""));
    out.push('\n');
    out
}

/// Hash the payload together with its declared media type.
///
/// Content-type parameters (charset and friends) are not covered.
pub fn payload_hash(algorithm: Algorithm, content_type: &str, content: &[u8]) -> String {
    let media_type = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_lowercase();
    let prefix = format!("{HEADER_VERSION}.payload\n{media_type}\n");
    match algorithm {
        Algorithm::Sha256 => {
            let mut digest = Sha256::new();
            digest.update(prefix.as_bytes());
            digest.update(content);
            digest.update(b"\n");
            BASE64.encode(digest.finalize())
        }
        Algorithm::Sha1 => {
            let mut digest = Sha1::new();
            digest.update(prefix.as_bytes());
            digest.update(content);
            digest.update(b"\n");
            BASE64.encode(digest.finalize())
        }
    }
}

/// Compute the base64 MAC over the normalized string.
pub fn calculate_mac(
    credentials: &Credentials,
    kind: MacKind,
    artifacts: &RequestArtifacts,
) -> AuthResult<String> {
    let message = normalized_string(kind, artifacts);
    let tag = match credentials.algorithm {
        Algorithm::Sha256 => {
            let mut mac = HmacSha256::new_from_slice(credentials.key.as_bytes())
                .map_err(|e| AuthError::Internal(format!("bad MAC key: {e}")))?;
            mac.update(message.as_bytes());
            mac.finalize().into_bytes().to_vec()
        }
        Algorithm::Sha1 => {
            let mut mac = HmacSha1::new_from_slice(credentials.key.as_bytes())
                .map_err(|e| AuthError::Internal(format!("bad MAC key: {e}")))?;
            mac.update(message.as_bytes());
            mac.finalize().into_bytes().to_vec()
        }
    };
    Ok(BASE64.encode(tag))
}

/// Check a received base64 MAC against the expected value in constant
/// time.
pub fn verify_mac(
    credentials: &Credentials,
    kind: MacKind,
    artifacts: &RequestArtifacts,
    provided: &str,
) -> AuthResult<()> {
    let provided = BASE64
        .decode(provided)
        .map_err(|_| AuthError::MacMismatch)?;
    let message = normalized_string(kind, artifacts);
    match credentials.algorithm {
        Algorithm::Sha256 => {
            let mut mac = HmacSha256::new_from_slice(credentials.key.as_bytes())
                .map_err(|e| AuthError::Internal(format!("bad MAC key: {e}")))?;
            mac.update(message.as_bytes());
            mac.verify_slice(&provided).map_err(|_| AuthError::MacMismatch)
        }
        Algorithm::Sha1 => {
            let mut mac = HmacSha1::new_from_slice(credentials.key.as_bytes())
                .map_err(|e| AuthError::Internal(format!("bad MAC key: {e}")))?;
            mac.update(message.as_bytes());
            mac.verify_slice(&provided).map_err(|_| AuthError::MacMismatch)
        }
    }
}

/// Length-guarded constant-time byte comparison for non-MAC digests.
pub(crate) fn fixed_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
