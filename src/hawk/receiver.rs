//! Server-side verification of signed requests and signing of the
//! matching responses.

use chrono::Utc;

use super::credentials::{CredentialResolver, Credentials};
use super::crypto::{self, MacKind, RequestArtifacts};
use super::header;
use super::split_url;
use crate::error::{AuthError, AuthResult};

/// Replay check invoked after MAC verification.
///
/// Implementations must treat the existence check and the record as a
/// single atomic state transition; a separate exists-then-set opens a
/// race window for a true replay.
pub trait SeenNonce: Send + Sync {
    /// Returns `true` when (credential id, nonce, timestamp) was already
    /// used within its validity window, recording it otherwise.
    fn seen_and_record(&self, credential_id: &str, nonce: &str, timestamp: i64) -> bool;
}

/// Verification context kept from a verified request.
///
/// Holds the resolved credentials and the request artifacts, which are
/// both needed to sign the response. Cloning is cheap and signing the
/// same response twice is safe.
#[derive(Debug, Clone)]
pub struct Receiver {
    credentials: Credentials,
    scheme: String,
    artifacts: RequestArtifacts,
}

impl Receiver {
    /// Verify an inbound request.
    ///
    /// Order of checks: header grammar, credential resolution, request
    /// MAC, payload hash, timestamp skew, replay. The nonce cache is
    /// consulted last so only MAC-valid requests can populate it.
    #[allow(clippy::too_many_arguments)]
    pub fn authenticate(
        resolver: &dyn CredentialResolver,
        authorization: &str,
        scheme: &str,
        url: &str,
        method: &str,
        content: &[u8],
        content_type: &str,
        seen_nonce: Option<&dyn SeenNonce>,
        timestamp_skew_secs: i64,
    ) -> AuthResult<Receiver> {
        Self::authenticate_at(
            resolver,
            authorization,
            scheme,
            url,
            method,
            content,
            content_type,
            seen_nonce,
            timestamp_skew_secs,
            Utc::now().timestamp(),
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn authenticate_at(
        resolver: &dyn CredentialResolver,
        authorization: &str,
        scheme: &str,
        url: &str,
        method: &str,
        content: &[u8],
        content_type: &str,
        seen_nonce: Option<&dyn SeenNonce>,
        timestamp_skew_secs: i64,
        now: i64,
    ) -> AuthResult<Receiver> {
        let attributes = header::parse_authorization(authorization, scheme)?;
        let id = attributes
            .id
            .ok_or_else(|| AuthError::BadHeaderValue("missing id attribute".to_string()))?;
        let timestamp = attributes
            .ts
            .ok_or_else(|| AuthError::BadHeaderValue("missing ts attribute".to_string()))?;
        let nonce = attributes
            .nonce
            .ok_or_else(|| AuthError::BadHeaderValue("missing nonce attribute".to_string()))?;
        let mac = attributes
            .mac
            .ok_or_else(|| AuthError::BadHeaderValue("missing mac attribute".to_string()))?;

        let credentials = resolver.resolve(&id)?;

        let (host, port, resource) = split_url(url)?;
        let artifacts = RequestArtifacts {
            method: method.to_uppercase(),
            host,
            port,
            resource,
            timestamp,
            nonce,
            content_hash: attributes.hash,
            ext: attributes.ext,
        };

        crypto::verify_mac(&credentials, MacKind::Header, &artifacts, &mac)?;

        // The MAC covers the declared hash, not the payload itself.
        verify_content(&credentials, artifacts.content_hash.as_deref(), content, content_type)?;

        if (now - artifacts.timestamp).abs() > timestamp_skew_secs {
            return Err(AuthError::TokenExpired);
        }

        if let Some(cache) = seen_nonce {
            if cache.seen_and_record(&credentials.id, &artifacts.nonce, artifacts.timestamp) {
                return Err(AuthError::AlreadyProcessed);
            }
        }

        Ok(Receiver {
            credentials,
            scheme: scheme.to_string(),
            artifacts,
        })
    }

    /// Credentials the request was verified against.
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Sign an outgoing response so the client can verify server
    /// identity. Returns the `Server-Authorization` header value.
    pub fn respond(&self, content: &[u8], content_type: &str) -> AuthResult<String> {
        let hash = crypto::payload_hash(self.credentials.algorithm, content_type, content);
        let mut artifacts = self.artifacts.clone();
        artifacts.content_hash = Some(hash.clone());
        artifacts.ext = None;
        let mac = crypto::calculate_mac(&self.credentials, MacKind::Response, &artifacts)?;
        header::format_header(&self.scheme, &[("mac", &mac), ("hash", &hash)])
    }
}

fn verify_content(
    credentials: &Credentials,
    declared_hash: Option<&str>,
    content: &[u8],
    content_type: &str,
) -> AuthResult<()> {
    match declared_hash {
        Some(declared) => {
            let expected = crypto::payload_hash(credentials.algorithm, content_type, content);
            if !crypto::fixed_time_eq(expected.as_bytes(), declared.as_bytes()) {
                return Err(AuthError::MisComputedContentHash);
            }
            Ok(())
        }
        // A payload that arrived unhashed was never covered by the MAC.
        None if content.is_empty() => Ok(()),
        None => Err(AuthError::MisComputedContentHash),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Mutex;

    use super::super::credentials::{Algorithm, ConfiguredCredential, StaticCredentialResolver};
    use super::super::sender::Sender;
    use super::*;

    const URL: &str = "http://testserver/";
    const SKEW: i64 = 60;

    fn resolver() -> StaticCredentialResolver {
        StaticCredentialResolver::new(vec![ConfiguredCredential {
            id: "u1".to_string(),
            key: "secret".to_string(),
            algorithm: Algorithm::Sha256,
        }])
    }

    fn credentials() -> Credentials {
        resolver().resolve("u1").unwrap()
    }

    /// Remembers every triple it is asked about.
    #[derive(Default)]
    struct RememberAll(Mutex<HashSet<String>>);

    impl SeenNonce for RememberAll {
        fn seen_and_record(&self, credential_id: &str, nonce: &str, timestamp: i64) -> bool {
            !self
                .0
                .lock()
                .unwrap()
                .insert(format!("{credential_id}:{nonce}:{timestamp}"))
        }
    }

    fn authenticate(header: &str, content: &[u8], content_type: &str) -> AuthResult<Receiver> {
        Receiver::authenticate(
            &resolver(),
            header,
            "Hawk",
            URL,
            if content.is_empty() { "GET" } else { "POST" },
            content,
            content_type,
            None,
            SKEW,
        )
    }

    #[test]
    fn test_valid_get_verifies() {
        let sender = Sender::new(credentials(), "Hawk", URL, "GET", b"", "text/plain").unwrap();
        let receiver = authenticate(sender.request_header(), b"", "text/plain").unwrap();
        assert_eq!(receiver.credentials().id, "u1");
    }

    #[test]
    fn test_valid_post_verifies() {
        let body = b"one=1&two=2&three=3";
        let content_type = "application/x-www-form-urlencoded";
        let sender = Sender::new(credentials(), "Hawk", URL, "POST", body, content_type).unwrap();
        authenticate(sender.request_header(), body, content_type).unwrap();
    }

    #[test]
    fn test_tampered_body_is_denied() {
        let content_type = "application/x-www-form-urlencoded";
        let sender =
            Sender::new(credentials(), "Hawk", URL, "POST", b"one=1", content_type).unwrap();
        let err = authenticate(sender.request_header(), b"one=1&TAMPERED_WITH=true", content_type)
            .unwrap_err();
        assert!(matches!(err, AuthError::MisComputedContentHash));
    }

    #[test]
    fn test_wrong_url_is_denied() {
        let sender = Sender::new(
            credentials(),
            "Hawk",
            "http://realsite.com/",
            "GET",
            b"",
            "text/plain",
        )
        .unwrap();
        let err = authenticate(sender.request_header(), b"", "text/plain").unwrap_err();
        assert!(matches!(err, AuthError::MacMismatch));
    }

    #[test]
    fn test_unknown_credential_id_is_denied() {
        let wrong = Credentials {
            id: "not-a-valid-id".to_string(),
            key: "not really".to_string(),
            algorithm: Algorithm::Sha256,
        };
        let sender = Sender::new(wrong, "Hawk", URL, "GET", b"", "text/plain").unwrap();
        let err = authenticate(sender.request_header(), b"", "text/plain").unwrap_err();
        assert!(matches!(err, AuthError::CredentialsLookup(_)));
    }

    #[test]
    fn test_extra_unknown_attribute_is_denied() {
        let sender = Sender::new(credentials(), "Hawk", URL, "GET", b"", "text/plain").unwrap();
        let header = format!("{}, evil=\"x\"", sender.request_header());
        let err = authenticate(&header, b"", "text/plain").unwrap_err();
        assert!(matches!(err, AuthError::BadHeaderValue(_)));
    }

    #[test]
    fn test_stale_timestamp_is_denied() {
        let now = Utc::now().timestamp();
        let sender = Sender::signed_at(
            credentials(),
            "Hawk",
            URL,
            "GET",
            b"",
            "text/plain",
            now - 1000,
            "j4h3g2",
        )
        .unwrap();
        let err = Receiver::authenticate_at(
            &resolver(),
            sender.request_header(),
            "Hawk",
            URL,
            "GET",
            b"",
            "text/plain",
            None,
            SKEW,
            now,
        )
        .unwrap_err();
        assert!(matches!(err, AuthError::TokenExpired));
    }

    #[test]
    fn test_replayed_header_is_denied() {
        let cache = RememberAll::default();
        let sender = Sender::new(credentials(), "Hawk", URL, "GET", b"", "text/plain").unwrap();
        let run = |cache: &RememberAll| {
            Receiver::authenticate(
                &resolver(),
                sender.request_header(),
                "Hawk",
                URL,
                "GET",
                b"",
                "text/plain",
                Some(cache),
                SKEW,
            )
        };
        run(&cache).unwrap();
        let err = run(&cache).unwrap_err();
        assert!(matches!(err, AuthError::AlreadyProcessed));
    }

    #[test]
    fn test_invalid_mac_does_not_populate_the_cache() {
        let cache = RememberAll::default();
        // A wrong-key request fails before the nonce check.
        let mut other = credentials();
        other.key = "wrong".to_string();
        let bad_sender = Sender::new(other, "Hawk", URL, "GET", b"", "text/plain").unwrap();
        let err = Receiver::authenticate(
            &resolver(),
            bad_sender.request_header(),
            "Hawk",
            URL,
            "GET",
            b"",
            "text/plain",
            Some(&cache),
            SKEW,
        )
        .unwrap_err();
        assert!(matches!(err, AuthError::MacMismatch));
        assert!(cache.0.lock().unwrap().is_empty());
    }

    #[test]
    fn test_response_roundtrip() {
        let sender = Sender::new(credentials(), "Hawk", URL, "GET", b"", "text/plain").unwrap();
        let receiver = authenticate(sender.request_header(), b"", "text/plain").unwrap();

        let body = br#"{"ok":true}"#;
        let header = receiver.respond(body, "application/json").unwrap();
        sender
            .accept_response(&header, body, "application/json")
            .unwrap();
    }

    #[test]
    fn test_mutated_response_body_fails_verification() {
        let sender = Sender::new(credentials(), "Hawk", URL, "GET", b"", "text/plain").unwrap();
        let receiver = authenticate(sender.request_header(), b"", "text/plain").unwrap();

        let header = receiver.respond(b"genuine", "text/plain").unwrap();
        let err = sender
            .accept_response(&header, b"forged", "text/plain")
            .unwrap_err();
        assert!(matches!(err, AuthError::MisComputedContentHash));
    }

    #[test]
    fn test_mutated_response_content_type_fails_verification() {
        let sender = Sender::new(credentials(), "Hawk", URL, "GET", b"", "text/plain").unwrap();
        let receiver = authenticate(sender.request_header(), b"", "text/plain").unwrap();

        let header = receiver.respond(b"genuine", "text/plain").unwrap();
        assert!(sender
            .accept_response(&header, b"genuine", "application/json")
            .is_err());
    }
}
