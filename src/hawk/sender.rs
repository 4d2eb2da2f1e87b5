//! Client-side request signing, used by the request CLI and tests.

use chrono::Utc;
use uuid::Uuid;

use super::credentials::Credentials;
use super::crypto::{self, MacKind, RequestArtifacts};
use super::header;
use super::split_url;
use crate::error::{AuthError, AuthResult};

/// Signs one request and verifies the server's signed reply.
#[derive(Debug, Clone)]
pub struct Sender {
    credentials: Credentials,
    scheme: String,
    artifacts: RequestArtifacts,
    request_header: String,
}

impl Sender {
    /// Sign a request with a fresh nonce and the current timestamp.
    pub fn new(
        credentials: Credentials,
        scheme: &str,
        url: &str,
        method: &str,
        content: &[u8],
        content_type: &str,
    ) -> AuthResult<Sender> {
        let mut nonce = Uuid::new_v4().simple().to_string();
        nonce.truncate(8);
        Self::signed_at(
            credentials,
            scheme,
            url,
            method,
            content,
            content_type,
            Utc::now().timestamp(),
            &nonce,
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn signed_at(
        credentials: Credentials,
        scheme: &str,
        url: &str,
        method: &str,
        content: &[u8],
        content_type: &str,
        timestamp: i64,
        nonce: &str,
    ) -> AuthResult<Sender> {
        let (host, port, resource) = split_url(url)?;
        let hash = crypto::payload_hash(credentials.algorithm, content_type, content);
        let artifacts = RequestArtifacts {
            method: method.to_uppercase(),
            host,
            port,
            resource,
            timestamp,
            nonce: nonce.to_string(),
            content_hash: Some(hash.clone()),
            ext: None,
        };
        let mac = crypto::calculate_mac(&credentials, MacKind::Header, &artifacts)?;
        let request_header = header::format_header(
            scheme,
            &[
                ("id", &credentials.id),
                ("ts", &timestamp.to_string()),
                ("nonce", nonce),
                ("hash", &hash),
                ("mac", &mac),
            ],
        )?;
        Ok(Sender {
            credentials,
            scheme: scheme.to_string(),
            artifacts,
            request_header,
        })
    }

    /// The `Authorization` header value for the signed request.
    pub fn request_header(&self) -> &str {
        &self.request_header
    }

    /// Verify a `Server-Authorization` header against this request.
    pub fn accept_response(
        &self,
        server_authorization: &str,
        content: &[u8],
        content_type: &str,
    ) -> AuthResult<()> {
        let attributes = header::parse_authorization(server_authorization, &self.scheme)?;
        let mac = attributes
            .mac
            .ok_or_else(|| AuthError::BadHeaderValue("missing mac attribute".to_string()))?;
        let hash = attributes
            .hash
            .ok_or_else(|| AuthError::BadHeaderValue("missing hash attribute".to_string()))?;

        let mut artifacts = self.artifacts.clone();
        artifacts.content_hash = Some(hash.clone());
        artifacts.ext = attributes.ext;
        crypto::verify_mac(&self.credentials, MacKind::Response, &artifacts, &mac)?;

        let expected = crypto::payload_hash(self.credentials.algorithm, content_type, content);
        if !crypto::fixed_time_eq(expected.as_bytes(), hash.as_bytes()) {
            return Err(AuthError::MisComputedContentHash);
        }
        Ok(())
    }
}
