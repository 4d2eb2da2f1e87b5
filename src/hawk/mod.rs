//! Shared-secret MAC signing and verification for HTTP exchanges.
//!
//! Implements the `Hawk` header scheme: a keyed digest over the
//! canonicalized request (timestamp, nonce, method, resource, host,
//! port, payload hash) plus the matching response signature. The
//! request-handling core consumes this module through [`Receiver`] and
//! the callback traits it accepts; clients and tests sign with
//! [`Sender`].

mod credentials;
mod crypto;
mod header;
mod receiver;
mod sender;

pub use credentials::*;
pub use crypto::*;
pub use header::*;
pub use receiver::*;
pub use sender::*;

use crate::error::{AuthError, AuthResult};

/// Split an absolute URL into the (host, port, resource) triple covered
/// by the MAC. The resource is the path plus any query string.
pub(crate) fn split_url(url: &str) -> AuthResult<(String, u16, String)> {
    let parsed = url::Url::parse(url)
        .map_err(|e| AuthError::Internal(format!("invalid request URL {url}: {e}")))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| AuthError::Internal(format!("request URL {url} has no host")))?
        .to_string();
    let port = parsed
        .port_or_known_default()
        .ok_or_else(|| AuthError::Internal(format!("request URL {url} has no port")))?;
    let mut resource = parsed.path().to_string();
    if let Some(query) = parsed.query() {
        resource.push('?');
        resource.push_str(query);
    }
    Ok((host, port, resource))
}

#[cfg(test)]
mod tests {
    use super::split_url;

    #[test]
    fn test_split_url_with_query() {
        let (host, port, resource) = split_url("http://example.com:8000/resource/1?b=1&a=2").unwrap();
        assert_eq!(host, "example.com");
        assert_eq!(port, 8000);
        assert_eq!(resource, "/resource/1?b=1&a=2");
    }

    #[test]
    fn test_split_url_default_ports() {
        assert_eq!(split_url("http://example.com/").unwrap().1, 80);
        assert_eq!(split_url("https://example.com/").unwrap().1, 443);
    }
}
