//! Parsing and formatting of `Hawk`-style authorization headers.
//!
//! Grammar: `<Scheme> key="value", key="value", ...` with a fixed key
//! set. Anything outside the grammar is rejected before MAC work
//! begins.

use std::fmt::Write;

use crate::error::{AuthError, AuthResult};

/// Attribute keys a header may carry.
const ALLOWED_KEYS: &[&str] = &["id", "ts", "nonce", "hash", "ext", "mac", "app", "dlg"];

/// Parsed attributes of an authorization header.
#[derive(Debug, Clone, Default)]
pub struct HeaderAttributes {
    pub id: Option<String>,
    pub ts: Option<i64>,
    pub nonce: Option<String>,
    pub hash: Option<String>,
    pub ext: Option<String>,
    pub mac: Option<String>,
    pub app: Option<String>,
    pub dlg: Option<String>,
}

fn bad(detail: impl Into<String>) -> AuthError {
    AuthError::BadHeaderValue(detail.into())
}

/// Values may contain printable ASCII except the quote and backslash.
fn valid_value_char(c: char) -> bool {
    (c == ' ' || c.is_ascii_graphic()) && c != '"' && c != '\\'
}

/// Parse `<scheme> key="value", ...` into attributes.
///
/// The scheme keyword must match exactly. Unknown keys, duplicate keys,
/// unquoted values, and illegal characters are all rejected.
pub fn parse_authorization(value: &str, scheme: &str) -> AuthResult<HeaderAttributes> {
    let rest = value
        .strip_prefix(scheme)
        .ok_or_else(|| bad("scheme mismatch"))?;
    if !rest.starts_with(' ') {
        return Err(bad("missing attributes"));
    }

    let mut attributes = HeaderAttributes::default();
    let mut rest = rest.trim_start();
    while !rest.is_empty() {
        let eq = rest.find('=').ok_or_else(|| bad("attribute without '='"))?;
        let key = rest[..eq].trim();
        if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(bad(format!("illegal attribute key {key:?}")));
        }
        if !ALLOWED_KEYS.contains(&key) {
            return Err(bad(format!("unknown attribute key {key:?}")));
        }

        rest = &rest[eq + 1..];
        let stripped = rest
            .strip_prefix('"')
            .ok_or_else(|| bad("attribute value is not quoted"))?;
        let close = stripped
            .find('"')
            .ok_or_else(|| bad("unterminated attribute value"))?;
        let value = &stripped[..close];
        if !value.chars().all(valid_value_char) {
            return Err(bad(format!("illegal characters in {key} value")));
        }

        set_attribute(&mut attributes, key, value)?;

        rest = stripped[close + 1..].trim_start();
        if let Some(after_comma) = rest.strip_prefix(',') {
            rest = after_comma.trim_start();
            if rest.is_empty() {
                return Err(bad("trailing comma"));
            }
        } else if !rest.is_empty() {
            return Err(bad("attributes not comma-separated"));
        }
    }

    Ok(attributes)
}

fn set_attribute(attributes: &mut HeaderAttributes, key: &str, value: &str) -> AuthResult<()> {
    let slot = match key {
        "id" => &mut attributes.id,
        "nonce" => &mut attributes.nonce,
        "hash" => &mut attributes.hash,
        "ext" => &mut attributes.ext,
        "mac" => &mut attributes.mac,
        "app" => &mut attributes.app,
        "dlg" => &mut attributes.dlg,
        "ts" => {
            if attributes.ts.is_some() {
                return Err(bad("duplicate ts attribute"));
            }
            let ts = value
                .parse::<i64>()
                .map_err(|_| bad("ts is not an integer"))?;
            attributes.ts = Some(ts);
            return Ok(());
        }
        _ => unreachable!("key set checked by caller"),
    };
    if slot.is_some() {
        return Err(bad(format!("duplicate {key} attribute")));
    }
    *slot = Some(value.to_string());
    Ok(())
}

/// Format `<scheme> key="value", ...` from the given attribute pairs.
pub fn format_header(scheme: &str, attributes: &[(&str, &str)]) -> AuthResult<String> {
    let mut out = String::with_capacity(64);
    out.push_str(scheme);
    for (i, (key, value)) in attributes.iter().enumerate() {
        if !value.chars().all(valid_value_char) {
            return Err(AuthError::Internal(format!(
                "illegal characters in {key} attribute"
            )));
        }
        if i == 0 {
            out.push(' ');
        } else {
            out.push_str(", ");
        }
        // Infallible for String targets.
        let _ = write!(out, "{key}=\"{value}\"");
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = r#"Hawk id="u1", ts="1353832234", nonce="j4h3g2", mac="dGVzdA==""#;

    #[test]
    fn test_parse_valid_header() {
        let attrs = parse_authorization(HEADER, "Hawk").unwrap();
        assert_eq!(attrs.id.as_deref(), Some("u1"));
        assert_eq!(attrs.ts, Some(1353832234));
        assert_eq!(attrs.nonce.as_deref(), Some("j4h3g2"));
        assert_eq!(attrs.mac.as_deref(), Some("dGVzdA=="));
        assert!(attrs.hash.is_none());
        assert!(attrs.ext.is_none());
    }

    #[test]
    fn test_ext_may_contain_commas_and_spaces() {
        let header = r#"Hawk id="u1", ts="1", nonce="n", ext="a, b and c", mac="m""#;
        let attrs = parse_authorization(header, "Hawk").unwrap();
        assert_eq!(attrs.ext.as_deref(), Some("a, b and c"));
    }

    #[test]
    fn test_foreign_scheme_rejected() {
        let err = parse_authorization("Bearer abc", "Hawk").unwrap_err();
        assert!(matches!(err, AuthError::BadHeaderValue(_)));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let header = r#"Hawk id="u1", ts="1", nonce="n", mac="m", evil="x""#;
        assert!(parse_authorization(header, "Hawk").is_err());
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let header = r#"Hawk id="u1", id="u2", ts="1", nonce="n", mac="m""#;
        assert!(parse_authorization(header, "Hawk").is_err());
    }

    #[test]
    fn test_unquoted_value_rejected() {
        let header = r#"Hawk id=u1, ts="1", nonce="n", mac="m""#;
        assert!(parse_authorization(header, "Hawk").is_err());
    }

    #[test]
    fn test_non_numeric_ts_rejected() {
        let header = r#"Hawk id="u1", ts="soon", nonce="n", mac="m""#;
        assert!(parse_authorization(header, "Hawk").is_err());
    }

    #[test]
    fn test_format_then_parse_roundtrip() {
        let formatted = format_header(
            "Hawk",
            &[("id", "u1"), ("ts", "42"), ("nonce", "n1"), ("mac", "bWFj")],
        )
        .unwrap();
        let attrs = parse_authorization(&formatted, "Hawk").unwrap();
        assert_eq!(attrs.id.as_deref(), Some("u1"));
        assert_eq!(attrs.ts, Some(42));
        assert_eq!(attrs.nonce.as_deref(), Some("n1"));
        assert_eq!(attrs.mac.as_deref(), Some("bWFj"));
    }

    #[test]
    fn test_format_rejects_quote_in_value() {
        assert!(format_header("Hawk", &[("ext", "a\"b")]).is_err());
    }
}
