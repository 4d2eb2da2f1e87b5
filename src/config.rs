//! Configuration module for Hawkgate.
//!
//! Loads configuration from YAML files and environment variables.

use std::time::Duration;

use config::{Config as ConfigLoader, ConfigError, Environment, File};
use serde::Deserialize;

use crate::hawk::ConfiguredCredential;

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub hawk: HawkSettings,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// MAC authentication settings.
#[derive(Debug, Clone, Deserialize)]
pub struct HawkSettings {
    /// Accept every request without verification. Test/bench only;
    /// unsafe for production.
    #[serde(default)]
    pub skip_auth: bool,
    /// Scheme keyword expected in the authorization header.
    #[serde(default = "default_scheme")]
    pub scheme: String,
    /// Deny requests whose authorization header uses another scheme
    /// instead of passing them down the chain.
    #[serde(default = "default_true")]
    pub scheme_mandatory: bool,
    /// Consult the nonce cache for replay detection.
    #[serde(default = "default_true")]
    pub use_nonce_cache: bool,
    /// Allowed clock drift between signer and verifier, in seconds.
    /// Messages older than this are rejected.
    #[serde(default = "default_message_expiration")]
    pub message_expiration_seconds: u64,
    /// Extra seconds a nonce entry outlives its message in the cache.
    #[serde(default = "default_nonce_padding")]
    pub nonce_ttl_padding_seconds: u64,
    /// Override for the nonce entry lifetime. Defaults to
    /// `message_expiration_seconds + nonce_ttl_padding_seconds`.
    #[serde(default)]
    pub nonce_ttl_seconds: Option<u64>,
    /// Statically configured client credentials.
    #[serde(default)]
    pub credentials: Vec<ConfiguredCredential>,
}

fn default_scheme() -> String {
    "Hawk".to_string()
}

fn default_true() -> bool {
    true
}

fn default_message_expiration() -> u64 {
    60
}

fn default_nonce_padding() -> u64 {
    5
}

impl Default for HawkSettings {
    fn default() -> Self {
        Self {
            skip_auth: false,
            scheme: default_scheme(),
            scheme_mandatory: true,
            use_nonce_cache: true,
            message_expiration_seconds: default_message_expiration(),
            nonce_ttl_padding_seconds: default_nonce_padding(),
            nonce_ttl_seconds: None,
            credentials: Vec::new(),
        }
    }
}

impl HawkSettings {
    /// Lifetime of a recorded nonce entry.
    pub fn nonce_ttl(&self) -> Duration {
        Duration::from_secs(
            self.nonce_ttl_seconds
                .unwrap_or(self.message_expiration_seconds + self.nonce_ttl_padding_seconds),
        )
    }

    /// Reject configurations where a nonce entry could expire while its
    /// message is still within skew, which would let a true replay
    /// through.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let floor = self.message_expiration_seconds + self.nonce_ttl_padding_seconds;
        if self.nonce_ttl().as_secs() < floor {
            return Err(ConfigError::Message(format!(
                "nonce_ttl_seconds must be at least message_expiration_seconds \
                 + nonce_ttl_padding_seconds ({floor}s)"
            )));
        }
        if self.scheme.is_empty() || self.scheme.contains(char::is_whitespace) {
            return Err(ConfigError::Message(
                "scheme must be a single non-empty keyword".to_string(),
            ));
        }
        Ok(())
    }
}

impl Config {
    /// Load configuration from files and environment.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (HAWKGATE_*)
    /// 2. config/local.yaml (if exists)
    /// 3. config/default.yaml
    pub fn load() -> Result<Self, ConfigError> {
        let config = ConfigLoader::builder()
            // Start with default config
            .add_source(File::with_name("config/default").required(false))
            // Layer on local overrides
            .add_source(File::with_name("config/local").required(false))
            // Layer on environment variables with HAWKGATE_ prefix
            .add_source(
                Environment::with_prefix("HAWKGATE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.hawk.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_hawk_settings() {
        let settings = HawkSettings::default();
        assert!(!settings.skip_auth);
        assert_eq!(settings.scheme, "Hawk");
        assert!(settings.scheme_mandatory);
        assert!(settings.use_nonce_cache);
        assert_eq!(settings.message_expiration_seconds, 60);
        assert_eq!(settings.nonce_ttl(), Duration::from_secs(65));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_short_nonce_ttl_rejected() {
        let settings = HawkSettings {
            nonce_ttl_seconds: Some(30),
            ..HawkSettings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_explicit_nonce_ttl_accepted() {
        let settings = HawkSettings {
            nonce_ttl_seconds: Some(120),
            ..HawkSettings::default()
        };
        assert!(settings.validate().is_ok());
        assert_eq!(settings.nonce_ttl(), Duration::from_secs(120));
    }
}
