//! Environment-driven configuration.
//!
//! Every setting is read from a `SHIPQUOTE_*` variable. Numeric settings fall
//! back to defaults when unset and fail loudly when set to garbage.

use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_UPS_BASE_URL: &str = "https://onlinetools.ups.com";

const CACHE_TTL_SECS: &str = "SHIPQUOTE_CACHE_TTL_SECS";
const TOKEN_BUFFER_SECS: &str = "SHIPQUOTE_TOKEN_BUFFER_SECS";
const HTTP_TIMEOUT_MS: &str = "SHIPQUOTE_HTTP_TIMEOUT_MS";
const UPS_CLIENT_ID: &str = "SHIPQUOTE_UPS_CLIENT_ID";
const UPS_CLIENT_SECRET: &str = "SHIPQUOTE_UPS_CLIENT_SECRET";
const UPS_ACCOUNT_NUMBER: &str = "SHIPQUOTE_UPS_ACCOUNT_NUMBER";
const UPS_BASE_URL: &str = "SHIPQUOTE_UPS_BASE_URL";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("environment variable {key} is required")]
    Missing { key: &'static str },
    #[error("environment variable {key}='{value}' is invalid: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// UPS OAuth client credentials and endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct UpsSettings {
    pub client_id: String,
    pub client_secret: String,
    pub account_number: Option<String>,
    pub base_url: String,
}

impl std::fmt::Debug for UpsSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpsSettings")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("account_number", &self.account_number)
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShipquoteConfig {
    pub cache_ttl: Duration,
    pub token_refresh_buffer: Duration,
    pub http_timeout: Duration,
    /// `None` when no UPS client id is configured.
    pub ups: Option<UpsSettings>,
}

impl Default for ShipquoteConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(300),
            token_refresh_buffer: Duration::from_secs(60),
            http_timeout: Duration::from_millis(10_000),
            ups: None,
        }
    }
}

impl ShipquoteConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let cache_ttl = match read(CACHE_TTL_SECS) {
            Some(raw) => Duration::from_secs(parse_u64(CACHE_TTL_SECS, &raw)?),
            None => defaults.cache_ttl,
        };
        let token_refresh_buffer = match read(TOKEN_BUFFER_SECS) {
            Some(raw) => Duration::from_secs(parse_u64(TOKEN_BUFFER_SECS, &raw)?),
            None => defaults.token_refresh_buffer,
        };
        let http_timeout = match read(HTTP_TIMEOUT_MS) {
            Some(raw) => {
                let millis = parse_u64(HTTP_TIMEOUT_MS, &raw)?;
                if millis == 0 {
                    return Err(ConfigError::InvalidValue {
                        key: HTTP_TIMEOUT_MS,
                        value: raw,
                        reason: String::from("timeout must be greater than zero"),
                    });
                }
                Duration::from_millis(millis)
            }
            None => defaults.http_timeout,
        };

        let ups = match read(UPS_CLIENT_ID) {
            Some(client_id) => Some(UpsSettings {
                client_id,
                client_secret: read(UPS_CLIENT_SECRET).ok_or(ConfigError::Missing {
                    key: UPS_CLIENT_SECRET,
                })?,
                account_number: read(UPS_ACCOUNT_NUMBER),
                base_url: read(UPS_BASE_URL)
                    .map(|url| url.trim_end_matches('/').to_owned())
                    .unwrap_or_else(|| DEFAULT_UPS_BASE_URL.to_owned()),
            }),
            None => None,
        };

        Ok(Self {
            cache_ttl,
            token_refresh_buffer,
            http_timeout,
            ups,
        })
    }

    /// UPS settings, or the missing-variable error when the carrier is wanted but unconfigured.
    pub fn require_ups(&self) -> Result<&UpsSettings, ConfigError> {
        self.ups
            .as_ref()
            .ok_or(ConfigError::Missing { key: UPS_CLIENT_ID })
    }
}

fn parse_u64(key: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.parse::<u64>().map_err(|error| ConfigError::InvalidValue {
        key,
        value: raw.to_owned(),
        reason: error.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<ShipquoteConfig, ConfigError> {
        let vars = pairs
            .iter()
            .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
            .collect::<HashMap<_, _>>();
        ShipquoteConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = config(&[]).expect("defaults are valid");

        assert_eq!(config, ShipquoteConfig::default());
        assert!(matches!(
            config.require_ups(),
            Err(ConfigError::Missing {
                key: "SHIPQUOTE_UPS_CLIENT_ID"
            })
        ));
    }

    #[test]
    fn reads_numeric_overrides() {
        let config = config(&[
            ("SHIPQUOTE_CACHE_TTL_SECS", "30"),
            ("SHIPQUOTE_TOKEN_BUFFER_SECS", " 120 "),
            ("SHIPQUOTE_HTTP_TIMEOUT_MS", "2500"),
        ])
        .expect("valid overrides");

        assert_eq!(config.cache_ttl, Duration::from_secs(30));
        assert_eq!(config.token_refresh_buffer, Duration::from_secs(120));
        assert_eq!(config.http_timeout, Duration::from_millis(2500));
    }

    #[test]
    fn rejects_invalid_numbers() {
        let error = config(&[("SHIPQUOTE_CACHE_TTL_SECS", "five")]).expect_err("not a number");
        assert!(matches!(
            error,
            ConfigError::InvalidValue {
                key: "SHIPQUOTE_CACHE_TTL_SECS",
                ..
            }
        ));

        let error = config(&[("SHIPQUOTE_HTTP_TIMEOUT_MS", "0")]).expect_err("zero timeout");
        assert!(matches!(error, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn ups_client_id_requires_secret() {
        let error = config(&[("SHIPQUOTE_UPS_CLIENT_ID", "abc")]).expect_err("secret missing");
        assert_eq!(
            error,
            ConfigError::Missing {
                key: "SHIPQUOTE_UPS_CLIENT_SECRET"
            }
        );

        let config = config(&[
            ("SHIPQUOTE_UPS_CLIENT_ID", "abc"),
            ("SHIPQUOTE_UPS_CLIENT_SECRET", "shh"),
            ("SHIPQUOTE_UPS_BASE_URL", "https://wwwcie.ups.com/"),
        ])
        .expect("complete ups settings");
        let ups = config.require_ups().expect("ups configured");
        assert_eq!(ups.base_url, "https://wwwcie.ups.com");
        assert_eq!(ups.account_number, None);
        assert!(!format!("{ups:?}").contains("shh"));
    }
}
