//! Provider configuration.
//!
//! Credentials and endpoint are resolved once, when the engine calls
//! `configure`, from the provider block with the environment as fallback:
//!
//! | Key | Environment variable | Required |
//! |---|---|---|
//! | `access_key` | `CBC_ACCESS_KEY` | yes |
//! | `secret_key` | `CBC_SECRET_KEY` | yes |
//! | `api_url` | `CBC_API_URL` | no |

use std::fmt;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{ProviderError, ProviderResult};
use crate::schema::{Attribute, Block, NestedBlock, Schema, Validator};

/// Public Capella control-plane endpoint.
pub const DEFAULT_API_URL: &str = "https://cloudapi.cloud.couchbase.com";

/// Environment variable holding the API access key.
pub const ENV_ACCESS_KEY: &str = "CBC_ACCESS_KEY";
/// Environment variable holding the API secret key.
pub const ENV_SECRET_KEY: &str = "CBC_SECRET_KEY";
/// Environment variable overriding the API base URL.
pub const ENV_API_URL: &str = "CBC_API_URL";

/// Resolved provider configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// API access key.
    pub access_key: String,
    /// API secret key. Never logged.
    pub secret_key: String,
    /// API base URL without a trailing slash.
    pub api_url: String,
    /// Provider-wide poll timing overrides.
    pub poll: PollConfig,
}

/// Optional poll timing overrides, in seconds.
///
/// When set they replace the initial delay and the interval of every status
/// poll. Per-resource timeouts are configured on the resource itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct PollConfig {
    /// Wait before the first status check.
    #[serde(default)]
    pub delay: Option<u64>,
    /// Wait between status checks.
    #[serde(default)]
    pub interval: Option<u64>,
}

impl PollConfig {
    /// Delay override as a duration.
    pub fn delay(&self) -> Option<Duration> {
        self.delay.map(Duration::from_secs)
    }

    /// Interval override as a duration.
    pub fn interval(&self) -> Option<Duration> {
        self.interval.map(Duration::from_secs)
    }
}

/// The provider block as written by the user; every field may be omitted.
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    access_key: Option<String>,
    #[serde(default)]
    secret_key: Option<String>,
    #[serde(default)]
    api_url: Option<String>,
    #[serde(default)]
    poll: Option<PollConfig>,
}

impl ProviderConfig {
    /// Build a configuration from explicit credentials and the default URL.
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            api_url: DEFAULT_API_URL.to_string(),
            poll: PollConfig::default(),
        }
    }

    /// Point the configuration at another API endpoint.
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = normalize_url(api_url.into());
        self
    }

    /// Set poll timing overrides.
    pub fn with_poll(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    /// Read the configuration from `CBC_ACCESS_KEY`, `CBC_SECRET_KEY` and `CBC_API_URL`.
    pub fn from_env() -> ProviderResult<Self> {
        Self::from_value_with_env(&serde_json::Value::Null, |key| std::env::var(key).ok())
    }

    /// Read the configuration from a provider block, falling back to the
    /// environment for anything it omits.
    pub fn from_value(value: &serde_json::Value) -> ProviderResult<Self> {
        Self::from_value_with_env(value, |key| std::env::var(key).ok())
    }

    /// Like [`ProviderConfig::from_value`] with an explicit environment lookup.
    pub fn from_value_with_env<F>(value: &serde_json::Value, env: F) -> ProviderResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw: RawConfig = if value.is_null() {
            RawConfig::default()
        } else {
            serde_json::from_value(value.clone())
                .map_err(|e| ProviderError::Configuration(e.to_string()))?
        };
        Self::resolve(raw, env)
    }

    fn resolve<F>(raw: RawConfig, env: F) -> ProviderResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let pick = |explicit: Option<String>, var: &str| {
            explicit
                .filter(|v| !v.is_empty())
                .or_else(|| env(var).filter(|v| !v.is_empty()))
        };

        let access_key = pick(raw.access_key, ENV_ACCESS_KEY).ok_or_else(|| {
            ProviderError::Configuration(format!(
                "access_key is required: set it in the provider block or {}",
                ENV_ACCESS_KEY
            ))
        })?;
        let secret_key = pick(raw.secret_key, ENV_SECRET_KEY).ok_or_else(|| {
            ProviderError::Configuration(format!(
                "secret_key is required: set it in the provider block or {}",
                ENV_SECRET_KEY
            ))
        })?;
        let api_url = pick(raw.api_url, ENV_API_URL).unwrap_or_else(|| DEFAULT_API_URL.to_string());

        if !api_url.starts_with("http://") && !api_url.starts_with("https://") {
            return Err(ProviderError::Configuration(format!(
                "api_url must be an http(s) URL, got '{}'",
                api_url
            )));
        }

        Ok(Self {
            access_key,
            secret_key,
            api_url: normalize_url(api_url),
            poll: raw.poll.unwrap_or_default(),
        })
    }

    /// Schema of the provider block.
    pub fn schema() -> Schema {
        Schema::v0()
            .with_description("Couchbase Capella control-plane credentials")
            .with_attribute(
                "access_key",
                Attribute::optional_string()
                    .with_description(format!("Capella API access key. Defaults to {}", ENV_ACCESS_KEY)),
            )
            .with_attribute(
                "secret_key",
                Attribute::optional_string()
                    .with_description(format!("Capella API secret key. Defaults to {}", ENV_SECRET_KEY))
                    .sensitive(),
            )
            .with_attribute(
                "api_url",
                Attribute::optional_string().with_description(format!(
                    "Capella API base URL. Defaults to {} or {}",
                    ENV_API_URL, DEFAULT_API_URL
                )),
            )
            .with_block(
                "poll",
                NestedBlock::single(
                    Block::new()
                        .with_description("Status poll timing overrides, in seconds")
                        .with_attribute(
                            "delay",
                            Attribute::optional_int64()
                                .with_validator(Validator::int_range(0, 3600)),
                        )
                        .with_attribute(
                            "interval",
                            Attribute::optional_int64()
                                .with_validator(Validator::int_range(1, 3600)),
                        ),
                ),
            )
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("poll", &self.poll)
            .finish()
    }
}

fn normalize_url(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_from_value_explicit() {
        let config = ProviderConfig::from_value_with_env(
            &json!({"access_key": "ak", "secret_key": "sk"}),
            no_env,
        )
        .unwrap();

        assert_eq!(config.access_key, "ak");
        assert_eq!(config.secret_key, "sk");
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.poll, PollConfig::default());
    }

    #[test]
    fn test_from_value_env_fallback() {
        let env = |key: &str| match key {
            ENV_ACCESS_KEY => Some("env-ak".to_string()),
            ENV_SECRET_KEY => Some("env-sk".to_string()),
            ENV_API_URL => Some("http://localhost:8080/".to_string()),
            _ => None,
        };

        let config = ProviderConfig::from_value_with_env(&json!({"access_key": "ak"}), env).unwrap();
        assert_eq!(config.access_key, "ak");
        assert_eq!(config.secret_key, "env-sk");
        assert_eq!(config.api_url, "http://localhost:8080");

        let config = ProviderConfig::from_value_with_env(&serde_json::Value::Null, env).unwrap();
        assert_eq!(config.access_key, "env-ak");
    }

    #[test]
    fn test_environment_only() {
        let env = |key: &str| match key {
            ENV_ACCESS_KEY => Some("env-ak".to_string()),
            ENV_SECRET_KEY => Some("env-sk".to_string()),
            _ => None,
        };
        let config = ProviderConfig::from_value_with_env(&serde_json::Value::Null, env).unwrap();
        assert_eq!(config.access_key, "env-ak");
        assert_eq!(config.secret_key, "env-sk");
        assert_eq!(config.api_url, DEFAULT_API_URL);

        let only_access = |key: &str| (key == ENV_ACCESS_KEY).then(|| "env-ak".to_string());
        let err = ProviderConfig::from_value_with_env(&serde_json::Value::Null, only_access)
            .unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
    }

    #[test]
    fn test_missing_credentials() {
        let err = ProviderConfig::from_value_with_env(&json!({"access_key": "ak"}), no_env)
            .unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
        assert!(err.message().contains(ENV_SECRET_KEY));

        // Empty strings count as missing
        let err = ProviderConfig::from_value_with_env(
            &json!({"access_key": "", "secret_key": "sk"}),
            no_env,
        )
        .unwrap_err();
        assert!(err.message().contains("access_key"));
    }

    #[test]
    fn test_invalid_url() {
        let err = ProviderConfig::from_value_with_env(
            &json!({"access_key": "ak", "secret_key": "sk", "api_url": "ftp://x"}),
            no_env,
        )
        .unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
    }

    #[test]
    fn test_poll_overrides() {
        let config = ProviderConfig::from_value_with_env(
            &json!({"access_key": "ak", "secret_key": "sk", "poll": {"delay": 0, "interval": 1}}),
            no_env,
        )
        .unwrap();

        assert_eq!(config.poll.delay(), Some(Duration::ZERO));
        assert_eq!(config.poll.interval(), Some(Duration::from_secs(1)));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = ProviderConfig::new("ak", "super-secret");
        let debug = format!("{:?}", config);
        assert!(debug.contains("ak"));
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_schema_marks_secret_sensitive() {
        let schema = ProviderConfig::schema();
        assert!(schema.block.attributes["secret_key"].flags.sensitive);
        assert!(!schema.block.attributes["access_key"].flags.sensitive);
    }
}
