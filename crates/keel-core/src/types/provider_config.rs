//! Provider configuration types
//!
//! These types describe how the provider reaches the control-plane API
//! (endpoint, credentials, HTTP behaviour) and how long it is prepared to
//! poll for asynchronous operations to settle.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Complete provider configuration
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProviderConfig {
    /// Base URL of the control-plane API
    #[serde(default)]
    pub platform_api: Option<String>,

    /// Username for HTTP basic authentication
    #[serde(default)]
    pub username: Option<String>,

    /// Password for HTTP basic authentication
    #[serde(default)]
    pub password: Option<String>,

    /// Skip TLS certificate verification
    #[serde(default)]
    pub insecure_skip_verify: bool,

    /// Network and HTTP configuration
    #[serde(default)]
    pub network: NetworkConfig,

    /// Polling policy for asynchronous status checks
    #[serde(default)]
    pub polling: RetryPolicy,
}

impl ProviderConfig {
    /// Get the platform API base URL, failing if it was never configured
    pub fn platform_api(&self) -> Result<&str> {
        match self.platform_api.as_deref() {
            Some(url) if !url.trim().is_empty() => Ok(url.trim_end_matches('/')),
            _ => Err(Error::missing_field("platform-api")),
        }
    }

    /// Basic auth credentials, only when both halves are present
    pub fn basic_auth(&self) -> Option<(&str, &str)> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(user), Some(pass)) if !user.is_empty() && !pass.is_empty() => Some((user, pass)),
            _ => None,
        }
    }

    /// A copy safe to print, with the password masked
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.password.is_some() {
            copy.password = Some("********".to_string());
        }
        copy
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("platform_api", &self.platform_api)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "********"))
            .field("insecure_skip_verify", &self.insecure_skip_verify)
            .field("network", &self.network)
            .field("polling", &self.polling)
            .finish()
    }
}

/// Network and HTTP configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NetworkConfig {
    /// Per-request timeout in seconds
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,

    /// Connection establishment timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// How many times a 429 response is re-sent before it is classified
    #[serde(default = "default_rate_limit_retries")]
    pub rate_limit_retries: u32,

    /// User agent string for HTTP requests
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl NetworkConfig {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            http_timeout_secs: default_http_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            rate_limit_retries: default_rate_limit_retries(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_http_timeout() -> u64 {
    120
}
fn default_connect_timeout() -> u64 {
    30
}
fn default_rate_limit_retries() -> u32 {
    5
}
fn default_user_agent() -> String {
    format!(
        "keel/{} ({}; {})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH
    )
}

/// Retry policy for a polling session
///
/// Delays never decrease from one attempt to the next. A session ends with
/// a "gave up" error when either bound is reached, whichever comes first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RetryPolicy {
    /// Maximum number of attempts (unbounded when absent)
    #[serde(default)]
    pub max_attempts: Option<u32>,

    /// Overall ceiling on the session in seconds (unbounded when absent)
    ///
    /// An attempt still in flight at the ceiling is abandoned. The final
    /// check scheduled on the ceiling may run for up to `max_delay_ms`.
    #[serde(default = "default_max_elapsed")]
    pub max_elapsed_secs: Option<u64>,

    /// Retry strategy
    #[serde(default)]
    pub strategy: RetryStrategy,

    /// Backoff multiplier for exponential strategies
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Initial delay in milliseconds
    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,

    /// Maximum delay in milliseconds
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
}

impl RetryPolicy {
    pub fn max_elapsed(&self) -> Option<Duration> {
        self.max_elapsed_secs.map(Duration::from_secs)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: None,
            max_elapsed_secs: default_max_elapsed(),
            strategy: RetryStrategy::default(),
            backoff_multiplier: default_backoff_multiplier(),
            initial_delay_ms: default_initial_delay(),
            max_delay_ms: default_max_delay(),
        }
    }
}

fn default_max_elapsed() -> Option<u64> {
    Some(600) // 10 minutes
}
fn default_backoff_multiplier() -> f64 {
    2.0
}
fn default_initial_delay() -> u64 {
    500
}
fn default_max_delay() -> u64 {
    5000
}

/// Retry strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RetryStrategy {
    /// Re-poll immediately
    None,

    /// Fixed delay between attempts
    FixedDelay,

    /// Exponential backoff, capped at the maximum delay (default)
    #[default]
    ExponentialBackoff,

    /// Linear backoff
    LinearBackoff,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, None);
        assert_eq!(policy.max_elapsed(), Some(Duration::from_secs(600)));
        assert_eq!(policy.strategy, RetryStrategy::ExponentialBackoff);
        assert_eq!(policy.initial_delay_ms, 500);
        assert_eq!(policy.max_delay_ms, 5000);
    }

    #[test]
    fn test_policy_from_yaml() {
        let yaml = r#"
max-attempts: 20
strategy: fixed-delay
initial-delay-ms: 250
"#;
        let policy: RetryPolicy = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(policy.max_attempts, Some(20));
        assert_eq!(policy.strategy, RetryStrategy::FixedDelay);
        assert_eq!(policy.initial_delay_ms, 250);
        assert_eq!(policy.max_delay_ms, 5000);
        assert_eq!(policy.max_elapsed_secs, Some(600));
    }

    #[test]
    fn test_platform_api_required() {
        let config = ProviderConfig::default();
        assert!(matches!(
            config.platform_api(),
            Err(Error::MissingField { .. })
        ));

        let config = ProviderConfig {
            platform_api: Some("https://api.example.com/".to_string()),
            ..Default::default()
        };
        assert_eq!(config.platform_api().unwrap(), "https://api.example.com");
    }

    #[test]
    fn test_basic_auth_requires_both_halves() {
        let mut config = ProviderConfig {
            username: Some("admin".to_string()),
            ..Default::default()
        };
        assert!(config.basic_auth().is_none());

        config.password = Some("secret".to_string());
        assert_eq!(config.basic_auth(), Some(("admin", "secret")));
    }

    #[test]
    fn test_debug_and_redacted_hide_password() {
        let config = ProviderConfig {
            username: Some("admin".to_string()),
            password: Some("hunter2".to_string()),
            ..Default::default()
        };
        assert!(!format!("{:?}", config).contains("hunter2"));
        assert_eq!(config.redacted().password.as_deref(), Some("********"));
    }

    #[test]
    fn test_network_defaults() {
        let network = NetworkConfig::default();
        assert_eq!(network.http_timeout(), Duration::from_secs(120));
        assert_eq!(network.rate_limit_retries, 5);
        assert!(network.user_agent.starts_with("keel/"));
    }
}
