//! Hierarchical provider configuration loader
//!
//! Loads configuration from multiple sources with the following precedence (low to high):
//! 1. Built-in defaults
//! 2. Config file (explicit path, or ~/.keel/provider.yaml when present)
//! 3. Environment variables (KEEL_* prefix)
//! 4. CLI flags (handled by caller)

use crate::error::{Error, Result};
use crate::types::ProviderConfig;
use camino::{Utf8Path, Utf8PathBuf};
use std::env;
use std::fs;
use tracing::debug;

const DEFAULT_FILE_NAME: &str = "provider.yaml";

/// Provider configuration loader
#[derive(Debug, Default)]
pub struct ConfigLoader {
    /// Explicit config file; a missing file is an error
    file: Option<Utf8PathBuf>,
    /// Directory searched for the default file; a missing file is skipped
    config_dir: Option<Utf8PathBuf>,
}

impl ConfigLoader {
    /// Create a loader that looks for ~/.keel/provider.yaml
    pub fn new() -> Self {
        let config_dir = env::var("HOME")
            .or_else(|_| env::var("USERPROFILE"))
            .ok()
            .map(|home| Utf8PathBuf::from(home).join(".keel"));
        Self {
            file: None,
            config_dir,
        }
    }

    /// Use an explicit config file instead of the default location
    pub fn with_file(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Search a custom directory for the default config file
    pub fn with_dir(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.config_dir = Some(dir.into());
        self
    }

    /// Load the provider configuration with hierarchical precedence
    pub fn load(&self) -> Result<ProviderConfig> {
        let mut config = match self.resolve_file()? {
            Some(path) => {
                debug!("Loading provider config from {}", path);
                Self::load_yaml_file(&path)?
            }
            None => ProviderConfig::default(),
        };

        Self::apply_env_overrides(&mut config)?;
        Ok(config)
    }

    fn resolve_file(&self) -> Result<Option<Utf8PathBuf>> {
        if let Some(file) = &self.file {
            if !file.exists() {
                return Err(Error::config_not_found(file.as_str()));
            }
            return Ok(Some(file.clone()));
        }

        Ok(self
            .config_dir
            .as_ref()
            .map(|dir| dir.join(DEFAULT_FILE_NAME))
            .filter(|path| path.exists()))
    }

    fn load_yaml_file(path: &Utf8Path) -> Result<ProviderConfig> {
        let content = fs::read_to_string(path)?;
        serde_yaml_ng::from_str(&content)
            .map_err(|e| Error::invalid_config(format!("Failed to parse {}: {}", path, e)))
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(config: &mut ProviderConfig) -> Result<()> {
        if let Ok(val) = env::var("KEEL_PLATFORM_API") {
            config.platform_api = Some(val);
        }

        if let Ok(val) = env::var("KEEL_USERNAME") {
            config.username = Some(val);
        }

        if let Ok(val) = env::var("KEEL_PASSWORD") {
            config.password = Some(val);
        }

        if let Ok(val) = env::var("KEEL_PLATFORM_INSECURE") {
            config.insecure_skip_verify = val == "true" || val == "1";
        }

        if let Ok(val) = env::var("KEEL_HTTP_TIMEOUT_SECS") {
            config.network.http_timeout_secs = val.parse().map_err(|_| {
                Error::invalid_config("KEEL_HTTP_TIMEOUT_SECS must be a valid number")
            })?;
        }

        if let Ok(val) = env::var("KEEL_RATE_LIMIT_RETRIES") {
            config.network.rate_limit_retries = val.parse().map_err(|_| {
                Error::invalid_config("KEEL_RATE_LIMIT_RETRIES must be a valid number")
            })?;
        }

        if let Ok(val) = env::var("KEEL_POLL_MAX_ELAPSED_SECS") {
            let secs: u64 = val.parse().map_err(|_| {
                Error::invalid_config("KEEL_POLL_MAX_ELAPSED_SECS must be a valid number")
            })?;
            config.polling.max_elapsed_secs = Some(secs);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RetryStrategy;
    use serial_test::serial;
    use tempfile::TempDir;

    const ENV_VARS: &[&str] = &[
        "KEEL_PLATFORM_API",
        "KEEL_USERNAME",
        "KEEL_PASSWORD",
        "KEEL_PLATFORM_INSECURE",
        "KEEL_HTTP_TIMEOUT_SECS",
        "KEEL_RATE_LIMIT_RETRIES",
        "KEEL_POLL_MAX_ELAPSED_SECS",
    ];

    fn clear_env() {
        for var in ENV_VARS {
            env::remove_var(var);
        }
    }

    fn temp_dir() -> (Utf8PathBuf, TempDir) {
        let temp = TempDir::new().unwrap();
        let dir =
            Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("Invalid UTF-8 path");
        (dir, temp)
    }

    #[test]
    #[serial]
    fn test_defaults_when_no_file() {
        clear_env();
        let (dir, _temp) = temp_dir();
        let config = ConfigLoader::default().with_dir(dir).load().unwrap();
        assert!(config.platform_api.is_none());
        assert_eq!(config.network.rate_limit_retries, 5);
    }

    #[test]
    #[serial]
    fn test_load_from_default_dir() {
        clear_env();
        let (dir, _temp) = temp_dir();
        let content = r#"
platform-api: "https://platform.example.com"
username: "ops"
network:
  http-timeout-secs: 30
polling:
  strategy: linear-backoff
  max-attempts: 12
"#;
        fs::write(dir.join(DEFAULT_FILE_NAME), content).unwrap();

        let config = ConfigLoader::default().with_dir(dir).load().unwrap();
        assert_eq!(
            config.platform_api.as_deref(),
            Some("https://platform.example.com")
        );
        assert_eq!(config.username.as_deref(), Some("ops"));
        assert_eq!(config.network.http_timeout_secs, 30);
        assert_eq!(config.polling.strategy, RetryStrategy::LinearBackoff);
        assert_eq!(config.polling.max_attempts, Some(12));
    }

    #[test]
    #[serial]
    fn test_explicit_file_must_exist() {
        clear_env();
        let (dir, _temp) = temp_dir();
        let result = ConfigLoader::default()
            .with_file(dir.join("missing.yaml"))
            .load();
        assert!(matches!(result, Err(Error::ConfigNotFound { .. })));
    }

    #[test]
    #[serial]
    fn test_invalid_yaml_reports_path() {
        clear_env();
        let (dir, _temp) = temp_dir();
        let path = dir.join("broken.yaml");
        fs::write(&path, "network: [not-a-map").unwrap();

        let err = ConfigLoader::default()
            .with_file(path.clone())
            .load()
            .unwrap_err();
        assert!(err.to_string().contains("broken.yaml"));
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clear_env();
        let (dir, _temp) = temp_dir();
        fs::write(
            dir.join(DEFAULT_FILE_NAME),
            "platform-api: https://from-file.example.com\n",
        )
        .unwrap();

        env::set_var("KEEL_PLATFORM_API", "https://from-env.example.com");
        env::set_var("KEEL_PASSWORD", "s3cret");
        env::set_var("KEEL_PLATFORM_INSECURE", "true");
        env::set_var("KEEL_RATE_LIMIT_RETRIES", "2");
        env::set_var("KEEL_POLL_MAX_ELAPSED_SECS", "90");

        let config = ConfigLoader::default().with_dir(dir).load().unwrap();
        assert_eq!(
            config.platform_api.as_deref(),
            Some("https://from-env.example.com")
        );
        assert_eq!(config.password.as_deref(), Some("s3cret"));
        assert!(config.insecure_skip_verify);
        assert_eq!(config.network.rate_limit_retries, 2);
        assert_eq!(config.polling.max_elapsed_secs, Some(90));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_env_override_rejects_garbage() {
        clear_env();
        let (dir, _temp) = temp_dir();
        env::set_var("KEEL_HTTP_TIMEOUT_SECS", "soon");

        let result = ConfigLoader::default().with_dir(dir).load();
        assert!(matches!(result, Err(Error::InvalidConfig { .. })));

        clear_env();
    }
}
