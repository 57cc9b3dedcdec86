use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Environment variable consulted when the config file has no timeout
pub const TIMEOUT_ENV: &str = "BAYEUX_ENGINE_TIMEOUT";

/// Largest accepted liveness timeout (one year)
pub const MAX_TIMEOUT_SECS: f64 = 365.0 * 24.0 * 60.0 * 60.0;

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Client liveness timeout in seconds (None disables expiry)
    ///
    /// A client that is not pinged within twice this interval is destroyed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<f64>,

    /// Log level
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timeout: None,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Configuration with the given liveness timeout
    pub fn with_timeout(timeout: f64) -> Self {
        Self {
            timeout: Some(timeout),
            ..Default::default()
        }
    }

    /// Load configuration from a TOML file
    ///
    /// # Example
    ///
    /// ```no_run
    /// use bayeux_engine::Config;
    ///
    /// # fn main() -> anyhow::Result<()> {
    /// let config = Config::from_file("engine.toml")?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;
        config.apply_env()?;
        Ok(config)
    }

    /// Fill in the timeout from `BAYEUX_ENGINE_TIMEOUT` if it is unset
    pub fn apply_env(&mut self) -> anyhow::Result<()> {
        if self.timeout.is_none() {
            if let Ok(value) = std::env::var(TIMEOUT_ENV) {
                self.timeout = Some(value.trim().parse()?);
            }
        }
        Ok(())
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if let Some(timeout) = self.timeout {
            if !timeout.is_finite() || timeout <= 0.0 {
                anyhow::bail!("timeout must be a positive number of seconds");
            }
            if timeout > MAX_TIMEOUT_SECS {
                anyhow::bail!("timeout must be at most {} seconds", MAX_TIMEOUT_SECS);
            }
        }

        Ok(())
    }

    /// Interval after which an unrenewed client expires
    pub fn liveness_interval(&self) -> Option<Duration> {
        self.timeout
            .filter(|t| *t > 0.0 && *t <= MAX_TIMEOUT_SECS)
            .and_then(|t| Duration::try_from_secs_f64(2.0 * t).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_has_no_expiry() {
        let config = Config::default();
        assert!(config.timeout.is_none());
        assert!(config.liveness_interval().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_liveness_is_twice_timeout() {
        let config = Config::with_timeout(10.0);
        assert_eq!(config.liveness_interval(), Some(Duration::from_secs(20)));

        let config = Config::with_timeout(0.25);
        assert_eq!(config.liveness_interval(), Some(Duration::from_millis(500)));
    }

    #[test]
    fn test_validate_rejects_bad_timeout() {
        assert!(Config::with_timeout(0.0).validate().is_err());
        assert!(Config::with_timeout(-3.0).validate().is_err());
        assert!(Config::with_timeout(f64::NAN).validate().is_err());
    }

    #[test]
    fn test_validate_rejects_huge_timeout() {
        let config = Config::with_timeout(1e300);
        assert!(config.validate().is_err());
        assert!(config.liveness_interval().is_none());

        assert!(Config::with_timeout(MAX_TIMEOUT_SECS).validate().is_ok());
        assert!(Config::with_timeout(MAX_TIMEOUT_SECS)
            .liveness_interval()
            .is_some());
    }

    #[test]
    fn test_env_fills_missing_timeout() {
        std::env::set_var(TIMEOUT_ENV, "12.5");
        let mut config = Config::default();
        let applied = config.apply_env();
        let mut explicit = Config::with_timeout(3.0);
        explicit.apply_env().unwrap();
        std::env::remove_var(TIMEOUT_ENV);

        applied.unwrap();
        assert_eq!(config.timeout, Some(12.5));
        assert_eq!(explicit.timeout, Some(3.0));
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.toml");

        let config = Config {
            timeout: Some(45.0),
            log_level: "debug".to_string(),
        };
        config.to_file(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.timeout, Some(45.0));
        assert_eq!(loaded.log_level, "debug");
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.toml");
        fs::write(&path, "timeout = 30\n").unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.timeout, Some(30.0));
        assert_eq!(loaded.log_level, "info");
    }
}
