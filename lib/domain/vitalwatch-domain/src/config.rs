//! Client configuration: defaults, optional YAML file, then environment.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const ENV_CONFIG_PATH: &str = "VITALWATCH_CONFIG_PATH";
pub const ENV_API_URL: &str = "VITALWATCH_API_URL";
pub const ENV_WS_URL: &str = "VITALWATCH_WS_URL";
pub const ENV_POLL_INTERVAL: &str = "VITALWATCH_POLL_INTERVAL_SECS";
pub const ENV_ACKNOWLEDGED_BY: &str = "VITALWATCH_ACKNOWLEDGED_BY";

pub const DEFAULT_ACKNOWLEDGED_BY: &str = "Web User";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid value `{value}` for {key}")]
    InvalidValue { key: &'static str, value: String },
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    pub attempts: u32,
    pub delay_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            attempts: 5,
            delay_ms: 1000,
        }
    }
}

impl ReconnectConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub api_url: String,
    /// Push endpoint. Falls back to `api_url` when unset.
    pub ws_url: Option<String>,
    pub poll_interval_secs: u64,
    pub history_hours: u32,
    pub acknowledged_by: String,
    pub request_timeout_secs: u64,
    pub desktop_notifications: bool,
    pub reconnect: ReconnectConfig,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:5000".to_string(),
            ws_url: None,
            poll_interval_secs: 30,
            history_hours: 24,
            acknowledged_by: DEFAULT_ACKNOWLEDGED_BY.to_string(),
            request_timeout_secs: 10,
            desktop_notifications: false,
            reconnect: ReconnectConfig::default(),
        }
    }
}

impl WatchConfig {
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults, then the config file if one exists, then environment overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        let path = default_path();
        let mut config = if path.exists() {
            Self::load_from_path(&path)?
        } else {
            Self::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_API_URL) {
            self.api_url = url;
        }
        if let Some(url) = lookup(ENV_WS_URL) {
            self.ws_url = Some(url);
        }
        if let Some(raw) = lookup(ENV_POLL_INTERVAL) {
            self.poll_interval_secs = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: ENV_POLL_INTERVAL,
                value: raw.clone(),
            })?;
        }
        if let Some(actor) = lookup(ENV_ACKNOWLEDGED_BY) {
            self.acknowledged_by = actor;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "api_url must be an http(s) URL, got `{}`",
                self.api_url
            )));
        }
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "poll_interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// REST base, e.g. `http://localhost:5000/api`.
    pub fn rest_base(&self) -> String {
        format!("{}/api", self.api_url.trim_end_matches('/'))
    }

    pub fn push_url(&self) -> &str {
        self.ws_url.as_deref().unwrap_or(&self.api_url)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

pub fn default_path() -> PathBuf {
    if let Ok(path) = std::env::var(ENV_CONFIG_PATH) {
        return PathBuf::from(path);
    }

    if let Ok(home) = std::env::var("HOME") {
        return Path::new(&home).join(".vitalwatch").join("config.yaml");
    }

    PathBuf::from("vitalwatch-config.yaml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn defaults_match_dashboard_client() {
        let config = WatchConfig::default();
        assert_eq!(config.rest_base(), "http://localhost:5000/api");
        assert_eq!(config.push_url(), "http://localhost:5000");
        assert_eq!(config.poll_interval(), Duration::from_secs(30));
        assert_eq!(config.history_hours, 24);
        assert_eq!(config.acknowledged_by, "Web User");
        assert_eq!(config.reconnect.attempts, 5);
        assert_eq!(config.reconnect.delay(), Duration::from_secs(1));
    }

    #[test]
    fn loads_partial_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "api_url: https://ward.example.org/\nws_url: wss://push.example.org\nreconnect:\n  attempts: 2"
        )
        .unwrap();

        let config = WatchConfig::load_from_path(file.path()).unwrap();
        assert_eq!(config.rest_base(), "https://ward.example.org/api");
        assert_eq!(config.push_url(), "wss://push.example.org");
        assert_eq!(config.reconnect.attempts, 2);
        assert_eq!(config.reconnect.delay_ms, 1000);
        assert_eq!(config.poll_interval_secs, 30);
    }

    #[test]
    fn rejects_unparseable_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "poll_interval_secs: [not, a, number]").unwrap();
        let err = WatchConfig::load_from_path(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }), "{err}");
    }

    #[test]
    fn environment_overrides_file_values() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_API_URL, "http://10.0.0.5:5000"),
            (ENV_POLL_INTERVAL, "5"),
            (ENV_ACKNOWLEDGED_BY, "Charge Nurse"),
        ]);
        let mut config = WatchConfig::default();
        config
            .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.api_url, "http://10.0.0.5:5000");
        assert_eq!(config.poll_interval_secs, 5);
        assert_eq!(config.acknowledged_by, "Charge Nurse");
        assert_eq!(config.ws_url, None);
    }

    #[test]
    fn bad_poll_interval_is_reported() {
        let mut config = WatchConfig::default();
        let err = config
            .apply_overrides(|key| (key == ENV_POLL_INTERVAL).then(|| "soon".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: ENV_POLL_INTERVAL, .. }));
    }

    #[test]
    fn validation_catches_zero_interval_and_bad_scheme() {
        let mut config = WatchConfig::default();
        config.poll_interval_secs = 0;
        assert!(config.validate().is_err());

        let mut config = WatchConfig::default();
        config.api_url = "localhost:5000".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_request_timeout_is_rejected() {
        let mut config = WatchConfig::default();
        config.request_timeout_secs = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("request_timeout_secs"), "{err}");

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "request_timeout_secs: 0").unwrap();
        assert!(WatchConfig::load_from_path(file.path()).is_err());
    }
}
