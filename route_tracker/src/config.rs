use std::{path::Path, time::Duration};

use serde::Deserialize;

use crate::location::{LocationRequest, DEFAULT_INTERVAL, DEFAULT_MIN_DISPLACEMENT_M};

pub const API_URL_ENV: &str = "ROUTE_TRACKER_API_URL";
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8080";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Settings for the tracker, read from TOML. Every field has a default.
///
/// ```toml
/// [api]
/// base_url = "http://127.0.0.1:8080"
/// timeout_secs = 10
///
/// [location]
/// interval_ms = 5000
/// min_displacement_m = 5.0
/// ```
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub api: ApiConfig,
    pub location: LocationConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    pub interval_ms: u64,
    pub min_displacement_m: f64,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_INTERVAL.as_millis() as u64,
            min_displacement_m: DEFAULT_MIN_DISPLACEMENT_M,
        }
    }
}

impl LocationConfig {
    pub fn request(&self) -> LocationRequest {
        LocationRequest::new(Duration::from_millis(self.interval_ms), self.min_displacement_m)
    }
}

impl TrackerConfig {
    /// Reads `path` if given, otherwise starts from defaults. `ROUTE_TRACKER_API_URL`
    /// overrides the API base url either way.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.display().to_string(),
                    source,
                })?;
                Self::parse(&text)?
            },
            None => Self::default(),
        };

        config.apply_api_override(std::env::var(API_URL_ENV).ok());
        Ok(config)
    }

    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    fn apply_api_override(&mut self, base_url: Option<String>) {
        if let Some(base_url) = base_url.filter(|url| !url.trim().is_empty()) {
            tracing::debug!("API url overridden by {}: {}", API_URL_ENV, base_url);
            self.api.base_url = base_url;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = TrackerConfig::parse("").unwrap();
        assert_eq!(config, TrackerConfig::default());
        assert_eq!(config.location.request(), LocationRequest::default());
        assert_eq!(config.api.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = TrackerConfig::parse(r#"
            [api]
            base_url = "https://routes.example.org"

            [location]
            min_displacement_m = 12.5
        "#).unwrap();

        assert_eq!(config.api.base_url, "https://routes.example.org");
        assert_eq!(config.api.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(config.location.interval_ms, 5000);
        assert_eq!(config.location.min_displacement_m, 12.5);
    }

    #[test]
    fn zero_interval_is_clamped() {
        let text = "[location]\ninterval_ms = 0\nmin_displacement_m = -3.0";
        let config = TrackerConfig::parse(text).unwrap();
        let request = config.location.request();
        assert_eq!(request.interval, Duration::from_millis(1));
        assert_eq!(request.min_displacement_m, 0.);
    }

    #[test]
    fn malformed_file_is_an_error() {
        assert!(matches!(TrackerConfig::parse("[api\nbase_url ="), Err(ConfigError::Parse(_))));
        let result = TrackerConfig::parse("[api]\ntimeout_secs = \"soon\"");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn env_override_wins() {
        let mut config = TrackerConfig::default();
        config.apply_api_override(Some("http://10.0.0.2:9000".into()));
        assert_eq!(config.api.base_url, "http://10.0.0.2:9000");

        config.apply_api_override(Some("  ".into()));
        assert_eq!(config.api.base_url, "http://10.0.0.2:9000");
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[api]\ntimeout_secs = 3").unwrap();

        let config = TrackerConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.api.timeout_secs, 3);

        let missing = TrackerConfig::load(Some(Path::new("does/not/exist.toml")));
        assert!(matches!(missing, Err(ConfigError::Read { .. })));
    }
}
