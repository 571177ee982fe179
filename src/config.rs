/// Service configuration loader - parses climate.toml
///
/// Keeps the database location and listen address out of the code. Every
/// value has a default, so the file itself is optional; environment
/// variables (optionally from `.env`) override whatever the file says.

use serde::Deserialize;
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "climate.toml";

/// Environment variable names recognized as overrides.
pub const ENV_DATABASE: &str = "CLIMATE_DATABASE";
pub const ENV_HOST: &str = "CLIMATE_HOST";
pub const ENV_PORT: &str = "CLIMATE_PORT";
pub const ENV_WORKERS: &str = "CLIMATE_WORKERS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {0}")]
    Read(PathBuf, #[source] io::Error),

    #[error("Failed to parse {0}")]
    Parse(PathBuf, #[source] toml::de::Error),

    #[error("Invalid value {value:?} for {key}: expected {expected}")]
    InvalidOverride {
        key: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("workers must be at least 1")]
    NoWorkers,
}

/// Runtime settings for the HTTP query service.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Path to the pre-populated SQLite dataset.
    pub database_path: PathBuf,
    pub host: String,
    pub port: u16,
    /// Size of the request worker pool.
    pub workers: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("hawaii.sqlite"),
            host: "127.0.0.1".to_string(),
            port: 5000,
            workers: 4,
        }
    }
}

impl ServiceConfig {
    /// Parses a TOML document. Keys not present keep their defaults.
    pub fn from_toml_str(contents: &str, origin: &Path) -> Result<Self, ConfigError> {
        let config: ServiceConfig = toml::from_str(contents)
            .map_err(|e| ConfigError::Parse(origin.to_path_buf(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// `host:port` string suitable for binding.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Applies overrides from a key lookup. Split out from
    /// `apply_env_overrides` so tests don't have to touch process state.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(ENV_DATABASE) {
            self.database_path = PathBuf::from(path);
        }
        if let Some(host) = lookup(ENV_HOST) {
            self.host = host;
        }
        if let Some(port) = lookup(ENV_PORT) {
            self.port = port.trim().parse().map_err(|_| ConfigError::InvalidOverride {
                key: ENV_PORT,
                value: port.clone(),
                expected: "a port number",
            })?;
        }
        if let Some(workers) = lookup(ENV_WORKERS) {
            self.workers = workers.trim().parse().map_err(|_| ConfigError::InvalidOverride {
                key: ENV_WORKERS,
                value: workers.clone(),
                expected: "a positive integer",
            })?;
        }
        self.validate()
    }

    /// Applies overrides from the process environment, loading `.env` first.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        dotenv::dotenv().ok();
        self.apply_overrides(|key| env::var(key).ok())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        Ok(())
    }
}

/// Loads configuration from `path`, then applies environment overrides.
///
/// A missing file is not an error: the defaults are used. A file that exists
/// but cannot be parsed is, since silently ignoring it would serve the wrong
/// dataset.
pub fn load_config(path: &Path) -> Result<ServiceConfig, ConfigError> {
    let mut config = match fs::read_to_string(path) {
        Ok(contents) => ServiceConfig::from_toml_str(&contents, path)?,
        Err(e) if e.kind() == io::ErrorKind::NotFound => ServiceConfig::default(),
        Err(e) => return Err(ConfigError::Read(path.to_path_buf(), e)),
    };

    config.apply_env_overrides()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.database_path, PathBuf::from("hawaii.sqlite"));
        assert_eq!(config.listen_addr(), "127.0.0.1:5000");
        assert_eq!(config.workers, 4);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = ServiceConfig::from_toml_str("port = 8080\n", Path::new("test.toml")).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.database_path, PathBuf::from("hawaii.sqlite"));
    }

    #[test]
    fn test_full_file() {
        let toml = r#"
            database_path = "/data/hawaii.sqlite"
            host = "0.0.0.0"
            port = 9000
            workers = 8
        "#;
        let config = ServiceConfig::from_toml_str(toml, Path::new("test.toml")).unwrap();
        assert_eq!(config.database_path, PathBuf::from("/data/hawaii.sqlite"));
        assert_eq!(config.listen_addr(), "0.0.0.0:9000");
        assert_eq!(config.workers, 8);
    }

    #[test]
    fn test_malformed_file_is_error() {
        let result = ServiceConfig::from_toml_str("port = \"not a number\"", Path::new("bad.toml"));
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::Parse(..)));
        assert!(err.to_string().contains("bad.toml"));
    }

    #[test]
    fn test_zero_workers_rejected() {
        let result = ServiceConfig::from_toml_str("workers = 0", Path::new("test.toml"));
        assert!(matches!(result, Err(ConfigError::NoWorkers)));
    }

    #[test]
    fn test_overrides_win_over_file() {
        let mut config = ServiceConfig::from_toml_str("port = 8080", Path::new("test.toml")).unwrap();
        config
            .apply_overrides(lookup_from(&[
                (ENV_PORT, "7000"),
                (ENV_DATABASE, "other.sqlite"),
            ]))
            .unwrap();

        assert_eq!(config.port, 7000);
        assert_eq!(config.database_path, PathBuf::from("other.sqlite"));
        assert_eq!(config.host, "127.0.0.1");
    }

    #[test]
    fn test_bad_port_override() {
        let mut config = ServiceConfig::default();
        let err = config
            .apply_overrides(lookup_from(&[(ENV_PORT, "eighty")]))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_PORT));
    }

    #[test]
    fn test_empty_file_and_no_overrides_is_default() {
        let mut config = ServiceConfig::from_toml_str("", Path::new("empty.toml")).unwrap();
        config.apply_overrides(lookup_from(&[])).unwrap();
        assert_eq!(config, ServiceConfig::default());
    }
}
