//! Server configuration.
//!
//! Settings are read from a TOML file and may then be overridden from the
//! command line or environment (see `main.rs`).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use telemetry_store::InfluxConfig;
pub use telemetry_types::ValidationError;

/// Server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server settings.
    pub server: ServerConfig,
    /// Sensor database settings.
    pub storage: StorageConfig,
    /// Measurement backend settings.
    pub measurements: MeasurementsConfig,
}

impl Config {
    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = default_config_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Read {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Save configuration to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;

        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        std::fs::write(path.as_ref(), content).map_err(|e| ConfigError::Write {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Validate the configuration and return every error found.
    ///
    /// This checks:
    /// - Server bind address is valid (host:port format)
    /// - Storage path is not empty
    /// - InfluxDB settings are complete when that backend is selected
    ///
    /// # Example
    ///
    /// ```
    /// use telemetry_service::Config;
    ///
    /// let config = Config::default();
    /// config.validate().expect("Default config should be valid");
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        errors.extend(self.server.validate());
        errors.extend(self.storage.validate());
        errors.extend(self.measurements.validate());

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1:3000").
    pub bind: String,
    /// Human-readable log output.
    pub dev_mode: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".to_string(),
            dev_mode: false,
        }
    }
}

impl ServerConfig {
    /// Validate server configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let field = "server.bind";

        if self.bind.is_empty() {
            errors.push(error(field, "bind address cannot be empty"));
            return errors;
        }

        match self.bind.rsplit_once(':') {
            None => errors.push(error(
                field,
                format!(
                    "invalid bind address '{}': expected format 'host:port'",
                    self.bind
                ),
            )),
            Some((_, port)) => match port.parse::<u16>() {
                Ok(0) => errors.push(error(field, "port cannot be 0")),
                Ok(_) => {}
                Err(_) => errors.push(error(
                    field,
                    format!("invalid port '{}': must be a number 1-65535", port),
                )),
            },
        }

        errors
    }
}

/// Sensor database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database file path. The local measurement backend shares it.
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: telemetry_store::default_db_path(),
        }
    }
}

impl StorageConfig {
    /// Validate storage configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.path.as_os_str().is_empty() {
            errors.push(error("storage.path", "database path cannot be empty"));
        }

        errors
    }
}

/// Where measurements are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// SQLite, in the storage database.
    #[default]
    Local,
    /// An InfluxDB 2.x server.
    #[value(name = "influxdb")]
    InfluxDb,
}

/// Measurement backend configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MeasurementsConfig {
    pub backend: Backend,
    /// Only read when `backend = "influxdb"`.
    pub influxdb: InfluxDbConfig,
}

impl MeasurementsConfig {
    /// Validate measurement backend configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        match self.backend {
            Backend::Local => Vec::new(),
            Backend::InfluxDb => self.influxdb.validate("measurements.influxdb"),
        }
    }
}

/// InfluxDB connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InfluxDbConfig {
    pub server_url: String,
    pub org: String,
    pub bucket: String,
    pub token: String,
}

impl Default for InfluxDbConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8086".to_string(),
            org: String::new(),
            bucket: String::new(),
            token: String::new(),
        }
    }
}

impl InfluxDbConfig {
    /// Validate InfluxDB settings, prefixing field paths with `prefix`.
    pub fn validate(&self, prefix: &str) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.server_url.is_empty() {
            errors.push(error(
                format!("{}.server_url", prefix),
                "server URL cannot be empty",
            ));
        } else if !self.server_url.starts_with("http://")
            && !self.server_url.starts_with("https://")
        {
            errors.push(error(
                format!("{}.server_url", prefix),
                format!(
                    "invalid server URL '{}': must start with http:// or https://",
                    self.server_url
                ),
            ));
        }

        for (name, value) in [
            ("org", &self.org),
            ("bucket", &self.bucket),
            ("token", &self.token),
        ] {
            if value.is_empty() {
                errors.push(error(
                    format!("{}.{}", prefix, name),
                    format!("{} cannot be empty", name),
                ));
            }
        }

        errors
    }
}

impl From<&InfluxDbConfig> for InfluxConfig {
    fn from(config: &InfluxDbConfig) -> Self {
        Self {
            server_url: config.server_url.clone(),
            org: config.org.clone(),
            bucket: config.bucket.clone(),
            token: config.token.clone(),
        }
    }
}

fn error(field: impl Into<String>, message: impl Into<String>) -> ValidationError {
    ValidationError {
        field: field.into(),
        message: message.into(),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),
    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("telemetry")
        .join("server.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn influx_config() -> InfluxDbConfig {
        InfluxDbConfig {
            server_url: "http://influx:8086".to_string(),
            org: "acme".to_string(),
            bucket: "sensors".to_string(),
            token: "secret".to_string(),
        }
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.server.bind, "127.0.0.1:3000");
        assert!(!config.server.dev_mode);
        assert_eq!(config.storage.path, telemetry_store::default_db_path());
        assert_eq!(config.measurements.backend, Backend::Local);
    }

    #[test]
    fn test_default_config_validates() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_config_full_toml() {
        let toml = r#"
            [server]
            bind = "0.0.0.0:8080"
            dev_mode = true

            [storage]
            path = "/data/telemetry.db"

            [measurements]
            backend = "influxdb"

            [measurements.influxdb]
            server_url = "http://influx:8086"
            org = "acme"
            bucket = "sensors"
            token = "secret"
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.bind, "0.0.0.0:8080");
        assert!(config.server.dev_mode);
        assert_eq!(config.storage.path, PathBuf::from("/data/telemetry.db"));
        assert_eq!(config.measurements.backend, Backend::InfluxDb);
        assert_eq!(config.measurements.influxdb.bucket, "sensors");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str("[server]\ndev_mode = true\n").unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:3000");
        assert_eq!(config.measurements.influxdb.server_url, "http://localhost:8086");
    }

    #[test]
    fn test_config_save_and_load() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("nested").join("server.toml");

        let mut config = Config::default();
        config.server.bind = "0.0.0.0:9090".to_string();
        config.storage.path = PathBuf::from("/tmp/test.db");
        config.measurements.backend = Backend::InfluxDb;
        config.measurements.influxdb = influx_config();

        config.save(&config_path).unwrap();
        let loaded = Config::load(&config_path).unwrap();

        assert_eq!(loaded.server.bind, "0.0.0.0:9090");
        assert_eq!(loaded.storage.path, PathBuf::from("/tmp/test.db"));
        assert_eq!(loaded.measurements.backend, Backend::InfluxDb);
        assert_eq!(loaded.measurements.influxdb.token, "secret");
    }

    #[test]
    fn test_config_load_nonexistent() {
        let result = Config::load("/nonexistent/path/config.toml");
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_config_load_invalid_toml() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("invalid.toml");
        std::fs::write(&config_path, "this is not valid { toml").unwrap();

        let result = Config::load(&config_path);
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let result = toml::from_str::<Config>("[measurements]\nbackend = \"mongo\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_default_config_path() {
        let path = default_config_path();
        assert!(path.ends_with("telemetry/server.toml"));
    }

    #[test]
    fn test_server_bind_validation() {
        let bind = |s: &str| ServerConfig {
            bind: s.to_string(),
            dev_mode: false,
        };

        assert!(bind("127.0.0.1:3000").validate().is_empty());
        assert!(bind("[::1]:3000").validate().is_empty());
        assert!(bind("localhost:3000").validate().is_empty());

        let errors = bind("").validate();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("cannot be empty"));

        let errors = bind("127.0.0.1").validate();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("host:port"));

        let errors = bind("127.0.0.1:0").validate();
        assert!(errors[0].message.contains("cannot be 0"));

        let errors = bind("127.0.0.1:abc").validate();
        assert!(errors[0].message.contains("must be a number"));
    }

    #[test]
    fn test_storage_path_validation() {
        let empty = StorageConfig {
            path: PathBuf::new(),
        };
        let errors = empty.validate();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "storage.path");
    }

    #[test]
    fn test_influx_settings_only_checked_when_selected() {
        let mut config = Config::default();
        config.measurements.influxdb = InfluxDbConfig::default();
        assert!(config.validate().is_ok());

        config.measurements.backend = Backend::InfluxDb;
        let Err(ConfigError::Validation(errors)) = config.validate() else {
            panic!("expected validation errors");
        };
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "measurements.influxdb.org",
                "measurements.influxdb.bucket",
                "measurements.influxdb.token",
            ]
        );
    }

    #[test]
    fn test_influx_url_scheme() {
        let mut influx = influx_config();
        influx.server_url = "influx:8086".to_string();
        let errors = influx.validate("measurements.influxdb");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("http://"));
    }

    #[test]
    fn test_validation_errors_collected_together() {
        let mut config = Config::default();
        config.server.bind = "nope".to_string();
        config.storage.path = PathBuf::new();

        let error = config.validate().unwrap_err();
        let display = error.to_string();
        assert!(display.contains("server.bind"));
        assert!(display.contains("storage.path"));
    }

    #[test]
    fn test_influx_config_conversion() {
        let settings = InfluxConfig::from(&influx_config());
        assert_eq!(settings.server_url, "http://influx:8086");
        assert_eq!(settings.bucket, "sensors");
    }
}
