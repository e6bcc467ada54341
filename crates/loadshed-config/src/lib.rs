//! Configuration for the loadshed front-end.
//!
//! Built-in defaults, then `config.toml` in the platform config
//! directory, then `LOADSHED_*` environment variables. Command-line
//! flags are applied on top by the binary.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use loadshed_api::{ReconnectPolicy, TransportConfig};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config struct ──────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Web service root, e.g. `http://localhost:7010`.
    #[serde(default = "default_server")]
    pub server: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Push-channel reconnect delay until the server advertises one.
    #[serde(default = "default_retry_ms")]
    pub retry_ms: u64,

    /// Where exported schedules are written. Current directory if unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: default_server(),
            timeout_secs: default_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            retry_ms: default_retry_ms(),
            export_dir: None,
        }
    }
}

fn default_server() -> String {
    "http://localhost:7010".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_retry_ms() -> u64 {
    3000
}

// ── Runtime settings ────────────────────────────────────────────────

/// Validated settings ready to build a client from.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: Url,
    pub transport: TransportConfig,
    pub reconnect: ReconnectPolicy,
    pub export_dir: PathBuf,
}

impl Config {
    /// Validate and convert into runtime settings.
    pub fn to_client_settings(&self) -> Result<ClientSettings, ConfigError> {
        let base_url: Url = self.server.parse().map_err(|e| ConfigError::Validation {
            field: "server".into(),
            reason: format!("invalid URL {:?}: {e}", self.server),
        })?;

        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ConfigError::Validation {
                field: "server".into(),
                reason: format!("expected an http or https URL, got {:?}", self.server),
            });
        }

        if self.timeout_secs == 0 {
            return Err(ConfigError::Validation {
                field: "timeout_secs".into(),
                reason: "must be greater than zero".into(),
            });
        }

        if self.retry_ms == 0 {
            return Err(ConfigError::Validation {
                field: "retry_ms".into(),
                reason: "must be greater than zero".into(),
            });
        }

        Ok(ClientSettings {
            base_url,
            transport: TransportConfig {
                timeout: Duration::from_secs(self.timeout_secs),
                connect_timeout: Duration::from_secs(self.connect_timeout_secs.max(1)),
            },
            reconnect: ReconnectPolicy {
                retry: Duration::from_millis(self.retry_ms),
                max_retries: None,
            },
            export_dir: self
                .export_dir
                .clone()
                .unwrap_or_else(|| PathBuf::from(".")),
        })
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("za", "fourgrid", "loadshed").map_or_else(
        || PathBuf::from(".loadshed").join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Default log file location, next to the platform data directory.
pub fn default_log_path() -> PathBuf {
    ProjectDirs::from("za", "fourgrid", "loadshed").map_or_else(
        || PathBuf::from("loadshed.log"),
        |dirs| dirs.data_local_dir().join("loadshed.log"),
    )
}

// ── Config loading ──────────────────────────────────────────────────

fn figment_for(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("LOADSHED_"))
}

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from a specific TOML file + environment. A missing file is not
/// an error.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let config: Config = figment_for(path).extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn defaults_convert_to_settings() {
        let settings = Config::default().to_client_settings().unwrap();
        assert_eq!(settings.base_url.as_str(), "http://localhost:7010/");
        assert_eq!(settings.transport.timeout, Duration::from_secs(30));
        assert_eq!(settings.transport.connect_timeout, Duration::from_secs(10));
        assert_eq!(settings.reconnect.retry, Duration::from_secs(3));
        assert_eq!(settings.export_dir, PathBuf::from("."));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.retry_ms, 3000);
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "server = \"https://eskom.example.org/ls/\"\ntimeout_secs = 5\nexport_dir = \"/tmp/exports\"\n",
        )
        .unwrap();

        let config = load_config_from(&path).unwrap();
        assert_eq!(config.server, "https://eskom.example.org/ls/");
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.retry_ms, 3000);
        assert_eq!(config.export_dir, Some(PathBuf::from("/tmp/exports")));
    }

    #[test]
    fn malformed_file_is_a_figment_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "timeout_secs = \"soon\"\n").unwrap();

        assert!(matches!(
            load_config_from(&path),
            Err(ConfigError::Figment(_))
        ));
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = Config {
            server: "http://10.0.0.5:7010".into(),
            retry_ms: 500,
            ..Config::default()
        };

        save_config_to(&config, &path).unwrap();
        assert_eq!(load_config_from(&path).unwrap(), config);
    }

    #[test]
    fn rejects_bad_server() {
        let err = Config {
            server: "not a url".into(),
            ..Config::default()
        }
        .to_client_settings()
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "server"));

        let err = Config {
            server: "ftp://example.org".into(),
            ..Config::default()
        }
        .to_client_settings()
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));
    }

    #[test]
    fn rejects_zero_timeout() {
        let err = Config {
            timeout_secs: 0,
            ..Config::default()
        }
        .to_client_settings()
        .unwrap_err();
        assert_eq!(err.to_string(), "invalid timeout_secs: must be greater than zero");
    }

    #[test]
    fn rejects_zero_retry() {
        let err = Config {
            retry_ms: 0,
            ..Config::default()
        }
        .to_client_settings()
        .unwrap_err();
        assert_eq!(err.to_string(), "invalid retry_ms: must be greater than zero");
    }
}
