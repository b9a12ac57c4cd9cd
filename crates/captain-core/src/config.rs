use crate::error::{CaptainError, Result};
use crate::history::DEFAULT_HISTORY_LIMIT;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// ClientConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the card-store API, including the `/v1` prefix.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

fn default_api_url() -> String {
    "http://localhost:8081/v1".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            timeout_secs: default_timeout_secs(),
            history_limit: default_history_limit(),
        }
    }
}

// ---------------------------------------------------------------------------
// ServerConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    /// Relative paths resolve against the directory holding the config file.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    /// When set, card routes only accept ids signed with this secret.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_secret: Option<String>,
    #[serde(default = "default_robot_timeout_secs")]
    pub robot_timeout_secs: u64,
}

fn default_port() -> u16 {
    8081
}

fn default_db_path() -> PathBuf {
    PathBuf::from("captain.redb")
}

fn default_robot_timeout_secs() -> u64 {
    5
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            db_path: default_db_path(),
            card_secret: None,
            robot_timeout_secs: default_robot_timeout_secs(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl Config {
    /// `~/.captain/config.yaml`
    pub fn default_path() -> Result<PathBuf> {
        let home = home::home_dir().ok_or(CaptainError::HomeNotFound)?;
        Ok(home.join(".captain").join("config.yaml"))
    }

    /// Read the config at `path`; a missing file gives the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path)?;
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(path, data.as_bytes())
    }

    /// Resolve `server.db_path` against the config file's directory.
    pub fn db_path(&self, config_path: &Path) -> PathBuf {
        if self.server.db_path.is_absolute() {
            return self.server.db_path.clone();
        }
        config_path
            .parent()
            .unwrap_or(Path::new("."))
            .join(&self.server.db_path)
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if !self.client.api_url.starts_with("http://") && !self.client.api_url.starts_with("https://") {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!("client.api_url '{}' is not an http(s) URL", self.client.api_url),
            });
        }
        if self.client.timeout_secs == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "client.timeout_secs is 0: requests will fail immediately".to_string(),
            });
        }
        if self.client.history_limit == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "client.history_limit is 0: undo is disabled".to_string(),
            });
        }
        if self.server.port == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "server.port is 0: an ephemeral port will be chosen".to_string(),
            });
        }
        match self.server.card_secret.as_deref() {
            Some("") => warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "server.card_secret is empty".to_string(),
            }),
            Some("change-me") => warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "server.card_secret is still the sample value".to_string(),
            }),
            _ => {}
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let cfg = Config::load(&dir.path().join("config.yaml")).unwrap();
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.server.port, 8081);
        assert_eq!(cfg.client.history_limit, DEFAULT_HISTORY_LIMIT);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "server:\n  port: 9000\n  card_secret: s3cret\n").unwrap();
        let cfg = Config::load(&path).unwrap();
        assert_eq!(cfg.server.port, 9000);
        assert_eq!(cfg.server.card_secret.as_deref(), Some("s3cret"));
        assert_eq!(cfg.client, ClientConfig::default());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sub/config.yaml");
        let mut cfg = Config::default();
        cfg.client.api_url = "https://captain.example/v1".into();
        cfg.save(&path).unwrap();
        assert_eq!(Config::load(&path).unwrap(), cfg);
    }

    #[test]
    fn bad_yaml_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "client: [not, a, map]\n").unwrap();
        assert!(matches!(Config::load(&path), Err(CaptainError::Yaml(_))));
    }

    #[test]
    fn relative_db_path_resolves_next_to_config() {
        let cfg = Config::default();
        let path = cfg.db_path(Path::new("/etc/captain/config.yaml"));
        assert_eq!(path, PathBuf::from("/etc/captain/captain.redb"));
    }

    #[test]
    fn validate_default_config_no_warnings() {
        assert!(Config::default().validate().is_empty());
    }

    #[test]
    fn validate_flags_bad_values() {
        let mut cfg = Config::default();
        cfg.client.api_url = "localhost:8081".into();
        cfg.client.history_limit = 0;
        cfg.server.card_secret = Some("change-me".into());
        let warnings = cfg.validate();
        assert_eq!(warnings.len(), 3);
        assert!(warnings
            .iter()
            .any(|w| w.level == WarnLevel::Error && w.message.contains("api_url")));
    }
}
