//! Client configuration.
//!
//! Loaded from TOML, then overridden from `WBA_*` environment variables.
//! Every field has a default, so an absent file yields a working client.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ResolutionError;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ClientConfig {
    /// Hosting service for uploads, user-id lookups and authentication
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Audience posted with signed-assertion exchanges
    #[serde(default = "default_auth_url")]
    pub auth_url: String,
    /// Deadline for a single request, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Default, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

fn default_base_url() -> String {
    "https://pi-unlimited.com".to_string()
}

fn default_auth_url() -> String {
    "https://pi-unlimited.com/wba/test".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    concat!("wba-resolver/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            auth_url: default_auth_url(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            log: LogConfig::default(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

impl ClientConfig {
    /// Loads the configuration.
    ///
    /// The file is taken from `config_path`, then `WBA_CONFIG_PATH`, then
    /// `wba.toml` in the working directory. An explicitly named file must
    /// exist; the implicit `wba.toml` is optional.
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ResolutionError> {
        Self::load_with(config_path, |key| std::env::var(key).ok())
    }

    /// [`ClientConfig::load`] with the environment supplied by `env`
    pub fn load_with(
        config_path: Option<PathBuf>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ResolutionError> {
        let explicit = config_path.or_else(|| env("WBA_CONFIG_PATH").map(PathBuf::from));

        let mut config = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(ResolutionError::Config(format!(
                        "configuration file not found: {}",
                        path.display()
                    )));
                }
                Self::read(&path)?
            }
            None => {
                let path = PathBuf::from("wba.toml");
                if path.exists() {
                    Self::read(&path)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_overrides(env)?;
        config.normalize();
        Ok(config)
    }

    /// Parses a TOML document
    pub fn from_toml_str(contents: &str) -> Result<Self, ResolutionError> {
        let mut config = toml::from_str::<ClientConfig>(contents)
            .map_err(|e| ResolutionError::Config(format!("failed to parse configuration: {e}")))?;
        config.normalize();
        Ok(config)
    }

    fn read(path: &Path) -> Result<Self, ResolutionError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ResolutionError::Config(format!("failed to read {}: {e}", path.display())))?;
        toml::from_str::<ClientConfig>(&contents)
            .map_err(|e| ResolutionError::Config(format!("failed to parse {}: {e}", path.display())))
    }

    fn apply_overrides(
        &mut self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ResolutionError> {
        if let Some(url) = env("WBA_BASE_URL") {
            self.base_url = url;
        }
        if let Some(url) = env("WBA_AUTH_URL") {
            self.auth_url = url;
        }
        if let Some(timeout) = env("WBA_TIMEOUT_SECS") {
            self.timeout_secs = timeout
                .parse()
                .map_err(|e| ResolutionError::Config(format!("invalid WBA_TIMEOUT_SECS: {e}")))?;
        }
        if let Some(level) = env("WBA_LOG_LEVEL") {
            self.log.level = level;
        }
        if let Some(format) = env("WBA_LOG_FORMAT") {
            self.log.format = match format.to_lowercase().as_str() {
                "json" => LogFormat::Json,
                "text" => LogFormat::Text,
                other => {
                    return Err(ResolutionError::Config(format!(
                        "invalid WBA_LOG_FORMAT '{other}', expected 'text' or 'json'"
                    )));
                }
            };
        }
        Ok(())
    }

    fn normalize(&mut self) {
        let trimmed = self.base_url.trim_end_matches('/').len();
        self.base_url.truncate(trimmed);
    }
}
