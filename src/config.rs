//! Configuration loader and validator for the airing-schedule bot.
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub app: App,
    pub telegram: Telegram,
    pub upstream: Upstream,
}

/// App-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    pub data_dir: String,
    pub mode: Mode,
}

/// Deployment mode; selects which SQLite file under `app.data_dir` is used.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Development,
    Production,
}

/// Telegram bot settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Telegram {
    pub bot_token: String,
}

/// Upstream episode API settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Upstream {
    pub base_url: String,
    pub credential: String,
    pub calendar_url: String,
}

impl Config {
    /// Ensure required directories exist (creates `app.data_dir` if missing).
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        if self.app.data_dir.trim().is_empty() {
            return Ok(());
        }
        fs::create_dir_all(&self.app.data_dir)
    }

    /// SQLite URL derived from the deployment mode. `DATABASE_URL` in the
    /// environment takes precedence (handled by the caller).
    pub fn database_url(&self) -> String {
        let file = match self.app.mode {
            Mode::Development => "airwatch-dev.db",
            Mode::Production => "airwatch.db",
        };
        format!("sqlite://{}/{}", self.app.data_dir.trim_end_matches('/'), file)
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
/// - `AIRWATCH_BOT_TOKEN` and `AIRWATCH_UPSTREAM_CREDENTIAL` override the
///   corresponding file values when set.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let mut cfg: Config = serde_yaml::from_str(&content)?;
    if let Ok(token) = std::env::var("AIRWATCH_BOT_TOKEN") {
        cfg.telegram.bot_token = token;
    }
    if let Ok(credential) = std::env::var("AIRWATCH_UPSTREAM_CREDENTIAL") {
        cfg.upstream.credential = credential;
    }
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.data_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("app.data_dir must be non-empty"));
    }

    if cfg.telegram.bot_token.trim().is_empty() {
        return Err(ConfigError::Invalid("telegram.bot_token must be non-empty"));
    }

    if cfg.upstream.base_url.trim().is_empty() {
        return Err(ConfigError::Invalid("upstream.base_url must be non-empty"));
    }
    if Url::parse(&cfg.upstream.base_url).is_err() {
        return Err(ConfigError::Invalid("upstream.base_url must be a valid URL"));
    }
    // Relative API paths are joined onto the base; without the trailing slash
    // the last path segment would be dropped.
    if !cfg.upstream.base_url.ends_with('/') {
        return Err(ConfigError::Invalid("upstream.base_url must end with '/'"));
    }
    if cfg.upstream.credential.trim().is_empty() {
        return Err(ConfigError::Invalid("upstream.credential must be non-empty"));
    }
    if Url::parse(&cfg.upstream.calendar_url).is_err() {
        return Err(ConfigError::Invalid("upstream.calendar_url must be a valid URL"));
    }

    Ok(())
}

/// Example YAML document matching the schema above.
pub fn example() -> &'static str {
    r#"app:
  data_dir: "./data"
  mode: "production"

telegram:
  bot_token: "YOUR_TELEGRAM_BOT_TOKEN"

upstream:
  base_url: "https://feedmyaddiction.xyz/api/v1/"
  credential: "user:secret"
  calendar_url: "https://feedmyaddiction.xyz/calendar"
"#
}
