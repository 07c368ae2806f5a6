//! Configuration loader and validator for the homework status bot.
//!
//! Settings come from a YAML file; the secrets and the poll interval can be
//! overridden from the environment (`PRACTICUM_TOKEN`, `TELEGRAM_TOKEN`,
//! `TELEGRAM_CHAT_ID`, `POLL_INTERVAL_SECS`).
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::practicum::PRACTICUM_ENDPOINT;

pub const ENV_PRACTICUM_TOKEN: &str = "PRACTICUM_TOKEN";
pub const ENV_TELEGRAM_TOKEN: &str = "TELEGRAM_TOKEN";
pub const ENV_TELEGRAM_CHAT_ID: &str = "TELEGRAM_CHAT_ID";
pub const ENV_POLL_INTERVAL: &str = "POLL_INTERVAL_SECS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub app: App,
    pub practicum: Practicum,
    pub telegram: Telegram,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct App {
    pub data_dir: String,
    pub poll_interval_secs: u64,
    /// Keep checkpoint and dedup cache in SQLite across restarts.
    pub persist_state: bool,
    /// Checkpoint for the very first poll when no state is stored. Defaults to now.
    pub initial_from_date: Option<i64>,
}

impl Default for App {
    fn default() -> Self {
        Self {
            data_dir: "./data".into(),
            poll_interval_secs: 600,
            persist_state: true,
            initial_from_date: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Practicum {
    pub endpoint: String,
    pub token: String,
    pub timeout_secs: u64,
}

impl Default for Practicum {
    fn default() -> Self {
        Self {
            endpoint: PRACTICUM_ENDPOINT.into(),
            token: String::new(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Telegram {
    pub bot_token: String,
    /// Numeric chat id or `@channel` username.
    #[serde(deserialize_with = "id_or_name")]
    pub chat_id: String,
}

fn id_or_name<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Id(i64),
        Name(String),
    }
    Ok(match Raw::deserialize(d)? {
        Raw::Id(id) => id.to_string(),
        Raw::Name(name) => name,
    })
}

impl Config {
    /// Ensure required directories exist (creates `app.data_dir` if missing).
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        if self.app.data_dir.trim().is_empty() {
            return Ok(());
        }
        fs::create_dir_all(&self.app.data_dir)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.app.poll_interval_secs)
    }

    pub fn database_url(&self) -> String {
        std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| format!("sqlite://{}/hw-watchbot.db", self.app.data_dir))
    }

    /// Names of the required secrets that are empty.
    pub fn missing_secrets(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.practicum.token.trim().is_empty() {
            missing.push(ENV_PRACTICUM_TOKEN);
        }
        if self.telegram.bot_token.trim().is_empty() {
            missing.push(ENV_TELEGRAM_TOKEN);
        }
        if self.telegram.chat_id.trim().is_empty() {
            missing.push(ENV_TELEGRAM_CHAT_ID);
        }
        missing
    }

    /// True when every secret the poll loop needs is present.
    pub fn check_ready(&self) -> bool {
        self.missing_secrets().is_empty()
    }

    /// Overlay values from the environment. `lookup` is `std::env::var` in production.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(v) = non_empty(ENV_PRACTICUM_TOKEN) {
            self.practicum.token = v;
        }
        if let Some(v) = non_empty(ENV_TELEGRAM_TOKEN) {
            self.telegram.bot_token = v;
        }
        if let Some(v) = non_empty(ENV_TELEGRAM_CHAT_ID) {
            self.telegram.chat_id = v;
        }
        if let Some(v) = non_empty(ENV_POLL_INTERVAL) {
            self.app.poll_interval_secs = v
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid("POLL_INTERVAL_SECS must be an integer"))?;
        }
        Ok(())
    }
}

/// Load configuration from a YAML file, apply environment overrides and validate.
/// - If `path` is None, uses `config.yaml` in the current working directory.
/// - A missing file is not an error; defaults plus environment are used instead.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let mut cfg = if path.exists() {
        let content = fs::read_to_string(path)?;
        serde_yaml::from_str(&content)?
    } else {
        Config::default()
    };
    cfg.apply_env(|key| std::env::var(key).ok())?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Structural checks. Secrets are checked separately by [`Config::check_ready`].
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.poll_interval_secs == 0 {
        return Err(ConfigError::Invalid("app.poll_interval_secs must be > 0"));
    }
    if cfg.app.persist_state && cfg.app.data_dir.trim().is_empty() {
        return Err(ConfigError::Invalid(
            "app.data_dir must be non-empty when app.persist_state is on",
        ));
    }
    if cfg.practicum.endpoint.trim().is_empty() {
        return Err(ConfigError::Invalid("practicum.endpoint must be non-empty"));
    }
    if cfg.practicum.timeout_secs == 0 {
        return Err(ConfigError::Invalid("practicum.timeout_secs must be > 0"));
    }
    Ok(())
}

/// Sample configuration file.
pub fn example() -> &'static str {
    r#"app:
  data_dir: "./data"
  poll_interval_secs: 600
  persist_state: true

practicum:
  endpoint: "https://practicum.yandex.ru/api/user_api/homework_statuses/"
  token: "YOUR_PRACTICUM_OAUTH_TOKEN"
  timeout_secs: 30

telegram:
  bot_token: "YOUR_TELEGRAM_BOT_TOKEN"
  chat_id: 123456789
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn parse_example_ok() {
        let cfg: Config = serde_yaml::from_str(example()).unwrap();
        validate(&cfg).unwrap();
        assert!(cfg.check_ready());
        assert_eq!(cfg.telegram.chat_id, "123456789");
        assert_eq!(cfg.poll_interval(), Duration::from_secs(600));
    }

    #[test]
    fn partial_file_uses_defaults() {
        let cfg: Config = serde_yaml::from_str("telegram:\n  chat_id: \"@feed\"\n").unwrap();
        validate(&cfg).unwrap();
        assert_eq!(cfg.practicum.endpoint, PRACTICUM_ENDPOINT);
        assert_eq!(cfg.app.poll_interval_secs, 600);
        assert_eq!(cfg.telegram.chat_id, "@feed");
    }

    #[test]
    fn check_ready_reports_each_missing_secret() {
        let cfg = Config::default();
        assert!(!cfg.check_ready());
        assert_eq!(
            cfg.missing_secrets(),
            vec![ENV_PRACTICUM_TOKEN, ENV_TELEGRAM_TOKEN, ENV_TELEGRAM_CHAT_ID]
        );

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.telegram.bot_token = "  ".into();
        assert!(!cfg.check_ready());
        assert_eq!(cfg.missing_secrets(), vec![ENV_TELEGRAM_TOKEN]);
    }

    #[test]
    fn env_overrides_file_values() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.apply_env(env(&[
            (ENV_PRACTICUM_TOKEN, "p-token"),
            (ENV_TELEGRAM_TOKEN, "t-token"),
            (ENV_TELEGRAM_CHAT_ID, "-100500"),
            (ENV_POLL_INTERVAL, "5"),
        ]))
        .unwrap();
        assert_eq!(cfg.practicum.token, "p-token");
        assert_eq!(cfg.telegram.bot_token, "t-token");
        assert_eq!(cfg.telegram.chat_id, "-100500");
        assert_eq!(cfg.app.poll_interval_secs, 5);
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.apply_env(env(&[(ENV_PRACTICUM_TOKEN, "")])).unwrap();
        assert_eq!(cfg.practicum.token, "YOUR_PRACTICUM_OAUTH_TOKEN");
    }

    #[test]
    fn bad_interval_env_is_rejected() {
        let mut cfg = Config::default();
        let err = cfg.apply_env(env(&[(ENV_POLL_INTERVAL, "ten")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("POLL_INTERVAL_SECS")));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.app.poll_interval_secs = 0;
        match validate(&cfg).unwrap_err() {
            ConfigError::Invalid(msg) => assert!(msg.contains("poll_interval_secs")),
            _ => panic!("wrong error"),
        }

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.practicum.timeout_secs = 0;
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.practicum.endpoint = "".into();
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.app.data_dir = "".into();
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));
        cfg.app.persist_state = false;
        validate(&cfg).unwrap();
    }

    #[test]
    fn ensure_dirs_creates_data_dir() {
        let td = tempdir().unwrap();
        let data_path = td.path().join("data");
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.app.data_dir = data_path.to_string_lossy().to_string();
        cfg.ensure_dirs().unwrap();
        assert!(data_path.exists());
    }

    #[test]
    fn load_from_file_ok() {
        let td = tempdir().unwrap();
        let p = td.path().join("config.yaml");
        fs::write(&p, example()).unwrap();
        let cfg = load(Some(&p)).unwrap();
        assert_eq!(cfg.practicum.timeout_secs, 30);
        assert!(cfg.app.persist_state);
    }

    #[test]
    fn load_rejects_malformed_yaml() {
        let td = tempdir().unwrap();
        let p = td.path().join("config.yaml");
        fs::write(&p, "app: [not, a, map").unwrap();
        assert!(matches!(load(Some(&p)), Err(ConfigError::Parse(_))));
    }
}
