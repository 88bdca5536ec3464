use crate::validation::{validate_endpoint, validate_interval, validate_ticker};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_TEMPLATES_PATH: &str = "config/template.yaml";
pub const DEFAULT_FIXTURE_PATH: &str = "data/test-assets.json";
pub const DEFAULT_SNAPSHOT_PATH: &str = "data/last_snapshot.json";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_TRACKED_TICKERS: [&str; 3] = ["USDC", "SPYx", "JITOSOL"];

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub polling: PollingConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: i64,
    pub admin_id: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SourceConfig {
    #[serde(default)]
    pub test_mode: bool,
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default = "default_fixture_path")]
    pub fixture_path: PathBuf,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct StorageConfig {
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: PathBuf,
    #[serde(default = "default_templates_path")]
    pub templates_path: PathBuf,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PollingConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_tracked_tickers")]
    pub tracked_tickers: Vec<String>,
}

fn default_fixture_path() -> PathBuf {
    PathBuf::from(DEFAULT_FIXTURE_PATH)
}

fn default_snapshot_path() -> PathBuf {
    PathBuf::from(DEFAULT_SNAPSHOT_PATH)
}

fn default_templates_path() -> PathBuf {
    PathBuf::from(DEFAULT_TEMPLATES_PATH)
}

fn default_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

fn default_tracked_tickers() -> Vec<String> {
    DEFAULT_TRACKED_TICKERS.iter().map(|t| t.to_string()).collect()
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            test_mode: false,
            api_url: None,
            fixture_path: default_fixture_path(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            snapshot_path: default_snapshot_path(),
            templates_path: default_templates_path(),
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            tracked_tickers: default_tracked_tickers(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let config_str = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&config_str)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let config_str = toml::to_string_pretty(self)?;
        fs::write(path, config_str)?;
        Ok(())
    }

    /// Reads the configuration from the process environment, after loading
    /// a `.env` file when one is present.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Self::read_lookup(lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Builds the runtime configuration from `path` when given, from the
    /// environment otherwise. `force_test_mode` switches to the fixture
    /// source before validation.
    pub fn resolve(path: Option<&Path>, force_test_mode: bool) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let config_str = fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file {}", path.display()))?;
                toml::from_str::<Config>(&config_str)?
            }
            None => {
                dotenv::dotenv().ok();
                Self::read_lookup(|key| std::env::var(key).ok())?
            }
        };
        if force_test_mode {
            config.source.test_mode = true;
        }
        config.validate()?;
        Ok(config)
    }

    fn read_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let require = |key: &str| get(key).ok_or_else(|| anyhow!("missing required environment variable {}", key));

        let telegram = TelegramConfig {
            bot_token: require("TELEGRAM_BOT_TOKEN")?,
            chat_id: require("TELEGRAM_CHAT_ID")?
                .parse()
                .context("TELEGRAM_CHAT_ID must be an integer")?,
            admin_id: require("ADMIN_ID")?
                .parse()
                .context("ADMIN_ID must be a positive integer")?,
        };

        let source = SourceConfig {
            test_mode: get("TEST_MODE").map(|v| v.eq_ignore_ascii_case("true")).unwrap_or(false),
            api_url: get("ASSETS_API_URL"),
            fixture_path: get("TEST_ASSETS_PATH").map(PathBuf::from).unwrap_or_else(default_fixture_path),
        };

        let storage = StorageConfig {
            snapshot_path: get("SNAPSHOT_PATH").map(PathBuf::from).unwrap_or_else(default_snapshot_path),
            templates_path: get("TEMPLATES_PATH").map(PathBuf::from).unwrap_or_else(default_templates_path),
        };

        let polling = PollingConfig {
            interval_secs: match get("POLL_INTERVAL_SECS") {
                Some(v) => v.parse().context("POLL_INTERVAL_SECS must be a number of seconds")?,
                None => default_interval_secs(),
            },
            tracked_tickers: match get("TRACKED_TICKERS") {
                Some(v) => v
                    .split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect(),
                None => default_tracked_tickers(),
            },
        };

        Ok(Config { telegram, source, storage, polling })
    }

    pub fn validate(&self) -> Result<()> {
        if self.telegram.bot_token.trim().is_empty() {
            return Err(anyhow!("Telegram bot token cannot be empty"));
        }
        validate_interval(self.polling.interval_secs)?;
        if self.polling.tracked_tickers.is_empty() {
            return Err(anyhow!("At least one ticker must be tracked"));
        }
        for ticker in &self.polling.tracked_tickers {
            validate_ticker(ticker)?;
        }
        if !self.source.test_mode {
            let url = self
                .source
                .api_url
                .as_deref()
                .ok_or_else(|| anyhow!("ASSETS_API_URL is required unless TEST_MODE is enabled"))?;
            validate_endpoint(url)?;
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.polling.interval_secs)
    }
}
