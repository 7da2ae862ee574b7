use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable that overrides the selected endpoint
pub const ENDPOINT_ENV: &str = "RETROCHAT_ENDPOINT";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Name of the endpoint profile used when none is given
    pub default_endpoint: String,

    /// Named WebSocket endpoints
    pub endpoints: BTreeMap<String, String>,

    /// First assistant message shown in a fresh transcript
    pub greeting: String,

    /// Reconnect policy
    pub reconnect: ReconnectConfig,

    /// UI preferences
    pub ui: UiConfig,

    /// Log filter used when RUST_LOG is not set
    pub log_level: String,

    /// Retrochat home directory
    #[serde(skip)]
    pub home: PathBuf,
}

/// Reconnect configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    pub delay_ms: u64,
    pub max_retries: u32,
}

/// UI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub title: String,
    pub show_timestamps: bool,
    pub tick_rate_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            delay_ms: 1000,
            max_retries: 10,
        }
    }
}

impl ReconnectConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            title: "AI Assistant Win95.exe".to_string(),
            show_timestamps: false,
            tick_rate_ms: 300,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let mut endpoints = BTreeMap::new();
        endpoints.insert("local".to_string(), "ws://localhost:8080/".to_string());
        endpoints.insert(
            "hosted".to_string(),
            "wss://ai-tweet-bot.onrender.com/".to_string(),
        );

        Config {
            default_endpoint: "hosted".to_string(),
            endpoints,
            greeting: "Hello! I'm Windows 95's AI assistant. How can I help you today?"
                .to_string(),
            reconnect: ReconnectConfig::default(),
            ui: UiConfig::default(),
            log_level: "info".to_string(),
            home: default_home(),
        }
    }
}

fn default_home() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".retrochat")
}

impl Config {
    /// Load configuration from `~/.retrochat/config.toml`, falling back to defaults
    pub fn load() -> Result<Self> {
        let home = dirs::home_dir().context("Could not find home directory")?;
        Self::load_from(&home.join(".retrochat").join("config.toml"))
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            toml::from_str(&content).context("Failed to parse config file")?
        } else {
            Config::default()
        };

        config.home = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(default_home);

        Ok(config)
    }

    /// Save configuration next to the log file
    pub fn save(&self) -> Result<PathBuf> {
        fs::create_dir_all(&self.home).context("Failed to create .retrochat directory")?;

        let config_path = self.config_path();
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&config_path, content).context("Failed to write config file")?;
        Ok(config_path)
    }

    pub fn config_path(&self) -> PathBuf {
        self.home.join("config.toml")
    }

    pub fn log_path(&self) -> PathBuf {
        self.home.join("retrochat.log")
    }

    /// Resolve the endpoint URL to connect to.
    ///
    /// Precedence: explicit selector, then `RETROCHAT_ENDPOINT`, then
    /// `default_endpoint`. A selector is either a profile name or a literal
    /// `ws://`/`wss://` URL.
    pub fn resolve_endpoint(&self, selector: Option<&str>) -> Result<String> {
        let env_selector = std::env::var(ENDPOINT_ENV).ok();
        let selector = selector
            .or(env_selector.as_deref())
            .unwrap_or(&self.default_endpoint);

        if selector.starts_with("ws://") || selector.starts_with("wss://") {
            return Ok(selector.to_string());
        }

        self.endpoints.get(selector).cloned().ok_or_else(|| {
            anyhow::anyhow!(
                "Unknown endpoint '{}'. Known endpoints: {}",
                selector,
                self.endpoints.keys().cloned().collect::<Vec<_>>().join(", ")
            )
        })
    }
}
