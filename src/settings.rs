use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::api::{ClientConfig, DEFAULT_EMBED};

const APP_SENTINEL: &str = "postfeed";

pub const ENV_BASE_URL: &str = "POSTFEED_API_BASE_URL";
pub const ENV_TOKEN: &str = "POSTFEED_TOKEN";

const DEFAULT_PAGE_SIZE: usize = 10;
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_RETRY_BACKOFF_MS: u64 = 250;
const DEFAULT_VIEWPORT_ROWS: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(rename = "_app")]
    pub app: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub embed: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_backoff_ms: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewport_rows: Option<usize>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app: APP_SENTINEL.to_string(),
            base_url: None,
            token: None,
            page_size: None,
            embed: None,
            timeout_secs: None,
            max_retries: None,
            retry_backoff_ms: None,
            viewport_rows: None,
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;

        let settings: Settings = toml::from_str(&content)
            .with_context(|| format!("Failed to parse settings from {}", path.display()))?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let content =
            toml::to_string_pretty(self).with_context(|| "Failed to serialize settings")?;

        fs::write(path, content)
            .with_context(|| format!("Failed to write settings to {}", path.display()))?;

        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.app != APP_SENTINEL {
            bail!(
                "Settings file appears to belong to another application (expected _app = '{}', found '{}')",
                APP_SENTINEL,
                self.app
            );
        }
        if self.page_size == Some(0) {
            bail!("page_size must be greater than zero");
        }
        if self.viewport_rows == Some(0) {
            bail!("viewport_rows must be greater than zero");
        }
        Ok(())
    }
}

/// Values given on the command line or in the environment. They win over the
/// settings file.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub base_url: Option<String>,
    pub token: Option<String>,
    pub page_size: Option<usize>,
    pub viewport_rows: Option<usize>,
}

impl Overrides {
    /// Fills fields not set on the command line from the environment.
    pub fn with_env(mut self) -> Self {
        self.base_url = self.base_url.or_else(|| non_empty_env(ENV_BASE_URL));
        self.token = self.token.or_else(|| non_empty_env(ENV_TOKEN));
        self
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Effective configuration after applying overrides, settings and defaults.
#[derive(Debug, Clone, Serialize)]
pub struct FeedConfig {
    pub base_url: String,
    #[serde(skip_serializing)]
    pub token: Option<String>,
    pub page_size: usize,
    pub embed: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    pub viewport_rows: usize,
}

impl FeedConfig {
    pub fn resolve(settings: &Settings, overrides: &Overrides) -> Result<Self> {
        let Some(base_url) = overrides
            .base_url
            .clone()
            .or_else(|| settings.base_url.clone())
        else {
            bail!(
                "No API base URL configured. Pass --base-url, set {} or add base_url to the settings file.",
                ENV_BASE_URL
            );
        };

        let page_size = overrides
            .page_size
            .or(settings.page_size)
            .unwrap_or(DEFAULT_PAGE_SIZE);
        if page_size == 0 {
            bail!("page size must be greater than zero");
        }

        Ok(Self {
            base_url,
            token: overrides.token.clone().or_else(|| settings.token.clone()),
            page_size,
            embed: settings
                .embed
                .clone()
                .unwrap_or_else(|| DEFAULT_EMBED.to_string()),
            timeout_secs: settings.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            max_retries: settings.max_retries.unwrap_or(0),
            retry_backoff_ms: settings.retry_backoff_ms.unwrap_or(DEFAULT_RETRY_BACKOFF_MS),
            viewport_rows: overrides
                .viewport_rows
                .or(settings.viewport_rows)
                .unwrap_or(DEFAULT_VIEWPORT_ROWS)
                .max(1),
        })
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.base_url.clone(),
            token: self.token.clone(),
            embed: self.embed.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            max_retries: self.max_retries,
            retry_backoff: Duration::from_millis(self.retry_backoff_ms),
        }
    }
}

pub fn config_dir(custom: Option<&PathBuf>) -> Option<PathBuf> {
    custom
        .cloned()
        .or_else(|| dirs::home_dir().map(|p| p.join(".config").join("postfeed")))
}

pub fn settings_path(config_dir: &Path) -> PathBuf {
    config_dir.join("settings.toml")
}

pub fn logs_dir(config_dir: &Path) -> PathBuf {
    config_dir.join("logs")
}
