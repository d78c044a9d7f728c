//! Configuration loader and validator for the admin service.
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
    pub brmh: Brmh,
    pub shopify: Shopify,
}

/// App-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    pub data_dir: String,
    pub bind_addr: String,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

/// BRMH table-store settings and table name mappings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Brmh {
    pub base_url: String,
    pub tables: Tables,
    #[serde(default = "default_item_per_page")]
    pub item_per_page: u32,
}

/// Table names for each entity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tables {
    pub influencers: String,
    pub orders: String,
    pub content: String,
    pub templates: String,
}

/// Shopify admin API settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Shopify {
    pub store_domain: String,
    pub admin_token: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Empty means webhook signatures are not verified (logged at startup).
    #[serde(default)]
    pub webhook_secret: String,
}

fn default_cache_ttl_secs() -> u64 {
    300
}

fn default_item_per_page() -> u32 {
    50
}

fn default_api_version() -> String {
    "2024-10".to_string()
}

impl Config {
    /// Ensure required directories exist (creates `app.data_dir` if missing).
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        if self.app.data_dir.trim().is_empty() {
            return Ok(());
        }
        fs::create_dir_all(&self.app.data_dir)
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.data_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("app.data_dir must be non-empty"));
    }
    if cfg.app.bind_addr.trim().is_empty() {
        return Err(ConfigError::Invalid("app.bind_addr must be non-empty"));
    }
    if cfg.app.cache_ttl_secs == 0 {
        return Err(ConfigError::Invalid("app.cache_ttl_secs must be > 0"));
    }

    if cfg.brmh.base_url.trim().is_empty() {
        return Err(ConfigError::Invalid("brmh.base_url must be non-empty"));
    }
    if cfg.brmh.item_per_page == 0 {
        return Err(ConfigError::Invalid("brmh.item_per_page must be > 0"));
    }
    let t = &cfg.brmh.tables;
    if t.influencers.trim().is_empty() {
        return Err(ConfigError::Invalid(
            "brmh.tables.influencers must be non-empty",
        ));
    }
    if t.orders.trim().is_empty() {
        return Err(ConfigError::Invalid("brmh.tables.orders must be non-empty"));
    }
    if t.content.trim().is_empty() {
        return Err(ConfigError::Invalid("brmh.tables.content must be non-empty"));
    }
    if t.templates.trim().is_empty() {
        return Err(ConfigError::Invalid(
            "brmh.tables.templates must be non-empty",
        ));
    }

    if cfg.shopify.store_domain.trim().is_empty() {
        return Err(ConfigError::Invalid(
            "shopify.store_domain must be non-empty",
        ));
    }
    if cfg.shopify.admin_token.trim().is_empty() {
        return Err(ConfigError::Invalid(
            "shopify.admin_token must be non-empty",
        ));
    }
    if cfg.shopify.api_version.trim().is_empty() {
        return Err(ConfigError::Invalid(
            "shopify.api_version must be non-empty",
        ));
    }
    // webhook_secret may be empty; verification is then skipped.

    Ok(())
}

/// Example YAML config used by tests.
pub fn example() -> &'static str {
    r#"app:
  data_dir: "./data"
  bind_addr: "0.0.0.0:8080"
  cache_ttl_secs: 300

brmh:
  base_url: "https://brmh.in"
  item_per_page: 50
  tables:
    influencers: "brmh-influencers"
    orders: "brmh-Influencer-orders"
    content: "brmh-influencer-content"
    templates: "brmh-message-templates"

shopify:
  store_domain: "example.myshopify.com"
  admin_token: "YOUR_SHOPIFY_ADMIN_TOKEN"
  api_version: "2024-10"
  webhook_secret: ""
"#
}
