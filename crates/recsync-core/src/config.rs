use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

use crate::error::ErrorCode;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub list: ListConfig,
    #[serde(default)]
    pub memo: MemoConfig,
    #[serde(default)]
    pub event: EventConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListConfig {
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Ordering used when a list view does not declare its own.
    #[serde(default = "default_order_by")]
    pub default_order_by: String,
    /// Field the first-letter and substring filters compare against.
    #[serde(default = "default_filter_field")]
    pub filter_field: String,
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            default_order_by: default_order_by(),
            filter_field: default_filter_field(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoConfig {
    #[serde(default = "default_expiration_ms")]
    pub expiration_ms: i64,
}

impl Default for MemoConfig {
    fn default() -> Self {
        Self {
            expiration_ms: default_expiration_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventConfig {
    #[serde(default = "default_identity_field")]
    pub identity_field: String,
    #[serde(default = "default_start_field")]
    pub start_field: String,
    #[serde(default = "default_end_field")]
    pub end_field: String,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            identity_field: default_identity_field(),
            start_field: default_start_field(),
            end_field: default_end_field(),
        }
    }
}

/// Load the config file at `path`, falling back to defaults when it is absent.
pub fn load_config(path: &Path) -> Result<SyncConfig> {
    if !path.exists() {
        return Ok(SyncConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let config = toml::from_str::<SyncConfig>(&content).with_context(|| {
        format!(
            "{}: failed to parse {}",
            ErrorCode::ConfigParseError,
            path.display()
        )
    })?;
    validate(&config)?;
    Ok(config)
}

/// Load the config file and apply environment overrides.
///
/// `RECSYNC_PAGE_SIZE` replaces `list.page_size` when set.
pub fn resolve_config(path: &Path) -> Result<SyncConfig> {
    let mut config = load_config(path)?;
    if let Some(page_size) = resolve_page_size(env::var("RECSYNC_PAGE_SIZE").ok())? {
        config.list.page_size = page_size;
    }
    validate(&config)?;
    Ok(config)
}

fn resolve_page_size(raw: Option<String>) -> Result<Option<u32>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let parsed = trimmed
        .parse::<u32>()
        .with_context(|| format!("RECSYNC_PAGE_SIZE is not a number: '{trimmed}'"))?;
    Ok(Some(parsed))
}

fn validate(config: &SyncConfig) -> Result<()> {
    if config.list.page_size == 0 {
        bail!("list.page_size must be at least 1");
    }
    if config.memo.expiration_ms < 0 {
        bail!("memo.expiration_ms must not be negative");
    }
    Ok(())
}

const fn default_page_size() -> u32 {
    25
}

fn default_order_by() -> String {
    "Name ASC".to_string()
}

fn default_filter_field() -> String {
    "Name".to_string()
}

const fn default_expiration_ms() -> i64 {
    5000
}

fn default_identity_field() -> String {
    "Id".to_string()
}

fn default_start_field() -> String {
    "StartDateTime".to_string()
}

fn default_end_field() -> String {
    "EndDateTime".to_string()
}
