use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::article::Category;
use crate::enrich::{ScoringWeights, TagCategory};
use crate::feed::Continent;
use crate::pipeline::CategoryRule;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub tagging: TaggingConfig,
    #[serde(default)]
    pub categories: CategoriesConfig,
    /// Feed sources seeded into the store at startup
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Data directory path
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Seconds between scheduled ingestion runs
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
    /// Sources fetched in parallel within one run
    #[serde(default = "default_max_concurrent_sources")]
    pub max_concurrent_sources: usize,
    /// Entries published longer ago than this are skipped (0 = keep everything)
    #[serde(default = "default_max_entry_age_days")]
    pub max_entry_age_days: u32,
    /// Deactivate a source after this many failed runs in a row (0 = never)
    #[serde(default)]
    pub max_consecutive_failures: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            request_timeout_secs: default_timeout(),
            max_concurrent_sources: default_max_concurrent_sources(),
            max_entry_age_days: default_max_entry_age_days(),
            max_consecutive_failures: 0,
        }
    }
}

/// Credibility scoring policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default)]
    pub weights: ScoringWeights,
    /// Outlet names or domains treated as reputable
    #[serde(default = "default_trusted_sources")]
    pub trusted_sources: Vec<String>,
    /// Outlet names or domains known for low-quality content
    #[serde(default)]
    pub low_quality_sources: Vec<String>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            trusted_sources: default_trusted_sources(),
            low_quality_sources: Vec::new(),
        }
    }
}

/// Optional replacement for the built-in tag table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaggingConfig {
    /// Label recorded alongside a custom table
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub categories: Vec<TagCategory>,
}

/// Optional replacement for the built-in category rules, checked in order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoriesConfig {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub rules: Vec<CategoryRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub continent: Continent,
    /// Section feed: every entry gets this category
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("newswire")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_poll_interval() -> u64 {
    120
}

fn default_timeout() -> u64 {
    20
}

fn default_max_concurrent_sources() -> usize {
    4
}

fn default_max_entry_age_days() -> u32 {
    3
}

fn default_trusted_sources() -> Vec<String> {
    [
        "times of india", "timesofindia.com", "indiatimes.com",
        "the hindu", "thehindu.com",
        "indian express", "indianexpress.com",
        "hindustan times", "hindustantimes.com",
        "reuters", "reuters.com",
        "pti", "ani",
        "ndtv", "ndtv.com",
        "the wire", "thewire.in", "scroll.in",
        "bbc", "bbc.com", "bbc.co.uk",
        "cnn", "cnn.com",
        "bloomberg", "bloomberg.com",
        "mint", "livemint", "livemint.com",
        "business standard", "business-standard.com",
        "moneycontrol", "moneycontrol.com",
        "economic times", "economictimes.indiatimes.com",
        "financial express", "financialexpress.com",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Expand tilde (~) in path to user's home directory
fn expand_tilde(path: &Path) -> PathBuf {
    if let Some(path_str) = path.to_str() {
        if let Some(stripped) = path_str.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(stripped);
            }
        } else if path_str == "~" {
            if let Some(home) = dirs::home_dir() {
                return home;
            }
        }
    }
    path.to_path_buf()
}

impl AppConfig {
    /// Load configuration from the default location, or defaults if absent
    pub fn load() -> crate::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from an explicit file path
    pub fn load_from(path: &Path) -> crate::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Self::from_toml(&content)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> crate::Result<Self> {
        toml::from_str(content).map_err(|e| crate::Error::Config(e.to_string()))
    }

    /// Get the configuration file path
    /// Always uses ~/.config/newswire/config.toml on all platforms
    pub fn config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("newswire")
            .join("config.toml")
    }

    /// Get the database file path
    pub fn database_path(&self) -> PathBuf {
        self.data_dir().join("newswire.db")
    }

    /// Get the data directory (with tilde expansion)
    pub fn data_dir(&self) -> PathBuf {
        expand_tilde(&self.general.data_dir)
    }
}
