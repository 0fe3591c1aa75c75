//! Configuration management for orderscout.
//!
//! Settings come from an optional TOML file and are then overridden by
//! environment variables. Every field has a default, so an empty file (or no
//! file at all) yields a working configuration.

pub mod browser;
mod loader;
pub mod site;

use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub use browser::BrowserEngineConfig;
pub use loader::{load_settings, ConfigError, LoadOptions, DEFAULT_CONFIG_FILENAME};
pub use site::{ElementQuery, SiteConfig};

/// Default maximum document size (15 MiB).
pub const DEFAULT_MAX_DOCUMENT_BYTES: u64 = 15 * 1024 * 1024;

/// Top-level settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub browser: BrowserEngineConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub documents: DocumentConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub jobs: JobConfig,
    #[serde(default)]
    pub calendar: CalendarConfig,
}

impl Settings {
    /// Apply environment variable overrides to every section.
    pub fn with_env_overrides(mut self) -> Self {
        self.browser = self.browser.with_env_overrides();
        self.documents = self.documents.with_env_overrides();
        self.cache = self.cache.with_env_overrides();
        self.jobs = self.jobs.with_env_overrides();
        self
    }
}

/// Keyword lists used to recognise order-award announcements.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Any of these phrases marks an announcement as an order award.
    pub keywords: Vec<String>,
    /// Regulatory category that, combined with an award phrase, also counts.
    pub category_phrase: String,
    pub award_phrases: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            keywords: [
                "award of order",
                "receipt of order",
                "order received",
                "order bagged",
                "bagged order",
                "purchase order",
                "po received",
                "contract awarded",
                "work order",
                "letter of award",
                "loi",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            category_phrase: "announcement under regulation 30".to_string(),
            award_phrases: vec!["award of order".to_string(), "receipt of order".to_string()],
        }
    }
}

/// Linked-document fetching and enrichment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DocumentConfig {
    /// Hosts must equal this suffix or be a subdomain of it.
    pub allowed_host_suffix: String,
    /// Only `https` links are fetched when set.
    pub require_https: bool,
    pub max_bytes: u64,
    /// Request timeout in seconds.
    pub timeout: u64,
    /// Enrichment worker pool size.
    pub workers: usize,
    /// Issue a HEAD request to reject oversized documents before download.
    pub probe_size: bool,
    /// Characters of extracted text kept on each candidate.
    pub snippet_chars: usize,
    /// Entries kept in the document cache; 0 disables it.
    pub cache_entries: usize,
    pub cache_ttl_minutes: u64,
    pub user_agent: String,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            allowed_host_suffix: "bseindia.com".to_string(),
            require_https: true,
            max_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
            timeout: 45,
            workers: 4,
            probe_size: true,
            snippet_chars: 500,
            cache_entries: 512,
            cache_ttl_minutes: 720,
            user_agent: browser::default_user_agent(),
        }
    }
}

impl DocumentConfig {
    /// - `PDF_TIMEOUT`, `MAX_PDF_BYTES`, `PDF_WORKERS`, `SCRAPER_UA`
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(v) = env_parse::<u64>("PDF_TIMEOUT") {
            self.timeout = v;
        }
        if let Some(v) = env_parse::<u64>("MAX_PDF_BYTES") {
            self.max_bytes = v;
        }
        if let Some(v) = env_parse::<usize>("PDF_WORKERS") {
            self.workers = v.max(1);
        }
        if let Ok(val) = std::env::var("SCRAPER_UA") {
            if !val.trim().is_empty() {
                self.user_agent = val;
            }
        }
        self
    }
}

/// Per-date result cache.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    pub dir: PathBuf,
    pub memory_ttl_minutes: u64,
    /// Durable entries expire this long after their last write.
    pub durable_ttl_minutes: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data/cache"),
            memory_ttl_minutes: 60,
            durable_ttl_minutes: 1440,
        }
    }
}

impl CacheConfig {
    /// - `CACHE_DIR`, `CACHE_TTL_MINUTES`
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("CACHE_DIR") {
            if !val.trim().is_empty() {
                self.dir = PathBuf::from(val);
            }
        }
        if let Some(v) = env_parse::<u64>("CACHE_TTL_MINUTES") {
            self.durable_ttl_minutes = v;
            self.memory_ttl_minutes = self.memory_ttl_minutes.min(v);
        }
        self
    }
}

/// Job lifecycle limits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct JobConfig {
    /// Terminal jobs older than this are dropped from the registry.
    pub retention_minutes: u64,
    /// Safety ceiling on result pages visited by one job.
    pub max_pages: u32,
    /// Maximum characters of error text kept on a failed job.
    pub max_error_chars: usize,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            retention_minutes: 120,
            max_pages: 500,
            max_error_chars: 500,
        }
    }
}

impl JobConfig {
    /// - `JOB_TTL_MINUTES`
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(v) = env_parse::<u64>("JOB_TTL_MINUTES") {
            self.retention_minutes = v;
        }
        self
    }
}

/// Calendar used for date validation and the "current day" cache rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CalendarConfig {
    /// Offset of the portal's timezone from UTC, in minutes (IST = 330).
    pub utc_offset_minutes: i32,
    /// Earliest date that may be requested.
    pub min_date: NaiveDate,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: 330,
            min_date: NaiveDate::from_ymd_opt(2010, 1, 1).unwrap_or_default(),
        }
    }
}

/// Parse an environment variable, ignoring unset or malformed values.
pub(crate) fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}
