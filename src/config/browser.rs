//! Browser engine configuration types.
//!
//! These types live here (always compiled) rather than behind
//! `#[cfg(feature = "browser")]` so that config parsing works without the
//! browser feature.

use serde::{Deserialize, Serialize};

/// Browser engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BrowserEngineConfig {
    /// Run in headless mode (default: true).
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Page load timeout in seconds.
    #[serde(default = "default_page_load_timeout")]
    pub page_load_timeout: u64,

    /// Upper bound in seconds for explicit element waits.
    #[serde(default = "default_wait_timeout")]
    pub wait_timeout: u64,

    /// Upper bound in seconds for a single script evaluation.
    #[serde(default = "default_script_timeout")]
    pub script_timeout: u64,

    /// User agent presented by the browser.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Additional Chrome arguments.
    #[serde(default)]
    pub chrome_args: Vec<String>,

    /// Remote Chrome DevTools URL (e.g., "ws://localhost:9222").
    /// If set, connects to an existing browser instead of launching one.
    /// Can also be set via BROWSER_URL environment variable.
    #[serde(default)]
    pub remote_url: Option<String>,
}

impl Default for BrowserEngineConfig {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            page_load_timeout: default_page_load_timeout(),
            wait_timeout: default_wait_timeout(),
            script_timeout: default_script_timeout(),
            user_agent: default_user_agent(),
            chrome_args: Vec::new(),
            remote_url: None,
        }
    }
}

impl BrowserEngineConfig {
    /// Apply environment variable overrides.
    ///
    /// - `HEADLESS` - "1"/"true"/"yes" for headless mode
    /// - `PAGE_LOAD_TIMEOUT` - page load timeout in seconds
    /// - `SELENIUM_WAIT` - explicit wait timeout in seconds
    /// - `SCRAPER_UA` - user agent string
    /// - `BROWSER_URL` - remote Chrome DevTools URL
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("HEADLESS") {
            self.headless = matches!(val.to_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Some(secs) = super::env_parse::<u64>("PAGE_LOAD_TIMEOUT") {
            self.page_load_timeout = secs;
        }
        if let Some(secs) = super::env_parse::<u64>("SELENIUM_WAIT") {
            self.wait_timeout = secs;
        }
        if let Ok(val) = std::env::var("SCRAPER_UA") {
            if !val.trim().is_empty() {
                self.user_agent = val;
            }
        }
        if let Ok(val) = std::env::var("BROWSER_URL") {
            if !val.is_empty() {
                self.remote_url = Some(val);
            }
        }
        self
    }
}

pub fn default_headless() -> bool {
    true
}

pub fn default_page_load_timeout() -> u64 {
    90
}

pub fn default_wait_timeout() -> u64 {
    25
}

fn default_script_timeout() -> u64 {
    60
}

pub fn default_user_agent() -> String {
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/118 Safari/537.36"
        .to_string()
}
