//! Browser automation sessions for the JS-rendered listing portal.
//!
//! The portal only renders its announcement table after client-side
//! scripts run, so scraping drives a real browser through
//! [`AutomationSession`]. Markup is read back as an HTML snapshot and parsed
//! with `scraper`; interactions go through the session.

mod chromium;
mod fixture;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::ElementQuery;

pub use chromium::ChromiumSessionFactory;
pub use fixture::{FixtureLog, FixtureSessionFactory, HtmlFixtureSession};

/// Interval between polls in [`AutomationSession::wait_for`].
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Errors raised by an automation session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Failed to launch browser: {0}")]
    Launch(String),

    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("Script evaluation failed: {0}")]
    Script(String),

    #[error("Element interaction failed: {0}")]
    Interaction(String),

    #[error("Browser operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Browser support not compiled. Rebuild with: cargo build --features browser")]
    Unavailable,
}

/// Snapshot of one element matched by an [`ElementQuery`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlInfo {
    /// Position among all elements matching the query's CSS selector.
    pub index: usize,
    /// Whitespace-collapsed visible text.
    pub text: String,
    /// Raw `class` attribute.
    pub classes: String,
    pub visible: bool,
}

impl ControlInfo {
    /// True when any of `inactive` appears in the class attribute.
    pub fn has_any_class(&self, inactive: &[String]) -> bool {
        let classes = self.classes.to_lowercase();
        inactive
            .iter()
            .any(|c| !c.is_empty() && classes.contains(&c.to_lowercase()))
    }
}

/// A single live browser tab.
///
/// Implementations must be usable from one task at a time; the job runner
/// owns its session exclusively and closes it on every exit path.
#[async_trait]
pub trait AutomationSession: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<(), SessionError>;

    /// Serialized DOM of the current page.
    async fn content(&self) -> Result<String, SessionError>;

    /// Number of elements matching a CSS selector.
    async fn count(&self, css: &str) -> Result<usize, SessionError>;

    /// Elements matching `query`, in document order.
    async fn controls(&self, query: &ElementQuery) -> Result<Vec<ControlInfo>, SessionError>;

    /// Click the `index`-th element matching `query.css`.
    async fn click(&self, query: &ElementQuery, index: usize) -> Result<(), SessionError>;

    /// Evaluate a script expression in the page and return its JSON value.
    async fn run_script(&self, script: &str) -> Result<serde_json::Value, SessionError>;

    async fn close(&self) -> Result<(), SessionError>;

    /// Poll until `css` matches at least one element or `timeout` elapses.
    async fn wait_for(&self, css: &str, timeout: Duration) -> Result<bool, SessionError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.count(css).await? > 0 {
                return Ok(true);
            }
            if tokio::time::Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Lowercased visible text of the whole page.
    async fn page_text(&self) -> Result<String, SessionError> {
        let value = self
            .run_script("document.body ? document.body.innerText : ''")
            .await?;
        Ok(value.as_str().unwrap_or_default().to_lowercase())
    }
}

/// Opens fresh sessions, one per job.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn open(&self) -> Result<Box<dyn AutomationSession>, SessionError>;
}

/// Collapse runs of whitespace into single spaces.
pub(crate) fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whether `text` satisfies the query's optional text filter.
pub(crate) fn text_matches(query: &ElementQuery, text: &str) -> bool {
    match &query.text {
        Some(needle) => text.contains(needle.as_str()),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inactive_class_detection() {
        let control = ControlInfo {
            index: 0,
            text: "Next".to_string(),
            classes: "btn Disabled".to_string(),
            visible: true,
        };
        assert!(control.has_any_class(&["disabled".to_string()]));
        assert!(!control.has_any_class(&["ng-hide".to_string()]));
        assert!(!control.has_any_class(&[String::new()]));
    }

    #[test]
    fn test_text_filter() {
        assert!(text_matches(&ElementQuery::css("a"), "anything"));
        assert!(text_matches(&ElementQuery::css_with_text("a", "Next"), "Next >"));
        assert!(!text_matches(&ElementQuery::css_with_text("a", "Next"), "Prev"));
    }
}
