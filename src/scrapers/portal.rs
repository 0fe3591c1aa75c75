//! Driving the listing portal's date search form.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use tracing::{debug, info, warn};

use super::browser::AutomationSession;
use crate::config::{BrowserEngineConfig, ElementQuery, SiteConfig};
use crate::error::ScrapeError;

/// How long each submit or cookie control gets to appear.
const CONTROL_WAIT: Duration = Duration::from_secs(5);
/// Second, shorter results wait after re-submitting with Enter.
const RETRY_RESULTS_WAIT: Duration = Duration::from_secs(15);
const POLL_INTERVAL: Duration = Duration::from_millis(250);

static INTEGER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());

/// Steps that take the portal from a blank tab to the first results page.
#[derive(Debug, Clone)]
pub struct Portal {
    site: SiteConfig,
    page_load_timeout: Duration,
    wait_timeout: Duration,
}

impl Portal {
    pub fn new(site: SiteConfig, browser: &BrowserEngineConfig) -> Self {
        Self {
            site,
            page_load_timeout: Duration::from_secs(browser.page_load_timeout),
            wait_timeout: Duration::from_secs(browser.wait_timeout),
        }
    }

    pub fn site(&self) -> &SiteConfig {
        &self.site
    }

    fn settle(&self) -> tokio::time::Sleep {
        tokio::time::sleep(Duration::from_millis(self.site.settle_delay_ms))
    }

    /// Load the listing page and dismiss any cookie banner.
    pub async fn open(&self, session: &dyn AutomationSession) -> Result<(), ScrapeError> {
        info!("Opening {}", self.site.listing_url);
        session.navigate(&self.site.listing_url).await?;
        if !session.wait_for("body", self.page_load_timeout).await? {
            return Err(ScrapeError::Navigation(
                "Listing page did not load".to_string(),
            ));
        }
        if self.accept_cookies(session).await {
            debug!("Dismissed cookie banner");
        }
        self.settle().await;
        Ok(())
    }

    /// Click the first cookie accept control present. Never fails.
    pub async fn accept_cookies(&self, session: &dyn AutomationSession) -> bool {
        for query in &self.site.cookie_controls {
            let Ok(controls) = session.controls(query).await else {
                continue;
            };
            if let Some(control) = controls.first() {
                if session.click(query, control.index).await.is_ok() {
                    return true;
                }
            }
        }
        false
    }

    /// Fill both date inputs. Returns false when either could not be set;
    /// the search is still attempted in that case.
    pub async fn set_dates(&self, session: &dyn AutomationSession, display_date: &str) -> bool {
        let mut all_set = true;
        for field in [&self.site.from_date_field, &self.site.to_date_field] {
            if let Err(e) = self.set_date_field(session, field, display_date).await {
                warn!("Failed to set {}: {}", field, e);
                all_set = false;
            }
        }
        all_set
    }

    async fn set_date_field(
        &self,
        session: &dyn AutomationSession,
        field_id: &str,
        value: &str,
    ) -> Result<(), ScrapeError> {
        let css = format!("#{field_id}");
        if !session.wait_for(&css, self.wait_timeout).await? {
            return Err(ScrapeError::Navigation(format!("{css} not found")));
        }

        let script = format!(
            r#"(() => {{
                const el = document.getElementById({id});
                if (!el) return false;
                el.removeAttribute('readonly');
                el.value = '';
                el.value = {value};
                for (const ev of ['input', 'change', 'blur']) {{
                    el.dispatchEvent(new Event(ev, {{bubbles: true}}));
                }}
                return true;
            }})()"#,
            id = serde_json::Value::from(field_id),
            value = serde_json::Value::from(value),
        );
        match session.run_script(&script).await? {
            serde_json::Value::Bool(false) => {
                Err(ScrapeError::Navigation(format!("{css} not writable")))
            }
            _ => Ok(()),
        }
    }

    /// Submit the search, falling back to an Enter key press in the "to"
    /// field when no submit control exists.
    pub async fn submit(&self, session: &dyn AutomationSession) -> Result<(), ScrapeError> {
        for query in &self.site.submit_controls {
            if !session.wait_for(&query.css, CONTROL_WAIT).await? {
                continue;
            }
            let controls = session.controls(query).await?;
            let Some(control) = controls.first() else {
                continue;
            };
            debug!("Submitting via {}", query);
            self.prepare_control(session, query, control.index).await;
            if session.click(query, control.index).await.is_ok() {
                self.settle().await;
                return Ok(());
            }
        }

        if self.press_enter(session).await {
            self.settle().await;
            return Ok(());
        }
        Err(ScrapeError::Navigation("Failed to submit form".to_string()))
    }

    /// Scroll a control into view and clear any `disabled` flag so the
    /// click that follows is not swallowed.
    async fn prepare_control(
        &self,
        session: &dyn AutomationSession,
        query: &ElementQuery,
        index: usize,
    ) {
        let script = format!(
            r#"(() => {{
                const el = document.querySelectorAll({css})[{index}];
                if (!el) return false;
                el.scrollIntoView({{block: 'center'}});
                el.disabled = false;
                el.removeAttribute('disabled');
                return true;
            }})()"#,
            css = serde_json::Value::from(query.css.as_str()),
        );
        if let Err(e) = session.run_script(&script).await {
            debug!("Could not prepare {}: {}", query, e);
        }
    }

    async fn press_enter(&self, session: &dyn AutomationSession) -> bool {
        let script = format!(
            r#"(() => {{
                const el = document.getElementById({id});
                if (!el) return false;
                for (const type of ['keydown', 'keypress', 'keyup']) {{
                    el.dispatchEvent(new KeyboardEvent(type, {{
                        key: 'Enter', code: 'Enter', keyCode: 13, which: 13, bubbles: true
                    }}));
                }}
                if (el.form) el.form.requestSubmit ? el.form.requestSubmit() : el.form.submit();
                return true;
            }})()"#,
            id = serde_json::Value::from(self.site.to_date_field.as_str()),
        );
        matches!(
            session.run_script(&script).await,
            Ok(serde_json::Value::Bool(true))
        )
    }

    /// Wait until announcement blocks or a "no records" marker appear,
    /// re-submitting once with Enter before giving up.
    pub async fn await_results(&self, session: &dyn AutomationSession) -> Result<(), ScrapeError> {
        if self.results_or_empty(session, self.wait_timeout).await? {
            return Ok(());
        }
        warn!("Results did not appear, re-submitting with Enter");
        self.press_enter(session).await;
        self.settle().await;
        if self.results_or_empty(session, RETRY_RESULTS_WAIT).await? {
            return Ok(());
        }
        Err(ScrapeError::Navigation("Failed to load results".to_string()))
    }

    async fn results_or_empty(
        &self,
        session: &dyn AutomationSession,
        timeout: Duration,
    ) -> Result<bool, ScrapeError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if session.count(&self.site.block_selector).await? > 0 {
                return Ok(true);
            }
            let text = session.page_text().await?;
            if self.site.empty_markers.iter().any(|m| text.contains(m.as_str())) {
                debug!("Portal reports no records");
                return Ok(true);
            }
            if tokio::time::Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Announcement total shown by the portal, or 0 when unreadable.
    pub async fn read_total(&self, session: &dyn AutomationSession) -> u64 {
        let primary = ElementQuery::css(&self.site.total_selector);
        if session
            .wait_for(&primary.css, CONTROL_WAIT)
            .await
            .unwrap_or(false)
        {
            if let Ok(controls) = session.controls(&primary).await {
                if let Some(n) = controls.first().and_then(|c| first_integer(&c.text)) {
                    return n;
                }
            }
        }

        let fallback = ElementQuery::css(&self.site.total_fallback_selector);
        match session.controls(&fallback).await {
            Ok(controls) => {
                let joined = controls
                    .iter()
                    .map(|c| c.text.trim())
                    .filter(|t| !t.is_empty())
                    .collect::<Vec<_>>()
                    .join(" ");
                last_integer(&joined).unwrap_or(0)
            }
            Err(_) => 0,
        }
    }
}

fn first_integer(text: &str) -> Option<u64> {
    INTEGER.find(text).and_then(|m| m.as_str().parse().ok())
}

fn last_integer(text: &str) -> Option<u64> {
    INTEGER.find_iter(text).last().and_then(|m| m.as_str().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::browser::HtmlFixtureSession;

    fn portal() -> Portal {
        let site = SiteConfig {
            settle_delay_ms: 0,
            ..SiteConfig::default()
        };
        let browser = BrowserEngineConfig {
            wait_timeout: 0,
            page_load_timeout: 0,
            ..BrowserEngineConfig::default()
        };
        Portal::new(site, &browser)
    }

    const FORM: &str = r#"<html><body>
        <button id="onetrust-accept-btn-handler">Accept All</button>
        <input id="txtFromDt" readonly><input id="txtToDt" readonly>
        <input id="btnSubmit" type="button" value="Submit">
        <div class="col-lg-6 text-right ng-binding">Total <b class="ng-binding">128</b> announcements</div>
        <table ng-repeat="cann in CorpannData.Table"><tr><td>ACME</td></tr></table>
    </body></html>"#;

    #[test]
    fn test_integer_helpers() {
        assert_eq!(first_integer("Showing 1 - 50 of 312"), Some(1));
        assert_eq!(last_integer("Showing 1 - 50 of 312"), Some(312));
        assert_eq!(first_integer("none"), None);
    }

    #[tokio::test]
    async fn test_form_flow_against_fixture() {
        let session = HtmlFixtureSession::new(vec![FORM.to_string()]);
        let portal = portal();

        portal.open(&session).await.unwrap();
        assert!(portal.set_dates(&session, "15/03/2024").await);
        portal.submit(&session).await.unwrap();
        portal.await_results(&session).await.unwrap();
        assert_eq!(portal.read_total(&session).await, 128);

        let log = session.log();
        let log = log.lock().unwrap();
        assert_eq!(log.navigations, vec![portal.site().listing_url.clone()]);
        assert!(log.clicks.iter().any(|c| c == "#onetrust-accept-btn-handler"));
        assert!(log.clicks.iter().any(|c| c == "#btnSubmit"));
        assert_eq!(
            log.scripts
                .iter()
                .filter(|s| s.contains("\"15/03/2024\""))
                .count(),
            2
        );
    }

    #[tokio::test]
    async fn test_disabled_submit_is_enabled_before_click() {
        let page = r#"<html><body>
            <input id="txtFromDt"><input id="txtToDt">
            <input id="btnSubmit" type="button" value="Submit" disabled>
        </body></html>"#;
        let session = HtmlFixtureSession::new(vec![page.to_string()]);
        portal().submit(&session).await.unwrap();

        let log = session.log();
        let log = log.lock().unwrap();
        assert_eq!(log.clicks, vec!["#btnSubmit".to_string()]);
        assert!(log
            .scripts
            .iter()
            .any(|s| s.contains("\"#btnSubmit\"") && s.contains("el.disabled = false")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_total_fallback_uses_last_integer() {
        let page = r#"<html><body>
            <div class="col-lg-6 text-right">Page 1 of 7</div>
            <div class="col-lg-6 text-right">Records 64</div>
        </body></html>"#;
        let session = HtmlFixtureSession::new(vec![page.to_string()]);
        let portal = Portal::new(SiteConfig::default(), &BrowserEngineConfig::default());
        assert_eq!(portal.read_total(&session).await, 64);
    }

    #[tokio::test]
    async fn test_total_defaults_to_zero() {
        let session = HtmlFixtureSession::new(vec!["<html><body></body></html>".to_string()]);
        tokio::time::pause();
        assert_eq!(portal().read_total(&session).await, 0);
    }

    #[tokio::test]
    async fn test_empty_marker_counts_as_loaded() {
        let page = "<html><body><p>No Records Found</p></body></html>";
        let session = HtmlFixtureSession::new(vec![page.to_string()]);
        portal().await_results(&session).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_results_fail() {
        let session = HtmlFixtureSession::new(vec!["<html><body></body></html>".to_string()]);
        let err = portal().await_results(&session).await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to load results");
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_falls_back_to_enter() {
        let page = r#"<html><body><input id="txtToDt"></body></html>"#;
        let session = HtmlFixtureSession::new(vec![page.to_string()]);
        portal().submit(&session).await.unwrap();
        let log = session.log();
        assert!(log.lock().unwrap().scripts.iter().any(|s| s.contains("Enter")));
    }
}
