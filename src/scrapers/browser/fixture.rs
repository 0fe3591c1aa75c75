//! Offline automation session backed by saved HTML pages.
//!
//! Used to replay captured portal pages without a browser. Each page is one
//! result page; clicking a pagination control advances to the next page.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};

use super::{
    collapse_whitespace, text_matches, AutomationSession, ControlInfo, SessionError,
    SessionFactory,
};
use crate::config::{ElementQuery, SiteConfig};

/// Interactions recorded by a fixture session.
#[derive(Debug, Clone, Default)]
pub struct FixtureLog {
    pub navigations: Vec<String>,
    pub scripts: Vec<String>,
    pub clicks: Vec<String>,
    pub closed: bool,
}

/// Session that serves a fixed list of HTML pages.
pub struct HtmlFixtureSession {
    pages: Vec<String>,
    advance_on: Vec<ElementQuery>,
    current: Mutex<usize>,
    log: Arc<Mutex<FixtureLog>>,
}

impl HtmlFixtureSession {
    /// Pages advance when one of the default "next" controls is clicked.
    pub fn new(pages: Vec<String>) -> Self {
        Self::with_pager(pages, SiteConfig::default().next_controls)
    }

    pub fn with_pager(pages: Vec<String>, advance_on: Vec<ElementQuery>) -> Self {
        Self {
            pages,
            advance_on,
            current: Mutex::new(0),
            log: Arc::new(Mutex::new(FixtureLog::default())),
        }
    }

    /// Shared handle to this session's interaction log.
    pub fn log(&self) -> Arc<Mutex<FixtureLog>> {
        Arc::clone(&self.log)
    }

    fn record(&self) -> MutexGuard<'_, FixtureLog> {
        self.log.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn current_index(&self) -> usize {
        *self.current.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn current_page(&self) -> &str {
        self.pages
            .get(self.current_index())
            .map(String::as_str)
            .unwrap_or_default()
    }
}

fn parse_selector(css: &str) -> Result<Selector, SessionError> {
    Selector::parse(css).map_err(|e| SessionError::Interaction(format!("bad selector {css}: {e}")))
}

/// Hidden when the element or an ancestor carries `hidden` or `display: none`.
fn is_visible(el: ElementRef<'_>) -> bool {
    std::iter::once(el)
        .chain(el.ancestors().filter_map(ElementRef::wrap))
        .all(|node| {
            let attrs = node.value();
            let hidden_style = attrs
                .attr("style")
                .map(|s| s.replace(' ', "").to_lowercase().contains("display:none"))
                .unwrap_or(false);
            attrs.attr("hidden").is_none() && !hidden_style
        })
}

fn collect_controls(html: &str, query: &ElementQuery) -> Result<Vec<ControlInfo>, SessionError> {
    let selector = parse_selector(&query.css)?;
    let doc = Html::parse_document(html);
    let controls = doc
        .select(&selector)
        .enumerate()
        .map(|(index, el)| ControlInfo {
            index,
            text: collapse_whitespace(&el.text().collect::<String>()),
            classes: el.value().attr("class").unwrap_or_default().to_string(),
            visible: is_visible(el),
        })
        .filter(|c| text_matches(query, &c.text))
        .collect();
    Ok(controls)
}

#[async_trait]
impl AutomationSession for HtmlFixtureSession {
    async fn navigate(&self, url: &str) -> Result<(), SessionError> {
        *self.current.lock().unwrap_or_else(|e| e.into_inner()) = 0;
        self.record().navigations.push(url.to_string());
        Ok(())
    }

    async fn content(&self) -> Result<String, SessionError> {
        Ok(self.current_page().to_string())
    }

    async fn count(&self, css: &str) -> Result<usize, SessionError> {
        let selector = parse_selector(css)?;
        Ok(Html::parse_document(self.current_page())
            .select(&selector)
            .count())
    }

    async fn controls(&self, query: &ElementQuery) -> Result<Vec<ControlInfo>, SessionError> {
        collect_controls(self.current_page(), query)
    }

    async fn click(&self, query: &ElementQuery, index: usize) -> Result<(), SessionError> {
        let selector = parse_selector(&query.css)?;
        let exists = Html::parse_document(self.current_page())
            .select(&selector)
            .nth(index)
            .is_some();
        if !exists {
            return Err(SessionError::Interaction(format!(
                "no element {index} for {query}"
            )));
        }

        self.record().clicks.push(query.to_string());
        if self.advance_on.contains(query) {
            let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
            if *current + 1 < self.pages.len() {
                *current += 1;
            }
        }
        Ok(())
    }

    async fn run_script(&self, script: &str) -> Result<serde_json::Value, SessionError> {
        self.record().scripts.push(script.to_string());
        Ok(serde_json::Value::Bool(true))
    }

    async fn close(&self) -> Result<(), SessionError> {
        self.record().closed = true;
        Ok(())
    }

    async fn page_text(&self) -> Result<String, SessionError> {
        let doc = Html::parse_document(self.current_page());
        Ok(collapse_whitespace(&doc.root_element().text().collect::<String>()).to_lowercase())
    }
}

/// Hands out fixture sessions over the same pages and keeps their logs.
pub struct FixtureSessionFactory {
    pages: Vec<String>,
    advance_on: Vec<ElementQuery>,
    logs: Mutex<Vec<Arc<Mutex<FixtureLog>>>>,
}

impl FixtureSessionFactory {
    pub fn new(pages: Vec<String>) -> Self {
        Self::with_pager(pages, SiteConfig::default().next_controls)
    }

    pub fn with_pager(pages: Vec<String>, advance_on: Vec<ElementQuery>) -> Self {
        Self {
            pages,
            advance_on,
            logs: Mutex::new(Vec::new()),
        }
    }

    /// Logs of every session opened so far, oldest first.
    pub fn logs(&self) -> Vec<FixtureLog> {
        self.logs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|log| log.lock().unwrap_or_else(|e| e.into_inner()).clone())
            .collect()
    }
}

#[async_trait]
impl SessionFactory for FixtureSessionFactory {
    async fn open(&self) -> Result<Box<dyn AutomationSession>, SessionError> {
        let session = HtmlFixtureSession::with_pager(self.pages.clone(), self.advance_on.clone());
        self.logs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(session.log());
        Ok(Box::new(session))
    }
}
