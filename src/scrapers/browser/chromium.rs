//! Chromium-backed automation sessions (CDP via chromiumoxide).

use crate::config::BrowserEngineConfig;

#[cfg(feature = "browser")]
pub use imp::ChromiumSessionFactory;

#[cfg(feature = "browser")]
mod imp {
    use std::path::PathBuf;
    use std::time::Duration;

    use async_trait::async_trait;
    use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
    use chromiumoxide::{Browser, BrowserConfig, Page};
    use futures::StreamExt;
    use serde::Deserialize;
    use tokio::sync::Mutex;
    use tokio::task::JoinHandle;
    use tracing::{debug, info, warn};

    use super::BrowserEngineConfig;
    use crate::config::ElementQuery;
    use crate::scrapers::browser::{
        collapse_whitespace, text_matches, AutomationSession, ControlInfo, SessionError,
        SessionFactory,
    };

    /// Common Chrome executable paths to check.
    const CHROME_PATHS: &[&str] = &[
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/snap/bin/chromium",
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
        "/opt/google/chrome/google-chrome",
    ];

    const READY_STATE_SCRIPT: &str = r#"
        new Promise((resolve) => {
            if (document.readyState === 'complete' || document.readyState === 'interactive') {
                resolve(document.readyState);
            } else {
                document.addEventListener('DOMContentLoaded', () => resolve(document.readyState));
                setTimeout(() => resolve('timeout'), 10000);
            }
        })
    "#;

    #[derive(Debug, Deserialize)]
    struct RawControl {
        text: String,
        classes: String,
        visible: bool,
    }

    /// Launches (or connects to) Chrome for each job.
    pub struct ChromiumSessionFactory {
        config: BrowserEngineConfig,
    }

    impl ChromiumSessionFactory {
        pub fn new(config: BrowserEngineConfig) -> Self {
            Self { config }
        }

        fn find_chrome() -> Result<PathBuf, SessionError> {
            for path in CHROME_PATHS {
                let p = std::path::Path::new(path);
                if p.exists() {
                    debug!("Found Chrome at: {}", path);
                    return Ok(p.to_path_buf());
                }
            }

            for cmd in &[
                "google-chrome",
                "google-chrome-stable",
                "chromium",
                "chromium-browser",
            ] {
                if let Ok(output) = std::process::Command::new("which").arg(cmd).output() {
                    if output.status.success() {
                        let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
                        if !path.is_empty() {
                            debug!("Found Chrome in PATH: {}", path);
                            return Ok(PathBuf::from(path));
                        }
                    }
                }
            }

            Err(SessionError::Launch(
                "Chrome/Chromium not found. Install chromium or set BROWSER_URL".to_string(),
            ))
        }

        async fn launch(&self) -> Result<(Browser, JoinHandle<()>), SessionError> {
            info!("Launching browser (headless={})", self.config.headless);
            let chrome_path = Self::find_chrome()?;

            let mut builder = BrowserConfig::builder()
                .chrome_executable(chrome_path)
                .request_timeout(Duration::from_secs(self.config.page_load_timeout));
            if !self.config.headless {
                builder = builder.with_head();
            }
            builder = builder
                .arg("--disable-blink-features=AutomationControlled")
                .arg("--disable-dev-shm-usage")
                .arg("--no-first-run")
                .arg("--no-default-browser-check")
                .arg("--no-sandbox")
                .arg("--disable-gpu")
                .arg("--window-size=1920,1080");
            for arg in &self.config.chrome_args {
                builder = builder.arg(arg);
            }

            let config = builder.build().map_err(SessionError::Launch)?;
            let (browser, mut handler) = Browser::launch(config)
                .await
                .map_err(|e| SessionError::Launch(e.to_string()))?;

            let task = tokio::spawn(async move {
                while let Some(h) = handler.next().await {
                    if h.is_err() {
                        break;
                    }
                }
            });
            Ok((browser, task))
        }

        async fn connect_remote(&self, url: &str) -> Result<(Browser, JoinHandle<()>), SessionError> {
            info!("Connecting to remote browser at {}", url);

            let http_url = url
                .replace("ws://", "http://")
                .replace("wss://", "https://");
            let version_url = format!("{}/json/version", http_url.trim_end_matches('/'));

            let timeout = Duration::from_secs(self.config.page_load_timeout);
            let client = reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|e| SessionError::Launch(e.to_string()))?;
            let resp: serde_json::Value = client
                .get(&version_url)
                .send()
                .await
                .map_err(|e| SessionError::Launch(format!("remote browser unreachable: {e}")))?
                .json()
                .await
                .map_err(|e| SessionError::Launch(format!("bad browser version info: {e}")))?;

            let ws_url = resp
                .get("webSocketDebuggerUrl")
                .and_then(|v| v.as_str())
                .ok_or_else(|| SessionError::Launch("No webSocketDebuggerUrl in response".into()))?;

            let handler_config = chromiumoxide::handler::HandlerConfig {
                request_timeout: timeout,
                ..Default::default()
            };
            let (browser, mut handler) =
                tokio::time::timeout(timeout, Browser::connect_with_config(ws_url, handler_config))
                    .await
                    .map_err(|_| SessionError::Timeout(timeout))?
                    .map_err(|e| SessionError::Launch(e.to_string()))?;

            let task = tokio::spawn(async move {
                while let Some(h) = handler.next().await {
                    if h.is_err() {
                        break;
                    }
                }
            });
            Ok((browser, task))
        }
    }

    #[async_trait]
    impl SessionFactory for ChromiumSessionFactory {
        async fn open(&self) -> Result<Box<dyn AutomationSession>, SessionError> {
            let (browser, handler) = match self.config.remote_url.as_deref() {
                Some(url) => self.connect_remote(url).await?,
                None => self.launch().await?,
            };

            let page = match browser.new_page("about:blank").await {
                Ok(page) => page,
                Err(e) => {
                    handler.abort();
                    return Err(SessionError::Launch(format!("failed to open tab: {e}")));
                }
            };
            if let Err(e) = page
                .execute(SetUserAgentOverrideParams::new(self.config.user_agent.clone()))
                .await
            {
                warn!("Failed to set user agent: {}", e);
            }

            Ok(Box::new(ChromiumSession {
                browser: Mutex::new(browser),
                page,
                handler,
                page_load_timeout: Duration::from_secs(self.config.page_load_timeout),
                script_timeout: Duration::from_secs(self.config.script_timeout),
            }))
        }
    }

    /// One Chrome instance with a single tab.
    pub struct ChromiumSession {
        browser: Mutex<Browser>,
        page: Page,
        handler: JoinHandle<()>,
        page_load_timeout: Duration,
        script_timeout: Duration,
    }

    impl ChromiumSession {
        async fn evaluate(&self, script: String) -> Result<serde_json::Value, SessionError> {
            let result = tokio::time::timeout(self.script_timeout, self.page.evaluate(script))
                .await
                .map_err(|_| SessionError::Timeout(self.script_timeout))?
                .map_err(|e| SessionError::Script(e.to_string()))?;
            Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
        }

        async fn js_click(&self, css: &str, index: usize) -> Result<(), SessionError> {
            let script = format!(
                r#"(() => {{
                    const el = document.querySelectorAll({css})[{index}];
                    if (!el) return false;
                    el.scrollIntoView({{block: 'center'}});
                    el.click();
                    return true;
                }})()"#,
                css = serde_json::Value::from(css),
            );
            match self.evaluate(script).await? {
                serde_json::Value::Bool(true) => Ok(()),
                _ => Err(SessionError::Interaction(format!(
                    "no element {index} for {css}"
                ))),
            }
        }
    }

    #[async_trait]
    impl AutomationSession for ChromiumSession {
        async fn navigate(&self, url: &str) -> Result<(), SessionError> {
            debug!("Navigating to {}", url);
            tokio::time::timeout(self.page_load_timeout, self.page.goto(url))
                .await
                .map_err(|_| SessionError::Timeout(self.page_load_timeout))?
                .map_err(|e| SessionError::Navigation {
                    url: url.to_string(),
                    reason: e.to_string(),
                })?;

            match self.evaluate(READY_STATE_SCRIPT.to_string()).await {
                Ok(state) => debug!("Page ready state: {}", state),
                Err(e) => warn!("Could not confirm page ready state: {}", e),
            }
            Ok(())
        }

        async fn content(&self) -> Result<String, SessionError> {
            tokio::time::timeout(self.script_timeout, self.page.content())
                .await
                .map_err(|_| SessionError::Timeout(self.script_timeout))?
                .map_err(|e| SessionError::Script(e.to_string()))
        }

        async fn count(&self, css: &str) -> Result<usize, SessionError> {
            let script = format!(
                "document.querySelectorAll({}).length",
                serde_json::Value::from(css)
            );
            Ok(self.evaluate(script).await?.as_u64().unwrap_or(0) as usize)
        }

        async fn controls(&self, query: &ElementQuery) -> Result<Vec<ControlInfo>, SessionError> {
            let script = format!(
                r#"Array.from(document.querySelectorAll({css})).map((el) => {{
                    const style = window.getComputedStyle(el);
                    const rect = el.getBoundingClientRect();
                    return {{
                        text: el.innerText || el.value || '',
                        classes: el.getAttribute('class') || '',
                        visible: style.display !== 'none'
                            && style.visibility !== 'hidden'
                            && rect.width > 0 && rect.height > 0,
                    }};
                }})"#,
                css = serde_json::Value::from(query.css.as_str()),
            );
            let raw: Vec<RawControl> = serde_json::from_value(self.evaluate(script).await?)
                .map_err(|e| SessionError::Script(e.to_string()))?;

            Ok(raw
                .into_iter()
                .enumerate()
                .map(|(index, c)| ControlInfo {
                    index,
                    text: collapse_whitespace(&c.text),
                    classes: c.classes,
                    visible: c.visible,
                })
                .filter(|c| text_matches(query, &c.text))
                .collect())
        }

        async fn click(&self, query: &ElementQuery, index: usize) -> Result<(), SessionError> {
            let native = async {
                let elements = self.page.find_elements(query.css.as_str()).await.ok()?;
                let element = elements.into_iter().nth(index)?;
                let _ = element.scroll_into_view().await;
                let clicked = element.click().await.is_ok();
                clicked.then_some(())
            };
            match tokio::time::timeout(self.script_timeout, native).await {
                Ok(Some(())) => Ok(()),
                _ => {
                    debug!("Native click on {} failed, using script click", query);
                    self.js_click(&query.css, index).await
                }
            }
        }

        async fn run_script(&self, script: &str) -> Result<serde_json::Value, SessionError> {
            self.evaluate(script.to_string()).await
        }

        async fn close(&self) -> Result<(), SessionError> {
            let mut browser = self.browser.lock().await;
            let result = tokio::time::timeout(self.script_timeout, browser.close()).await;
            if tokio::time::timeout(self.script_timeout, browser.wait())
                .await
                .is_err()
            {
                warn!("Browser process did not exit within {:?}", self.script_timeout);
            }
            self.handler.abort();
            match result {
                Ok(Ok(_)) => Ok(()),
                Ok(Err(e)) => Err(SessionError::Interaction(format!(
                    "browser close failed: {e}"
                ))),
                Err(_) => Err(SessionError::Timeout(self.script_timeout)),
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use tokio::net::TcpListener;

        #[tokio::test]
        async fn test_unresponsive_remote_browser_times_out() {
            // Accepts connections and never answers.
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            let server = tokio::spawn(async move {
                let mut held = Vec::new();
                while let Ok((stream, _)) = listener.accept().await {
                    held.push(stream);
                }
            });

            let factory = ChromiumSessionFactory::new(BrowserEngineConfig {
                remote_url: Some(format!("ws://{}", addr)),
                page_load_timeout: 1,
                ..BrowserEngineConfig::default()
            });
            let outcome = tokio::time::timeout(Duration::from_secs(10), factory.open()).await;
            server.abort();

            let result = outcome.expect("open should give up on its own");
            assert!(matches!(result, Err(SessionError::Launch(_))));
        }
    }
}

/// Stub for when the browser feature is disabled.
#[cfg(not(feature = "browser"))]
pub struct ChromiumSessionFactory {
    #[allow(dead_code)]
    config: BrowserEngineConfig,
}

#[cfg(not(feature = "browser"))]
impl ChromiumSessionFactory {
    pub fn new(config: BrowserEngineConfig) -> Self {
        Self { config }
    }
}

#[cfg(not(feature = "browser"))]
#[async_trait::async_trait]
impl super::SessionFactory for ChromiumSessionFactory {
    async fn open(&self) -> Result<Box<dyn super::AutomationSession>, super::SessionError> {
        Err(super::SessionError::Unavailable)
    }
}
