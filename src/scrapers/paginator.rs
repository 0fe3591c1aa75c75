//! Walks result pages until the "next" control runs out.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::browser::AutomationSession;
use super::listing::PageScraper;
use crate::error::ScrapeError;
use crate::models::AnnouncementCandidate;

pub struct Paginator<'a> {
    scraper: &'a PageScraper,
    max_pages: u32,
    wait_timeout: Duration,
}

impl<'a> Paginator<'a> {
    pub fn new(scraper: &'a PageScraper, max_pages: u32, wait_timeout: Duration) -> Self {
        Self {
            scraper,
            max_pages: max_pages.max(1),
            wait_timeout,
        }
    }

    /// Scrape every page reachable through the "next" control.
    ///
    /// Ends normally when no usable next control remains, when the next
    /// page's blocks never appear, or at the page ceiling. Returns
    /// [`ScrapeError::Cancelled`] as soon as a cancellation is observed.
    pub async fn collect(
        &self,
        session: &dyn AutomationSession,
        cancel: &CancellationToken,
    ) -> Result<Vec<AnnouncementCandidate>, ScrapeError> {
        let site = self.scraper.site();
        let mut page_num = 1;
        let mut candidates = Vec::new();

        loop {
            if cancel.is_cancelled() {
                return Err(ScrapeError::Cancelled);
            }
            let found = self.scraper.scrape_page(session, page_num, cancel).await?;
            candidates.extend(found);
            if cancel.is_cancelled() {
                return Err(ScrapeError::Cancelled);
            }

            if page_num >= self.max_pages {
                warn!(
                    "Stopping pagination at the {} page ceiling",
                    self.max_pages
                );
                break;
            }
            if !self.click_next(session).await? {
                debug!("No next control after page {}", page_num);
                break;
            }
            if !session
                .wait_for(&site.block_selector, self.wait_timeout)
                .await?
            {
                debug!("Next page never rendered after page {}", page_num);
                break;
            }
            page_num += 1;
            tokio::time::sleep(Duration::from_millis(site.page_delay_ms)).await;
        }

        info!(
            "Scanned {} page(s), {} order candidates",
            page_num,
            candidates.len()
        );
        Ok(candidates)
    }

    /// Click the first present, visible, active next control.
    async fn click_next(&self, session: &dyn AutomationSession) -> Result<bool, ScrapeError> {
        let site = self.scraper.site();
        for query in &site.next_controls {
            let controls = session.controls(query).await?;
            let Some(control) = controls.first() else {
                continue;
            };
            if !control.visible || control.has_any_class(&site.inactive_classes) {
                continue;
            }
            if session.click(query, control.index).await.is_ok() {
                tokio::time::sleep(Duration::from_millis(site.settle_delay_ms)).await;
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use crate::scrapers::browser::HtmlFixtureSession;
    use crate::services::classifier::AnnouncementClassifier;

    fn page(title: &str, next_class: &str) -> String {
        format!(
            r#"<html><body>
            <table ng-repeat="cann in CorpannData.Table">
                <tr><td>ACME</td><td>{title}</td></tr>
            </table>
            <a id="idnext" class="{next_class}">Next</a>
            </body></html>"#
        )
    }

    fn scraper() -> PageScraper {
        let site = SiteConfig {
            settle_delay_ms: 0,
            page_delay_ms: 0,
            ..SiteConfig::default()
        };
        PageScraper::new(site, AnnouncementClassifier::default(), Duration::ZERO).unwrap()
    }

    #[tokio::test]
    async fn test_walks_until_disabled_next() {
        let session = HtmlFixtureSession::new(vec![
            page("Work order one", ""),
            page("Work order two", ""),
            page("Work order three", "disabled"),
        ]);
        let scraper = scraper();
        let found = Paginator::new(&scraper, 500, Duration::ZERO)
            .collect(&session, &CancellationToken::new())
            .await
            .unwrap();

        let pages: Vec<u32> = found.iter().map(|c| c.page).collect();
        assert_eq!(pages, vec![1, 2, 3]);
        assert_eq!(found[2].title, "Work order three");
    }

    #[tokio::test]
    async fn test_page_ceiling() {
        let session = HtmlFixtureSession::new(vec![
            page("Work order one", ""),
            page("Work order two", ""),
        ]);
        let scraper = scraper();
        let found = Paginator::new(&scraper, 1, Duration::ZERO)
            .collect(&session, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn test_hidden_next_ends_pagination() {
        let hidden = r#"<html><body>
            <table ng-repeat="cann in CorpannData.Table"><tr><td>A</td><td>Work order</td></tr></table>
            <a id="idnext" class="ng-hide">Next</a>
            <a class="next" style="display:none">Next</a>
            </body></html>"#;
        let session = HtmlFixtureSession::new(vec![hidden.to_string(), page("Work order two", "")]);
        let scraper = scraper();
        let found = Paginator::new(&scraper, 500, Duration::ZERO)
            .collect(&session, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn test_cancel_returns_cancelled() {
        let session = HtmlFixtureSession::new(vec![page("Work order", "")]);
        let scraper = scraper();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = Paginator::new(&scraper, 500, Duration::ZERO)
            .collect(&session, &cancel)
            .await
            .unwrap_err();
        assert!(err.is_cancellation());
    }
}
