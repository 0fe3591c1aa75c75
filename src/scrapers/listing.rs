//! Extraction of order-award candidates from one rendered results page.

use std::time::Duration;

use scraper::{ElementRef, Html, Selector};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use super::browser::{collapse_whitespace, AutomationSession};
use crate::config::SiteConfig;
use crate::error::ScrapeError;
use crate::models::{AnnouncementCandidate, NOT_PARSED, NO_PDF_LINK, NO_SUMMARY};
use crate::services::classifier::AnnouncementClassifier;
use crate::services::company::normalize_company_name;

/// Minimum length of a row's text for it to count as a summary.
const MIN_SUMMARY_CHARS: usize = 10;

struct Selectors {
    block: Selector,
    row: Selector,
    cell: Selector,
    title: Selector,
    inline: Selector,
    link: Selector,
}

fn compile(css: &str) -> Result<Selector, ScrapeError> {
    Selector::parse(css).map_err(|e| ScrapeError::InvalidSelector {
        selector: css.to_string(),
        reason: e.to_string(),
    })
}

fn text_of(el: ElementRef<'_>) -> String {
    collapse_whitespace(&el.text().collect::<String>())
}

/// Turns announcement blocks into classified candidates.
pub struct PageScraper {
    site: SiteConfig,
    selectors: Selectors,
    classifier: AnnouncementClassifier,
    base_url: Option<Url>,
    wait_timeout: Duration,
}

impl PageScraper {
    pub fn new(
        site: SiteConfig,
        classifier: AnnouncementClassifier,
        wait_timeout: Duration,
    ) -> Result<Self, ScrapeError> {
        let selectors = Selectors {
            block: compile(&site.block_selector)?,
            row: compile(&site.row_selector)?,
            cell: compile(&site.cell_selector)?,
            title: compile(&site.title_selector)?,
            inline: compile(&site.inline_selector)?,
            link: compile(&site.link_selector)?,
        };
        let base_url = Url::parse(&site.base_url).ok();
        Ok(Self {
            site,
            selectors,
            classifier,
            base_url,
            wait_timeout,
        })
    }

    pub fn site(&self) -> &SiteConfig {
        &self.site
    }

    /// Wait for the page's blocks and extract its candidates.
    ///
    /// A page whose blocks never appear yields no candidates.
    pub async fn scrape_page(
        &self,
        session: &dyn AutomationSession,
        page_num: u32,
        cancel: &CancellationToken,
    ) -> Result<Vec<AnnouncementCandidate>, ScrapeError> {
        if !session
            .wait_for(&self.site.block_selector, self.wait_timeout)
            .await?
        {
            debug!("No announcement blocks on page {}", page_num);
            return Ok(Vec::new());
        }
        let html = session.content().await?;
        Ok(self.parse_page(&html, page_num, cancel))
    }

    /// Extract candidates from page markup.
    ///
    /// Stops early, returning what it has, once `cancel` fires. A block that
    /// cannot be read is skipped.
    pub fn parse_page(
        &self,
        html: &str,
        page_num: u32,
        cancel: &CancellationToken,
    ) -> Vec<AnnouncementCandidate> {
        let doc = Html::parse_document(html);
        let mut found = Vec::new();

        for (idx, block) in doc.select(&self.selectors.block).enumerate() {
            if cancel.is_cancelled() {
                break;
            }
            let announcement_num = (idx + 1) as u32;
            match self.parse_block(block, page_num, announcement_num) {
                Ok(Some(candidate)) => found.push(candidate),
                Ok(None) => {}
                Err(reason) => {
                    debug!(
                        "Skipping announcement {} on page {}: {}",
                        announcement_num, page_num, reason
                    );
                }
            }
        }

        debug!("Page {}: {} order candidates", page_num, found.len());
        found
    }

    fn parse_block(
        &self,
        block: ElementRef<'_>,
        page: u32,
        announcement_num: u32,
    ) -> Result<Option<AnnouncementCandidate>, String> {
        let rows: Vec<ElementRef<'_>> = block.select(&self.selectors.row).collect();
        let first_row = rows.first().ok_or("block has no rows")?;
        let first_cells: Vec<ElementRef<'_>> = first_row.select(&self.selectors.cell).collect();

        let raw_company = first_cells.first().map(|c| text_of(*c)).unwrap_or_default();
        let title = self.title_of(block, &first_cells);
        let summary = rows
            .iter()
            .skip(1)
            .map(|r| text_of(*r))
            .find(|t| !t.is_empty() && *t != title && t.chars().count() > MIN_SUMMARY_CHARS)
            .unwrap_or_default();

        if !self.classifier.is_order_announcement(&title, &summary) {
            return Ok(None);
        }

        let pdf_link = self.document_link(block);
        Ok(Some(AnnouncementCandidate {
            page,
            announcement_num,
            company: normalize_company_name(&raw_company, &title),
            raw_company,
            title,
            summary: if summary.is_empty() {
                NO_SUMMARY.to_string()
            } else {
                summary
            },
            pdf_link: pdf_link.unwrap_or_else(|| NO_PDF_LINK.to_string()),
            order_values: Vec::new(),
            total_value_crores: 0.0,
            pdf_extract: NOT_PARSED.to_string(),
        }))
    }

    /// Title element, else the second cell, else the first inline element
    /// mentioning a title keyword.
    fn title_of(&self, block: ElementRef<'_>, first_cells: &[ElementRef<'_>]) -> String {
        if let Some(title) = block
            .select(&self.selectors.title)
            .next()
            .map(text_of)
            .filter(|t| !t.is_empty())
        {
            return title;
        }
        if let Some(title) = first_cells.get(1).map(|c| text_of(*c)).filter(|t| !t.is_empty()) {
            return title;
        }
        block
            .select(&self.selectors.inline)
            .map(text_of)
            .find(|t| self.site.title_keywords.iter().any(|k| t.contains(k.as_str())))
            .unwrap_or_default()
    }

    /// First hyperlink that looks like a document, made absolute.
    fn document_link(&self, block: ElementRef<'_>) -> Option<String> {
        block
            .select(&self.selectors.link)
            .filter_map(|a| a.value().attr("href"))
            .map(str::trim)
            .find(|href| {
                let lower = href.to_lowercase();
                self.site
                    .document_link_markers
                    .iter()
                    .any(|m| lower.contains(m.as_str()))
            })
            .map(|href| self.absolutize(href))
    }

    fn absolutize(&self, href: &str) -> String {
        if let Ok(url) = Url::parse(href) {
            return url.to_string();
        }
        self.base_url
            .as_ref()
            .and_then(|base| base.join(href).ok())
            .map(|u| u.to_string())
            .unwrap_or_else(|| href.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scraper() -> PageScraper {
        PageScraper::new(
            SiteConfig::default(),
            AnnouncementClassifier::default(),
            Duration::ZERO,
        )
        .unwrap()
    }

    fn block(company: &str, title: &str, summary: &str, href: &str) -> String {
        format!(
            r#"<table ng-repeat="cann in CorpannData.Table">
                <tr><td>{company}</td><td><span ng-bind-html='cann.NEWSSUB'>{title}</span></td></tr>
                <tr><td>{summary}</td></tr>
                <tr><td><a href="{href}">PDF</a></td></tr>
            </table>"#
        )
    }

    fn page(blocks: &[String]) -> String {
        format!("<html><body>{}</body></html>", blocks.join("\n"))
    }

    #[test]
    fn test_extracts_award_candidate() {
        let html = page(&[block(
            "XYZ LTD (500123)",
            "Announcement under Regulation 30 - Award of Order",
            "XYZ Ltd has received a work order worth Rs. 120.50 crore",
            "/xml-data/corpfiling/AttachLive/abc.pdf",
        )]);
        let found = scraper().parse_page(&html, 2, &CancellationToken::new());

        assert_eq!(found.len(), 1);
        let c = &found[0];
        assert_eq!(c.page, 2);
        assert_eq!(c.announcement_num, 1);
        assert_eq!(c.company, "Xyz Ltd");
        assert_eq!(c.raw_company, "XYZ LTD (500123)");
        assert_eq!(
            c.pdf_link,
            "https://www.bseindia.com/xml-data/corpfiling/AttachLive/abc.pdf"
        );
        assert_eq!(
            c.summary,
            "XYZ Ltd has received a work order worth Rs. 120.50 crore"
        );
        assert_eq!(c.pdf_extract, NOT_PARSED);
    }

    #[test]
    fn test_skips_non_orders_and_keeps_positions() {
        let html = page(&[
            block("A LTD", "Board Meeting Intimation", "Board meeting on Friday next", "/a.pdf"),
            block("B LTD", "Receipt of Order", "", "https://www.bseindia.com/b.pdf"),
        ]);
        let found = scraper().parse_page(&html, 1, &CancellationToken::new());

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].announcement_num, 2);
        assert_eq!(found[0].summary, NO_SUMMARY);
    }

    #[test]
    fn test_title_falls_back_to_second_cell_then_inline() {
        let second_cell = r#"<html><body><table ng-repeat="cann in CorpannData.Table">
            <tr><td>ACME</td><td>Letter of Award received</td></tr></table></body></html>"#;
        let found = scraper().parse_page(second_cell, 1, &CancellationToken::new());
        assert_eq!(found[0].title, "Letter of Award received");

        let inline = r#"<html><body><table ng-repeat="cann in CorpannData.Table">
            <tr><td>ACME</td></tr>
            <tr><td><span>misc</span><span>Work Order from NHAI</span></td></tr>
            </table></body></html>"#;
        let found = scraper().parse_page(inline, 1, &CancellationToken::new());
        assert_eq!(found[0].title, "Work Order from NHAI");
    }

    #[test]
    fn test_missing_link_and_rowless_block() {
        let html = r#"<html><body>
            <table ng-repeat="cann in CorpannData.Table"></table>
            <table ng-repeat="cann in CorpannData.Table">
                <tr><td>ACME</td><td>Purchase Order received</td></tr>
                <tr><td><a href="/corporates/other.html">details</a></td></tr>
            </table></body></html>"#;
        let found = scraper().parse_page(html, 1, &CancellationToken::new());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].pdf_link, NO_PDF_LINK);
        assert!(found[0].document_link().is_none());
    }

    #[test]
    fn test_cancelled_scan_stops() {
        let html = page(&[block("A", "Work order", "", "/a.pdf")]);
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(scraper().parse_page(&html, 1, &cancel).is_empty());
    }

    #[test]
    fn test_invalid_selector_rejected() {
        let site = SiteConfig {
            block_selector: "table[".to_string(),
            ..SiteConfig::default()
        };
        let err = PageScraper::new(site, AnnouncementClassifier::default(), Duration::ZERO);
        assert!(matches!(err, Err(ScrapeError::InvalidSelector { .. })));
    }
}
