//! Listing-portal markup configuration.
//!
//! Every selector and fallback chain the scraper relies on is declared here
//! so extraction rules can be swapped without touching the scraping code.

use serde::{Deserialize, Serialize};

/// A CSS selector with an optional visible-text filter.
///
/// Stands in for XPath expressions such as `//a[contains(.,'Next')]`,
/// which become `{ css = "a", text = "Next" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementQuery {
    pub css: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl ElementQuery {
    pub fn css(css: &str) -> Self {
        Self {
            css: css.to_string(),
            text: None,
        }
    }

    pub fn css_with_text(css: &str, text: &str) -> Self {
        Self {
            css: css.to_string(),
            text: Some(text.to_string()),
        }
    }
}

impl std::fmt::Display for ElementQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.text {
            Some(text) => write!(f, "{} containing '{}'", self.css, text),
            None => f.write_str(&self.css),
        }
    }
}

/// Selectors and behavior for the announcement listing portal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SiteConfig {
    /// Page holding the date search form.
    pub listing_url: String,
    /// Prefix for relative document links.
    pub base_url: String,
    /// One element per announcement block.
    pub block_selector: String,
    /// Rows inside a block.
    pub row_selector: String,
    /// Cells inside a row.
    pub cell_selector: String,
    /// Preferred title element inside a block.
    pub title_selector: String,
    /// Inline elements scanned when neither the title element nor the
    /// second cell yields a title.
    pub inline_selector: String,
    /// Case-sensitive fragments that mark an inline element as a title.
    pub title_keywords: Vec<String>,
    /// Hyperlinks inside a block.
    pub link_selector: String,
    /// Lowercase fragments that mark a hyperlink as a document link.
    pub document_link_markers: Vec<String>,
    /// Element ids of the from/to date inputs.
    pub from_date_field: String,
    pub to_date_field: String,
    /// Cookie banner accept controls, tried in order.
    pub cookie_controls: Vec<ElementQuery>,
    /// Search form submit controls, tried in order.
    pub submit_controls: Vec<ElementQuery>,
    /// "Next page" controls, tried in order.
    pub next_controls: Vec<ElementQuery>,
    /// Class fragments that mark a "next" control as inactive.
    pub inactive_classes: Vec<String>,
    /// Lowercase fragments of page text meaning "no results".
    pub empty_markers: Vec<String>,
    /// Element holding the displayed announcement total.
    pub total_selector: String,
    /// Fallback elements whose joined text holds the total.
    pub total_fallback_selector: String,
    /// Pause after clicking a control, in milliseconds.
    pub settle_delay_ms: u64,
    /// Pause between result pages, in milliseconds.
    pub page_delay_ms: u64,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            listing_url: "https://www.bseindia.com/corporates/ann.html".to_string(),
            base_url: "https://www.bseindia.com".to_string(),
            block_selector: r#"table[ng-repeat="cann in CorpannData.Table"]"#.to_string(),
            row_selector: "tr".to_string(),
            cell_selector: "td".to_string(),
            title_selector: "span[ng-bind-html='cann.NEWSSUB']".to_string(),
            inline_selector: "span".to_string(),
            title_keywords: vec![
                "Announcement under Regulation 30".to_string(),
                "Order".to_string(),
                "Contract".to_string(),
            ],
            link_selector: "a".to_string(),
            document_link_markers: vec![".pdf".to_string(), "download".to_string()],
            from_date_field: "txtFromDt".to_string(),
            to_date_field: "txtToDt".to_string(),
            cookie_controls: vec![
                ElementQuery::css("#onetrust-accept-btn-handler"),
                ElementQuery::css("#acceptCookie"),
                ElementQuery::css_with_text("button", "Accept"),
                ElementQuery::css_with_text("a", "Accept"),
            ],
            submit_controls: vec![
                ElementQuery::css("#btnSubmit"),
                ElementQuery::css("#btnsubmit"),
                ElementQuery::css("input[type='submit']"),
                ElementQuery::css("input[type='button'][value='Search']"),
                ElementQuery::css("button#btnSearch"),
                ElementQuery::css_with_text("button", "Search"),
                ElementQuery::css("input[value='Search']"),
            ],
            next_controls: vec![
                ElementQuery::css("#idnext"),
                ElementQuery::css_with_text("a", "Next"),
                ElementQuery::css("button.next, a.next"),
            ],
            inactive_classes: vec!["disabled".to_string(), "ng-hide".to_string()],
            empty_markers: vec!["no record".to_string(), "no records".to_string()],
            total_selector: ".col-lg-6.text-right.ng-binding b.ng-binding".to_string(),
            total_fallback_selector: ".col-lg-6.text-right, .col-lg-6.text-right.ng-binding"
                .to_string(),
            settle_delay_ms: 800,
            page_delay_ms: 800,
        }
    }
}
