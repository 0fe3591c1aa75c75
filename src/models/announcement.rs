//! Announcement candidates scraped from the listing portal.

use serde::{Deserialize, Serialize};

/// Stored in `pdf_link` when a block carried no document hyperlink.
pub const NO_PDF_LINK: &str = "No PDF available";

/// Stored in `summary` when no usable summary row was found.
pub const NO_SUMMARY: &str = "No summary available";

/// Stored in `pdf_extract` before enrichment touches the candidate.
pub const NOT_PARSED: &str = "Not parsed";

/// A monetary amount parsed from document text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderValueMatch {
    /// Amount as written, before unit conversion.
    pub value: f64,
    /// Unit token as written (lowercased), e.g. "crore", "cr", "lakhs", "mn".
    pub unit: String,
    /// Display form, e.g. "₹1,250.00 crore".
    pub formatted: String,
    /// Amount normalized to crores, rounded to 4 decimals.
    pub value_in_crores: f64,
}

/// One order-award announcement found on a listing page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnouncementCandidate {
    /// 1-based result page the block was found on.
    pub page: u32,
    /// 1-based position of the block within its page.
    pub announcement_num: u32,
    pub company: String,
    pub raw_company: String,
    pub title: String,
    pub summary: String,
    pub pdf_link: String,
    #[serde(default)]
    pub order_values: Vec<OrderValueMatch>,
    #[serde(default)]
    pub total_value_crores: f64,
    pub pdf_extract: String,
}

impl AnnouncementCandidate {
    /// The linked document, if the block had one.
    pub fn document_link(&self) -> Option<&str> {
        let link = self.pdf_link.trim();
        if link.is_empty() || link == NO_PDF_LINK {
            None
        } else {
            Some(link)
        }
    }

    /// Case-insensitive identity used for de-duplication.
    pub fn identity_key(&self) -> (String, String, String) {
        (
            self.company.trim().to_lowercase(),
            self.title.trim().to_lowercase(),
            self.pdf_link.trim().to_lowercase(),
        )
    }

    /// Attach enrichment output. The total is the 2dp-rounded sum of the
    /// canonical values.
    pub fn attach_values(&mut self, values: Vec<OrderValueMatch>, snippet: String) {
        self.total_value_crores = round_to(values.iter().map(|v| v.value_in_crores).sum(), 2);
        self.order_values = values;
        self.pdf_extract = snippet;
    }
}

/// Round half away from zero to `places` decimals.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
