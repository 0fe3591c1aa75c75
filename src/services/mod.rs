//! Domain logic for the order-award pipeline.
//!
//! Pure parsing and classification live here alongside the document
//! enrichment pool. Nothing in this module touches the browser.

pub mod calendar;
pub mod classifier;
pub mod company;
pub mod dedup;
pub mod enrichment;
pub mod order_values;

pub use calendar::{Calendar, ValidatedDate};
pub use classifier::{normalize_text, AnnouncementClassifier};
pub use company::normalize_company_name;
pub use dedup::dedupe_candidates;
pub use enrichment::{is_allowed_document_url, EnrichmentPool, EnrichmentSummary};
pub use order_values::{extract_order_values, CurrencyUnit};
