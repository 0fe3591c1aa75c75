//! Error types shared across the scraping pipeline.
//!
//! Job-level failures ([`ScrapeError`]) halt a job. Per-document failures
//! ([`DocumentError`]) are contained to a single candidate and degrade it to
//! a placeholder snippet.

use chrono::NaiveDate;
use thiserror::Error;

use crate::pdf::ExtractionError;
use crate::scrapers::browser::SessionError;
use crate::scrapers::http_client::FetchError;

/// Rejections produced while validating a requested date.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateError {
    #[error("Invalid date format. Expected YYYY-MM-DD, got '{0}'")]
    InvalidFormat(String),

    #[error("Date cannot be in the future: {0}")]
    FutureDate(NaiveDate),

    #[error("Date cannot be before {floor}: {date}")]
    TooOld { date: NaiveDate, floor: NaiveDate },
}

/// Outcomes that end a job without a result.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("{0}")]
    Validation(#[from] DateError),

    /// Listing page or its controls were unreachable.
    #[error("{0}")]
    Navigation(String),

    #[error("Automation session error: {0}")]
    Session(#[from] SessionError),

    #[error("Invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    /// Cooperative cancellation. Terminal state is Stopped, not Failed.
    #[error("Stopped by user")]
    Cancelled,
}

impl ScrapeError {
    pub fn is_cancellation(&self) -> bool {
        matches!(self, ScrapeError::Cancelled)
    }
}

/// Failure to turn one linked document into order values.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("PDF URL not allowed: {0}")]
    NotAllowed(String),

    #[error("PDF too large to process ({size} bytes, limit {limit})")]
    TooLarge { size: u64, limit: u64 },

    #[error("PDF fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("PDF text extraction failed: {0}")]
    Extraction(#[from] ExtractionError),
}

impl DocumentError {
    /// Snippet stored on the candidate in place of extracted text.
    pub fn placeholder(&self) -> &'static str {
        match self {
            DocumentError::NotAllowed(_) => "PDF URL not allowed",
            DocumentError::TooLarge { .. } => "PDF too large to process",
            DocumentError::Fetch(FetchError::TooLarge { .. }) => "PDF too large to process",
            DocumentError::Fetch(_) | DocumentError::Extraction(_) => "PDF extraction failed",
        }
    }
}
