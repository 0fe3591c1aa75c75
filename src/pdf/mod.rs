//! Text extraction from downloaded PDF documents.

mod pdftotext;

pub use pdftotext::PdfToTextExtractor;

use thiserror::Error;

/// Errors that can occur during text extraction.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("External tool not found: {0}")]
    ToolNotFound(String),

    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Turns document bytes into plain text.
///
/// Implementations are blocking and are run on the blocking thread pool by
/// the enrichment pool.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError>;
}

/// Tries each extractor in turn until one yields non-blank text.
///
/// Returns the last error only when every extractor failed; an all-blank
/// outcome is an empty string.
pub struct ExtractorChain {
    extractors: Vec<Box<dyn TextExtractor>>,
}

impl ExtractorChain {
    pub fn new(extractors: Vec<Box<dyn TextExtractor>>) -> Self {
        Self { extractors }
    }
}

impl Default for ExtractorChain {
    /// Layout-preserving pass first, then raw content-stream order.
    fn default() -> Self {
        Self::new(vec![
            Box::new(PdfToTextExtractor::layout()),
            Box::new(PdfToTextExtractor::raw()),
        ])
    }
}

impl TextExtractor for ExtractorChain {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        let mut last_err = None;
        let mut any_ok = false;
        for extractor in &self.extractors {
            match extractor.extract(bytes) {
                Ok(text) if !text.trim().is_empty() => return Ok(text),
                Ok(_) => any_ok = true,
                Err(e) => {
                    tracing::debug!("Extractor failed: {}", e);
                    last_err = Some(e);
                }
            }
        }
        match last_err {
            Some(e) if !any_ok => Err(e),
            _ => Ok(String::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Result<&'static str, &'static str>);

    impl TextExtractor for Fixed {
        fn extract(&self, _bytes: &[u8]) -> Result<String, ExtractionError> {
            self.0
                .map(str::to_string)
                .map_err(|e| ExtractionError::ExtractionFailed(e.to_string()))
        }
    }

    #[test]
    fn test_chain_falls_through_blank_and_errors() {
        let chain = ExtractorChain::new(vec![
            Box::new(Fixed(Err("broken"))),
            Box::new(Fixed(Ok("   "))),
            Box::new(Fixed(Ok("order worth 5 crore"))),
        ]);
        assert_eq!(chain.extract(b"%PDF").unwrap(), "order worth 5 crore");
    }

    #[test]
    fn test_chain_all_blank_is_empty() {
        let chain = ExtractorChain::new(vec![Box::new(Fixed(Err("x"))), Box::new(Fixed(Ok("")))]);
        assert_eq!(chain.extract(b"").unwrap(), "");
    }

    #[test]
    fn test_chain_all_failed_is_error() {
        let chain = ExtractorChain::new(vec![Box::new(Fixed(Err("x")))]);
        assert!(matches!(
            chain.extract(b""),
            Err(ExtractionError::ExtractionFailed(_))
        ));
    }
}
