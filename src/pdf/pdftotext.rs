//! Extraction via poppler's `pdftotext`.

use std::io::Write;
use std::process::Command;

use tempfile::NamedTempFile;

use super::{ExtractionError, TextExtractor};

const TOOL: &str = "pdftotext";

/// Runs `pdftotext` over a temporary copy of the document.
#[derive(Debug, Clone)]
pub struct PdfToTextExtractor {
    mode_flag: &'static str,
}

impl PdfToTextExtractor {
    pub fn layout() -> Self {
        Self {
            mode_flag: "-layout",
        }
    }

    pub fn raw() -> Self {
        Self { mode_flag: "-raw" }
    }
}

impl TextExtractor for PdfToTextExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        let mut file = NamedTempFile::new()?;
        file.write_all(bytes)?;
        file.flush()?;

        let result = Command::new(TOOL)
            .arg(self.mode_flag)
            .args(["-enc", "UTF-8"])
            .arg(file.path())
            .arg("-")
            .output();

        match result {
            Ok(output) if output.status.success() => {
                Ok(String::from_utf8_lossy(&output.stdout).to_string())
            }
            Ok(output) => Err(ExtractionError::ExtractionFailed(format!(
                "{} failed: {}",
                TOOL,
                String::from_utf8_lossy(&output.stderr).trim()
            ))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ExtractionError::ToolNotFound(TOOL.to_string()))
            }
            Err(e) => Err(ExtractionError::Io(e)),
        }
    }
}
