//! HTTP response wrappers.

use std::collections::HashMap;

/// HEAD response wrapper (no body, just headers).
#[derive(Debug, Clone, Default)]
pub struct HeadResponse {
    pub status: u16,
    /// Header names are lowercased.
    pub headers: HashMap<String, String>,
}

impl HeadResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HashMap::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_lowercase(), value.to_string());
        self
    }

    /// Check if the response is successful.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Declared body size, only trusted on successful responses.
    pub fn content_length(&self) -> Option<u64> {
        if !self.is_success() {
            return None;
        }
        self.headers
            .get("content-length")
            .and_then(|s| s.trim().parse().ok())
    }
}
