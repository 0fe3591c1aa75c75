//! Result and document caches.
//!
//! [`ResultCache`] keeps finished per-date results in memory and on disk.
//! [`DocumentCache`] short-circuits repeat downloads of the same document
//! across jobs.

mod documents;
mod results;

pub use documents::{CachedDocument, DocumentCache};
pub use results::{CacheError, CachedDate, ResultCache};

use std::time::{Duration, Instant};

/// A cached value with expiration time.
#[derive(Debug, Clone)]
struct CacheEntry<T> {
    value: T,
    stored_at: Instant,
    expires_at: Instant,
}

impl<T: Clone> CacheEntry<T> {
    fn new(value: T, ttl: Duration) -> Self {
        let now = Instant::now();
        Self {
            value,
            stored_at: now,
            expires_at: now + ttl,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    fn get(&self) -> Option<T> {
        if self.is_expired() {
            None
        } else {
            Some(self.value.clone())
        }
    }
}
