//! Concurrent document enrichment.
//!
//! Each candidate with an allow-listed document link is downloaded, turned
//! into text and scanned for order values by a fixed pool of workers. A
//! failure degrades only its own candidate to a placeholder snippet.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use super::order_values::extract_order_values;
use crate::cache::{CachedDocument, DocumentCache};
use crate::config::DocumentConfig;
use crate::error::DocumentError;
use crate::models::AnnouncementCandidate;
use crate::pdf::{ExtractionError, TextExtractor};
use crate::scrapers::http_client::DocumentFetcher;

/// Snippet used when extraction succeeded but produced no text.
pub const NO_TEXT_EXTRACTED: &str = "No text extracted from PDF";

/// Counts from one enrichment batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichmentSummary {
    pub enriched: usize,
    pub failed: usize,
    /// Candidates without a document link.
    pub skipped: usize,
}

/// Whether a document link may be fetched.
///
/// The host must equal the allowed suffix or be a subdomain of it, so
/// `evilbseindia.com` is rejected for suffix `bseindia.com`.
pub fn is_allowed_document_url(link: &str, config: &DocumentConfig) -> bool {
    let Ok(url) = Url::parse(link) else {
        return false;
    };
    let scheme_ok = match url.scheme() {
        "https" => true,
        "http" => !config.require_https,
        _ => false,
    };
    if !scheme_ok {
        return false;
    }

    let suffix = config
        .allowed_host_suffix
        .trim()
        .trim_start_matches('.')
        .to_lowercase();
    match url.host_str() {
        Some(host) => {
            let host = host.to_lowercase();
            !suffix.is_empty() && (host == suffix || host.ends_with(&format!(".{suffix}")))
        }
        None => false,
    }
}

/// Bounded worker pool that fetches and parses linked documents.
#[derive(Clone)]
pub struct EnrichmentPool {
    fetcher: Arc<dyn DocumentFetcher>,
    extractor: Arc<dyn TextExtractor>,
    cache: Arc<DocumentCache>,
    config: DocumentConfig,
}

impl EnrichmentPool {
    pub fn new(
        fetcher: Arc<dyn DocumentFetcher>,
        extractor: Arc<dyn TextExtractor>,
        cache: Arc<DocumentCache>,
        config: DocumentConfig,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            cache,
            config,
        }
    }

    /// Enrich every eligible candidate in place.
    ///
    /// Workers stop claiming new documents once `cancel` fires; documents
    /// already in flight finish.
    pub async fn enrich(
        &self,
        candidates: &mut [AnnouncementCandidate],
        cancel: &CancellationToken,
    ) -> EnrichmentSummary {
        let mut summary = EnrichmentSummary::default();
        let mut queue = VecDeque::new();
        for (idx, candidate) in candidates.iter_mut().enumerate() {
            let Some(link) = candidate.document_link().map(str::to_string) else {
                summary.skipped += 1;
                continue;
            };
            if is_allowed_document_url(&link, &self.config) {
                queue.push_back((idx, link));
            } else {
                debug!("Rejected document link {}", link);
                let err = DocumentError::NotAllowed(link);
                candidate.attach_values(Vec::new(), err.placeholder().to_string());
                summary.failed += 1;
            }
        }
        if queue.is_empty() {
            return summary;
        }

        let workers = self.config.workers.max(1).min(queue.len());
        let queue = Arc::new(Mutex::new(queue));
        let mut handles = Vec::with_capacity(workers);

        for worker_id in 0..workers {
            let pool = self.clone();
            let queue = Arc::clone(&queue);
            let cancel = cancel.clone();

            handles.push(tokio::spawn(async move {
                let mut done = Vec::new();
                loop {
                    if cancel.is_cancelled() {
                        break;
                    }
                    let next = queue.lock().ok().and_then(|mut q| q.pop_front());
                    let Some((idx, url)) = next else {
                        break;
                    };
                    debug!("Worker {} fetching {}", worker_id, url);
                    let outcome = pool.process(&url).await;
                    done.push((idx, url, outcome));
                }
                done
            }));
        }

        let mut outcomes = Vec::new();
        for handle in handles {
            match handle.await {
                Ok(done) => outcomes.extend(done),
                Err(e) => warn!("Enrichment worker panicked: {}", e),
            }
        }

        for (idx, url, outcome) in outcomes {
            let Some(candidate) = candidates.get_mut(idx) else {
                continue;
            };
            match outcome {
                Ok(doc) => {
                    candidate.attach_values(doc.values, doc.snippet);
                    summary.enriched += 1;
                }
                Err(e) => {
                    warn!("Document enrichment failed for {}: {}", url, e);
                    candidate.attach_values(Vec::new(), e.placeholder().to_string());
                    summary.failed += 1;
                }
            }
        }

        summary
    }

    /// Fetch, extract and parse one document.
    pub async fn process(&self, url: &str) -> Result<CachedDocument, DocumentError> {
        if !is_allowed_document_url(url, &self.config) {
            return Err(DocumentError::NotAllowed(url.to_string()));
        }
        if let Some(hit) = self.cache.get(url) {
            debug!("Document cache hit for {}", url);
            return Ok(hit);
        }

        let limit = self.config.max_bytes;
        if self.config.probe_size {
            let head = self.fetcher.head(url).await?;
            if let Some(size) = head.content_length() {
                if size > limit {
                    return Err(DocumentError::TooLarge { size, limit });
                }
            }
        }

        let bytes = self.fetcher.get(url, limit).await?;
        let size = bytes.len() as u64;
        if size > limit {
            return Err(DocumentError::TooLarge { size, limit });
        }

        let extractor = Arc::clone(&self.extractor);
        let text = tokio::task::spawn_blocking(move || extractor.extract(&bytes))
            .await
            .map_err(|e| ExtractionError::ExtractionFailed(e.to_string()))??;

        let snippet: String = text.chars().take(self.config.snippet_chars).collect();
        let document = CachedDocument {
            values: extract_order_values(&text),
            snippet: if snippet.trim().is_empty() {
                NO_TEXT_EXTRACTED.to_string()
            } else {
                snippet
            },
        };
        self.cache.insert(url, document.clone());
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::http_client::{FetchError, HeadResponse};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct MapFetcher {
        bodies: HashMap<String, Vec<u8>>,
        declared: HashMap<String, u64>,
        gets: AtomicUsize,
    }

    #[async_trait]
    impl DocumentFetcher for MapFetcher {
        async fn head(&self, url: &str) -> Result<HeadResponse, FetchError> {
            let mut head = HeadResponse::new(200);
            if let Some(size) = self.declared.get(url) {
                head = head.with_header("content-length", &size.to_string());
            }
            Ok(head)
        }

        async fn get(&self, url: &str, max_bytes: u64) -> Result<Vec<u8>, FetchError> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            let body = self.bodies.get(url).ok_or(FetchError::Status(500))?;
            if body.len() as u64 > max_bytes {
                return Err(FetchError::TooLarge { limit: max_bytes });
            }
            Ok(body.clone())
        }
    }

    /// Treats the bytes as UTF-8 text.
    struct Utf8Extractor;

    impl TextExtractor for Utf8Extractor {
        fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
            Ok(String::from_utf8_lossy(bytes).to_string())
        }
    }

    fn candidate(link: &str) -> AnnouncementCandidate {
        AnnouncementCandidate {
            page: 1,
            announcement_num: 1,
            company: "Acme".to_string(),
            raw_company: "ACME".to_string(),
            title: "Award of Order".to_string(),
            summary: "summary".to_string(),
            pdf_link: link.to_string(),
            order_values: Vec::new(),
            total_value_crores: 0.0,
            pdf_extract: crate::models::NOT_PARSED.to_string(),
        }
    }

    fn pool(fetcher: Arc<MapFetcher>, config: DocumentConfig) -> EnrichmentPool {
        EnrichmentPool::new(
            fetcher,
            Arc::new(Utf8Extractor),
            Arc::new(DocumentCache::new(16, Duration::from_secs(60))),
            config,
        )
    }

    #[test]
    fn test_allowlist() {
        let config = DocumentConfig::default();
        assert!(is_allowed_document_url(
            "https://www.bseindia.com/xml-data/corpfiling/a.pdf",
            &config
        ));
        assert!(is_allowed_document_url("https://bseindia.com/a.pdf", &config));
        assert!(!is_allowed_document_url("http://www.bseindia.com/a.pdf", &config));
        assert!(!is_allowed_document_url("https://evilbseindia.com/a.pdf", &config));
        assert!(!is_allowed_document_url("https://bseindia.com.evil.net/a.pdf", &config));
        assert!(!is_allowed_document_url("not a url", &config));

        let relaxed = DocumentConfig {
            require_https: false,
            ..DocumentConfig::default()
        };
        assert!(is_allowed_document_url("http://www.bseindia.com/a.pdf", &relaxed));
    }

    #[tokio::test]
    async fn test_failures_stay_local() {
        let mut fetcher = MapFetcher::default();
        for i in 0..9 {
            fetcher.bodies.insert(
                format!("https://www.bseindia.com/{i}.pdf"),
                format!("Received order worth Rs. {} crore", i + 1).into_bytes(),
            );
        }
        let fetcher = Arc::new(fetcher);
        let pool = pool(Arc::clone(&fetcher), DocumentConfig::default());

        let mut candidates: Vec<_> = (0..10)
            .map(|i| candidate(&format!("https://www.bseindia.com/{i}.pdf")))
            .collect();
        let summary = pool.enrich(&mut candidates, &CancellationToken::new()).await;

        assert_eq!(summary.enriched, 9);
        assert_eq!(summary.failed, 1);
        for (i, c) in candidates.iter().take(9).enumerate() {
            assert_eq!(c.total_value_crores, (i + 1) as f64);
            assert_eq!(c.order_values.len(), 1);
        }
        let broken = &candidates[9];
        assert_eq!(broken.total_value_crores, 0.0);
        assert!(broken.order_values.is_empty());
        assert_eq!(broken.pdf_extract, "PDF extraction failed");
    }

    #[tokio::test]
    async fn test_disallowed_link_never_fetched() {
        let fetcher = Arc::new(MapFetcher::default());
        let pool = pool(Arc::clone(&fetcher), DocumentConfig::default());
        let mut candidates = vec![
            candidate("https://evil.example.com/x.pdf"),
            candidate(crate::models::NO_PDF_LINK),
        ];
        let summary = pool.enrich(&mut candidates, &CancellationToken::new()).await;

        assert_eq!(fetcher.gets.load(Ordering::SeqCst), 0);
        assert_eq!(candidates[0].pdf_extract, "PDF URL not allowed");
        assert!(candidates[0].order_values.is_empty());
        assert_eq!(candidates[1].pdf_extract, crate::models::NOT_PARSED);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.failed, 1);
    }

    #[tokio::test]
    async fn test_oversized_rejected_before_download() {
        let url = "https://www.bseindia.com/big.pdf";
        let mut fetcher = MapFetcher::default();
        fetcher.bodies.insert(url.to_string(), b"10 crore".to_vec());
        fetcher.declared.insert(url.to_string(), 1_000);
        let fetcher = Arc::new(fetcher);
        let config = DocumentConfig {
            max_bytes: 100,
            ..DocumentConfig::default()
        };
        let pool = pool(Arc::clone(&fetcher), config);

        let mut candidates = vec![candidate(url)];
        pool.enrich(&mut candidates, &CancellationToken::new()).await;

        assert_eq!(fetcher.gets.load(Ordering::SeqCst), 0);
        assert_eq!(candidates[0].pdf_extract, "PDF too large to process");
    }

    #[tokio::test]
    async fn test_capped_download_without_declared_size() {
        let url = "https://www.bseindia.com/big.pdf";
        let mut fetcher = MapFetcher::default();
        fetcher.bodies.insert(url.to_string(), vec![b'x'; 500]);
        let fetcher = Arc::new(fetcher);
        let config = DocumentConfig {
            max_bytes: 100,
            ..DocumentConfig::default()
        };
        let pool = pool(fetcher, config);

        let mut candidates = vec![candidate(url)];
        pool.enrich(&mut candidates, &CancellationToken::new()).await;
        assert_eq!(candidates[0].pdf_extract, "PDF too large to process");
    }

    #[tokio::test]
    async fn test_snippet_bounds_and_empty_text() {
        let long = "https://www.bseindia.com/long.pdf";
        let empty = "https://www.bseindia.com/empty.pdf";
        let mut fetcher = MapFetcher::default();
        fetcher.bodies.insert(long.to_string(), vec![b'a'; 2_000]);
        fetcher.bodies.insert(empty.to_string(), b"   ".to_vec());
        let pool = pool(Arc::new(fetcher), DocumentConfig::default());

        let mut candidates = vec![candidate(long), candidate(empty)];
        pool.enrich(&mut candidates, &CancellationToken::new()).await;

        assert_eq!(candidates[0].pdf_extract.chars().count(), 500);
        assert_eq!(candidates[1].pdf_extract, NO_TEXT_EXTRACTED);
    }

    #[tokio::test]
    async fn test_repeat_documents_served_from_cache() {
        let url = "https://www.bseindia.com/a.pdf";
        let mut fetcher = MapFetcher::default();
        fetcher.bodies.insert(url.to_string(), b"5 crore".to_vec());
        let fetcher = Arc::new(fetcher);
        let pool = pool(Arc::clone(&fetcher), DocumentConfig::default());

        pool.process(url).await.unwrap();
        let again = pool.process(url).await.unwrap();
        assert_eq!(again.values[0].value_in_crores, 5.0);
        assert_eq!(fetcher.gets.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancelled_batch_leaves_candidates_unparsed() {
        let url = "https://www.bseindia.com/a.pdf";
        let mut fetcher = MapFetcher::default();
        fetcher.bodies.insert(url.to_string(), b"5 crore".to_vec());
        let pool = pool(Arc::new(fetcher), DocumentConfig::default());

        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut candidates = vec![candidate(url)];
        let summary = pool.enrich(&mut candidates, &cancel).await;
        assert_eq!(summary.enriched, 0);
        assert_eq!(candidates[0].pdf_extract, crate::models::NOT_PARSED);
    }
}
