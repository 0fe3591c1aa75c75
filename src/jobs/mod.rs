//! Asynchronous scrape jobs.
//!
//! A [`JobRegistry`] hands out job ids, runs each job on its own tokio task
//! through a shared [`JobRunner`], and answers status/result/cancel queries.

mod job;
mod registry;
mod runner;

pub use job::{ScrapeJob, MSG_COMPLETED, MSG_FAILED, MSG_FROM_CACHE, MSG_STOPPED};
pub use registry::{JobRegistry, JobResult, SubmitReceipt};
pub use runner::JobRunner;

use std::sync::Arc;

use crate::cache::{DocumentCache, ResultCache};
use crate::config::Settings;
use crate::error::ScrapeError;
use crate::pdf::TextExtractor;
use crate::scrapers::{DocumentFetcher, SessionFactory};
use crate::services::calendar::Calendar;
use crate::services::enrichment::EnrichmentPool;

/// External capabilities a registry depends on.
pub struct Collaborators {
    pub sessions: Arc<dyn SessionFactory>,
    pub fetcher: Arc<dyn DocumentFetcher>,
    pub extractor: Arc<dyn TextExtractor>,
}

impl JobRegistry {
    /// Wire caches, enrichment and the runner from settings.
    pub fn from_settings(
        settings: &Settings,
        calendar: Calendar,
        collaborators: Collaborators,
    ) -> Result<Self, ScrapeError> {
        let cache = Arc::new(ResultCache::new(&settings.cache, calendar.clone()));
        let enrichment = EnrichmentPool::new(
            collaborators.fetcher,
            collaborators.extractor,
            Arc::new(DocumentCache::from_config(&settings.documents)),
            settings.documents.clone(),
        );
        let runner = JobRunner::new(settings, collaborators.sessions, enrichment, cache)?;
        Ok(JobRegistry::new(Arc::new(runner), calendar, &settings.jobs))
    }
}
