//! Executes one job from browser launch to cached result.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use super::job::{ScrapeJob, MSG_COMPLETED, MSG_FROM_CACHE};
use crate::cache::ResultCache;
use crate::config::Settings;
use crate::error::ScrapeError;
use crate::models::{Milestone, ScrapeResult};
use crate::scrapers::{AutomationSession, PageScraper, Paginator, Portal, SessionFactory};
use crate::services::classifier::AnnouncementClassifier;
use crate::services::dedup::dedupe_candidates;
use crate::services::enrichment::EnrichmentPool;

/// Shared, job-independent machinery used by every run.
pub struct JobRunner {
    sessions: Arc<dyn SessionFactory>,
    portal: Portal,
    scraper: PageScraper,
    enrichment: EnrichmentPool,
    cache: Arc<ResultCache>,
    max_pages: u32,
    wait_timeout: Duration,
}

impl JobRunner {
    pub fn new(
        settings: &Settings,
        sessions: Arc<dyn SessionFactory>,
        enrichment: EnrichmentPool,
        cache: Arc<ResultCache>,
    ) -> Result<Self, ScrapeError> {
        let wait_timeout = Duration::from_secs(settings.browser.wait_timeout);
        let scraper = PageScraper::new(
            settings.site.clone(),
            AnnouncementClassifier::new(&settings.classifier),
            wait_timeout,
        )?;
        Ok(Self {
            sessions,
            portal: Portal::new(settings.site.clone(), &settings.browser),
            scraper,
            enrichment,
            cache,
            max_pages: settings.jobs.max_pages,
            wait_timeout,
        })
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    /// Drive `job` to a terminal state.
    pub async fn run(&self, job: &ScrapeJob) {
        if let Some(cached) = self.cache.get(job.date()) {
            info!("[{}] Serving {} from cache", short_id(job), job.date().display);
            job.complete(cached, MSG_FROM_CACHE);
            return;
        }

        if !job.start() {
            debug!("[{}] Job already started or finished", short_id(job));
            return;
        }
        job.advance(Milestone::BrowserSetup, "Setting up browser...");

        let outcome = if job.cancel_token().is_cancelled() {
            Err(ScrapeError::Cancelled)
        } else {
            match self.sessions.open().await {
                Ok(session) => {
                    let outcome = self.drive(job, session.as_ref()).await;
                    if let Err(e) = session.close().await {
                        warn!("[{}] Failed to close browser session: {}", short_id(job), e);
                    }
                    outcome
                }
                Err(e) => Err(e.into()),
            }
        };

        match outcome {
            Ok(result) => {
                match self.cache.put(job.date(), &result) {
                    Ok(true) => debug!("[{}] Result cached", short_id(job)),
                    Ok(false) => debug!("[{}] Result not cacheable", short_id(job)),
                    Err(e) => warn!("[{}] Failed to cache result: {}", short_id(job), e),
                }
                info!(
                    "[{}] Completed {}: {} awards worth {:.2} crore",
                    short_id(job),
                    result.date,
                    result.total_awards,
                    result.total_value_crores
                );
                job.complete(Arc::new(result), MSG_COMPLETED);
            }
            Err(e) if e.is_cancellation() => {
                info!("[{}] Scraper stopped", short_id(job));
                job.stop();
            }
            Err(e) => {
                error!("[{}] Scraping failed: {}", short_id(job), e);
                job.fail(&e.to_string());
            }
        }
    }

    async fn drive(
        &self,
        job: &ScrapeJob,
        session: &dyn AutomationSession,
    ) -> Result<ScrapeResult, ScrapeError> {
        let cancel = job.cancel_token();
        let date = job.date();
        let checkpoint = || {
            if cancel.is_cancelled() {
                Err(ScrapeError::Cancelled)
            } else {
                Ok(())
            }
        };

        checkpoint()?;
        job.advance(Milestone::Navigation, "Opening announcements page...");
        self.portal.open(session).await?;

        checkpoint()?;
        job.advance(
            Milestone::DateEntry,
            format!("Setting date to {}...", date.display),
        );
        if !self.portal.set_dates(session, &date.display).await {
            warn!("Date fields may not have been set correctly, continuing...");
        }

        checkpoint()?;
        job.advance(Milestone::FormSubmission, "Submitting form...");
        self.portal.submit(session).await?;

        checkpoint()?;
        job.advance(Milestone::ResultWait, "Waiting for results...");
        self.portal.await_results(session).await?;
        let total = self.portal.read_total(session).await;
        job.set_total_announcements(total);

        checkpoint()?;
        job.advance(
            Milestone::PageScan,
            "Scanning announcements for order wins...",
        );
        let candidates = Paginator::new(&self.scraper, self.max_pages, self.wait_timeout)
            .collect(session, cancel)
            .await?;
        let mut candidates = dedupe_candidates(candidates);

        checkpoint()?;
        if !candidates.is_empty() {
            job.advance(Milestone::Enrichment, "Analyzing PDFs for order values...");
            let summary = self.enrichment.enrich(&mut candidates, cancel).await;
            debug!(
                "[{}] Enrichment: {} enriched, {} failed, {} without document",
                short_id(job),
                summary.enriched,
                summary.failed,
                summary.skipped
            );
            checkpoint()?;
        }

        job.advance(Milestone::Finalize, "Finalizing results...");
        Ok(ScrapeResult::finalize(date.display.clone(), candidates, total))
    }
}

fn short_id(job: &ScrapeJob) -> &str {
    job.id().get(..8).unwrap_or(job.id())
}
