//! A single scrape job and its state machine.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::models::{JobState, JobStatus, Milestone, ScrapeResult};
use crate::services::calendar::ValidatedDate;

pub const MSG_COMPLETED: &str = "Scraping completed";
pub const MSG_FROM_CACHE: &str = "Served from cache";
pub const MSG_FAILED: &str = "Scraping failed";
pub const MSG_STOPPED: &str = "Scraping stopped by user";
pub const MSG_STOP_REQUESTED: &str = "Stop requested";

struct JobInner {
    status: JobStatus,
    result: Option<Arc<ScrapeResult>>,
}

/// One scrape of one date.
///
/// `Pending -> Running -> {Completed, Failed, Stopped}`; terminal states
/// absorb every later transition. Status and result share one lock so a
/// snapshot never mixes two updates.
pub struct ScrapeJob {
    id: String,
    date: ValidatedDate,
    cancel: CancellationToken,
    max_error_chars: usize,
    inner: Mutex<JobInner>,
}

impl ScrapeJob {
    pub fn new(date: ValidatedDate, max_error_chars: usize) -> Self {
        let id = Uuid::new_v4().to_string();
        let status = JobStatus::new(id.clone(), date.display.clone());
        Self {
            id,
            date,
            cancel: CancellationToken::new(),
            max_error_chars,
            inner: Mutex::new(JobInner {
                status,
                result: None,
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn date(&self) -> &ValidatedDate {
        &self.date
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    fn lock(&self) -> MutexGuard<'_, JobInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn snapshot(&self) -> JobStatus {
        self.lock().status.clone()
    }

    pub fn state(&self) -> JobState {
        self.lock().status.state
    }

    /// Present only once the job has completed.
    pub fn result(&self) -> Option<Arc<ScrapeResult>> {
        self.lock().result.clone()
    }

    /// Pending -> Running.
    pub fn start(&self) -> bool {
        let mut inner = self.lock();
        if inner.status.state != JobState::Pending {
            return false;
        }
        inner.status.state = JobState::Running;
        inner.status.started_at = Some(Utc::now());
        true
    }

    /// Record a milestone on a running job.
    pub fn advance(&self, milestone: Milestone, message: impl Into<String>) -> bool {
        let mut inner = self.lock();
        if inner.status.state != JobState::Running {
            return false;
        }
        inner.status.progress = milestone.progress();
        inner.status.message = message.into();
        true
    }

    pub fn set_total_announcements(&self, total: u64) {
        let mut inner = self.lock();
        if !inner.status.state.is_terminal() {
            inner.status.total_announcements = total;
        }
    }

    /// Store the final result. Accepted from Pending too, for results
    /// served straight from cache.
    pub fn complete(&self, result: Arc<ScrapeResult>, message: &str) -> bool {
        let mut inner = self.lock();
        if inner.status.state.is_terminal() {
            return false;
        }
        let now = Utc::now();
        inner.status.state = JobState::Completed;
        inner.status.progress = 100;
        inner.status.message = message.to_string();
        inner.status.error = None;
        inner.status.total_announcements = result.total_announcements;
        inner.status.started_at.get_or_insert(now);
        inner.status.finished_at = Some(now);
        inner.result = Some(result);
        true
    }

    pub fn fail(&self, error: &str) -> bool {
        let truncated: String = error.chars().take(self.max_error_chars).collect();
        self.finish(JobState::Failed, MSG_FAILED, Some(truncated))
    }

    pub fn stop(&self) -> bool {
        self.finish(JobState::Stopped, MSG_STOPPED, Some("Stopped by user".to_string()))
    }

    fn finish(&self, state: JobState, message: &str, error: Option<String>) -> bool {
        let mut inner = self.lock();
        if inner.status.state.is_terminal() {
            return false;
        }
        inner.status.state = state;
        inner.status.progress = 0;
        inner.status.message = message.to_string();
        inner.status.error = error;
        inner.status.finished_at = Some(Utc::now());
        inner.result = None;
        true
    }

    /// Signal cancellation. The job reaches Stopped at its next checkpoint.
    pub fn request_cancel(&self) -> bool {
        {
            let mut inner = self.lock();
            if inner.status.state.is_terminal() {
                return false;
            }
            inner.status.message = MSG_STOP_REQUESTED.to_string();
        }
        self.cancel.cancel();
        true
    }
}
