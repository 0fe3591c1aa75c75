//! Job bookkeeping: submission, lookup, cancellation and reaping.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info};

use super::job::{ScrapeJob, MSG_FROM_CACHE};
use super::runner::JobRunner;
use crate::config::JobConfig;
use crate::error::DateError;
use crate::models::{JobState, JobStatus, ScrapeResult};
use crate::services::calendar::{Calendar, ValidatedDate};

/// Acknowledgement returned by [`JobRegistry::submit`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmitReceipt {
    pub job_id: String,
    /// `dd/mm/yyyy`
    pub date: String,
    pub readable_date: String,
    /// An unfinished job for the same date was reused.
    pub reused: bool,
    pub from_cache: bool,
}

/// Outcome of a result lookup.
#[derive(Debug, Clone)]
pub enum JobResult {
    Ready(Arc<ScrapeResult>),
    NotReady,
    Failed(String),
    Stopped,
    NotFound,
}

#[derive(Default)]
struct RegistryState {
    jobs: HashMap<String, Arc<ScrapeJob>>,
    /// Display date -> id of its Pending or Running job.
    in_flight: HashMap<String, String>,
}

/// Releases a date's in-flight slot when its job task ends, panics included.
struct InFlightGuard {
    state: Arc<Mutex<RegistryState>>,
    date: String,
    job_id: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.in_flight.get(&self.date) == Some(&self.job_id) {
            state.in_flight.remove(&self.date);
        }
    }
}

/// Tracks every job and enforces one unfinished job per date.
///
/// The registry lock is never held while a job's own lock is taken.
pub struct JobRegistry {
    state: Arc<Mutex<RegistryState>>,
    runner: Arc<JobRunner>,
    calendar: Calendar,
    retention: Duration,
    max_error_chars: usize,
}

impl JobRegistry {
    pub fn new(runner: Arc<JobRunner>, calendar: Calendar, config: &JobConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(RegistryState::default())),
            runner,
            calendar,
            retention: Duration::from_secs(config.retention_minutes * 60),
            max_error_chars: config.max_error_chars,
        }
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn receipt(job_id: &str, date: &ValidatedDate, reused: bool, from_cache: bool) -> SubmitReceipt {
        SubmitReceipt {
            job_id: job_id.to_string(),
            date: date.display.clone(),
            readable_date: date.readable.clone(),
            reused,
            from_cache,
        }
    }

    /// Start (or reuse) a job for `date` (`YYYY-MM-DD`). Expired jobs are
    /// reaped first.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit(&self, date: &str) -> Result<SubmitReceipt, DateError> {
        let date = self.calendar.validate(date)?;
        self.reap_expired();

        if let Some(existing) = self.lock().in_flight.get(&date.display).cloned() {
            debug!("Reusing job {} for {}", existing, date.display);
            return Ok(Self::receipt(&existing, &date, true, false));
        }

        if let Some(cached) = self.runner.cache().get(&date) {
            let job = Arc::new(ScrapeJob::new(date.clone(), self.max_error_chars));
            job.complete(cached, MSG_FROM_CACHE);
            let id = job.id().to_string();
            self.lock().jobs.insert(id.clone(), job);
            info!("Served {} from cache as job {}", date.display, id);
            return Ok(Self::receipt(&id, &date, false, true));
        }

        let job = {
            let mut state = self.lock();
            if let Some(existing) = state.in_flight.get(&date.display).cloned() {
                return Ok(Self::receipt(&existing, &date, true, false));
            }
            let job = Arc::new(ScrapeJob::new(date.clone(), self.max_error_chars));
            state.jobs.insert(job.id().to_string(), Arc::clone(&job));
            state
                .in_flight
                .insert(date.display.clone(), job.id().to_string());
            job
        };

        let guard = InFlightGuard {
            state: Arc::clone(&self.state),
            date: date.display.clone(),
            job_id: job.id().to_string(),
        };
        let runner = Arc::clone(&self.runner);
        let task_job = Arc::clone(&job);
        tokio::spawn(async move {
            let _guard = guard;
            runner.run(&task_job).await;
        });

        info!("Started job {} for {}", job.id(), date.display);
        Ok(Self::receipt(job.id(), &date, false, false))
    }

    fn get(&self, job_id: &str) -> Option<Arc<ScrapeJob>> {
        self.lock().jobs.get(job_id).cloned()
    }

    pub fn status(&self, job_id: &str) -> Option<JobStatus> {
        self.get(job_id).map(|job| job.snapshot())
    }

    pub fn result(&self, job_id: &str) -> JobResult {
        let Some(job) = self.get(job_id) else {
            return JobResult::NotFound;
        };
        let status = job.snapshot();
        match status.state {
            JobState::Completed => match job.result() {
                Some(result) => JobResult::Ready(result),
                None => JobResult::NotReady,
            },
            JobState::Failed => JobResult::Failed(status.error.unwrap_or_default()),
            JobState::Stopped => JobResult::Stopped,
            JobState::Pending | JobState::Running => JobResult::NotReady,
        }
    }

    /// Request cancellation. False when the job is unknown or already
    /// finished.
    pub fn cancel(&self, job_id: &str) -> bool {
        match self.get(job_id) {
            Some(job) => job.request_cancel(),
            None => false,
        }
    }

    pub fn list(&self) -> Vec<JobStatus> {
        let jobs: Vec<Arc<ScrapeJob>> = self.lock().jobs.values().cloned().collect();
        let mut statuses: Vec<JobStatus> = jobs.iter().map(|j| j.snapshot()).collect();
        statuses.sort_by(|a, b| a.started_at.cmp(&b.started_at));
        statuses
    }

    /// Drop terminal jobs finished longer ago than the retention window.
    pub fn reap_expired(&self) -> usize {
        let jobs: Vec<Arc<ScrapeJob>> = self.lock().jobs.values().cloned().collect();
        let retention = chrono::Duration::from_std(self.retention).unwrap_or(chrono::Duration::MAX);
        let cutoff = Utc::now().checked_sub_signed(retention);

        let expired: Vec<String> = jobs
            .iter()
            .filter_map(|job| {
                let status = job.snapshot();
                let finished = status.finished_at?;
                let old = cutoff.map(|c| finished <= c).unwrap_or(false);
                (status.state.is_terminal() && old).then(|| job.id().to_string())
            })
            .collect();

        if !expired.is_empty() {
            let mut state = self.lock();
            for id in &expired {
                state.jobs.remove(id);
            }
            debug!("Reaped {} expired jobs", expired.len());
        }
        expired.len()
    }
}
