//! Job lifecycle models exposed through the status interface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a scrape job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending,
    Running,
    Completed,
    Failed,
    Stopped,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Stopped => "stopped",
        }
    }

    /// Completed, Failed and Stopped admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Stopped)
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse progress checkpoints of a running job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Milestone {
    BrowserSetup,
    Navigation,
    DateEntry,
    FormSubmission,
    ResultWait,
    PageScan,
    Enrichment,
    Finalize,
}

impl Milestone {
    pub fn progress(&self) -> u8 {
        match self {
            Self::BrowserSetup => 10,
            Self::Navigation => 20,
            Self::DateEntry => 30,
            Self::FormSubmission => 40,
            Self::ResultWait => 50,
            Self::PageScan => 60,
            Self::Enrichment => 75,
            Self::Finalize => 90,
        }
    }
}

/// Point-in-time snapshot of a job, safe to hand to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatus {
    pub job_id: String,
    /// Display date (`dd/mm/yyyy`) the job scrapes.
    pub date: String,
    pub state: JobState,
    /// 0-100.
    pub progress: u8,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub total_announcements: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl JobStatus {
    pub fn new(job_id: String, date: String) -> Self {
        Self {
            job_id,
            date,
            state: JobState::Pending,
            progress: 0,
            message: "Queued".to_string(),
            error: None,
            total_announcements: 0,
            started_at: None,
            finished_at: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.state == JobState::Running
    }
}
