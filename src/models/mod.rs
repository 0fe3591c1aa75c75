//! Data models for orderscout.

mod announcement;
mod job;
mod result;

pub use announcement::{
    round_to, AnnouncementCandidate, OrderValueMatch, NOT_PARSED, NO_PDF_LINK, NO_SUMMARY,
};
pub use job::{JobState, JobStatus, Milestone};
pub use result::{ScrapeResult, ValueStatistics, NO_AWARDS_MESSAGE};
