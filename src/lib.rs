//! orderscout - order-award announcement monitor.
//!
//! Drives the exchange's corporate-announcement portal for a date, keeps the
//! announcements that report order awards, pulls order values out of their
//! linked PDFs and ranks the results. Finished dates are cached on disk.

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod jobs;
pub mod models;
pub mod pdf;
pub mod scrapers;
pub mod services;
