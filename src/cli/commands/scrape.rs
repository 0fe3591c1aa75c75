//! Scrape command: submit a job and follow it to completion.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use console::style;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::cli::helpers::print_result;
use crate::config::Settings;
use crate::jobs::{Collaborators, JobRegistry, JobResult};
use crate::pdf::ExtractorChain;
use crate::scrapers::{ChromiumSessionFactory, FixtureSessionFactory, HttpClient, SessionFactory};
use crate::services::Calendar;

const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Scrape one date and print the ranked awards.
pub async fn cmd_scrape(
    settings: &Settings,
    date: &str,
    json: bool,
    replay: &[PathBuf],
    top: usize,
) -> anyhow::Result<()> {
    let sessions: Arc<dyn SessionFactory> = if replay.is_empty() {
        Arc::new(ChromiumSessionFactory::new(settings.browser.clone()))
    } else {
        let pages = replay
            .iter()
            .map(|path| {
                std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read replay page {}", path.display()))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        Arc::new(FixtureSessionFactory::with_pager(
            pages,
            settings.site.next_controls.clone(),
        ))
    };

    let collaborators = Collaborators {
        sessions,
        fetcher: Arc::new(HttpClient::from_config(&settings.documents)?),
        extractor: Arc::new(ExtractorChain::default()),
    };
    let calendar = Calendar::new(&settings.calendar);
    let registry = JobRegistry::from_settings(settings, calendar, collaborators)?;

    let receipt = registry.submit(date)?;
    if !json {
        let source = if receipt.from_cache { " (cached)" } else { "" };
        println!(
            "{} Order awards for {}{}",
            style("→").cyan(),
            style(&receipt.readable_date).bold(),
            source
        );
    }

    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:30.cyan/blue}] {pos:>3}% {wide_msg}")
            .unwrap()
            .progress_chars("█▓░"),
    );
    if json {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    }

    let mut interrupted = false;
    loop {
        let Some(status) = registry.status(&receipt.job_id) else {
            anyhow::bail!("Job {} is no longer tracked", receipt.job_id);
        };
        pb.set_position(u64::from(status.progress));
        pb.set_message(status.message.clone());
        if status.state.is_terminal() {
            break;
        }

        tokio::select! {
            _ = tokio::time::sleep(POLL_INTERVAL) => {}
            _ = tokio::signal::ctrl_c(), if !interrupted => {
                interrupted = true;
                registry.cancel(&receipt.job_id);
                pb.println(format!(
                    "{} Stop requested, waiting for the current step to finish",
                    style("!").yellow()
                ));
            }
        }
    }
    pb.finish_and_clear();

    match registry.result(&receipt.job_id) {
        JobResult::Ready(result) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&*result)?);
            } else {
                print_result(&result, top);
            }
            Ok(())
        }
        JobResult::Stopped => {
            println!("{} Scraping stopped by user", style("!").yellow());
            Ok(())
        }
        JobResult::Failed(error) => anyhow::bail!("Scraping failed: {}", error),
        JobResult::NotReady | JobResult::NotFound => {
            anyhow::bail!("Job {} finished without a result", receipt.job_id)
        }
    }
}
