//! The polling loop.
//!
//! Runs in the foreground on the main thread: refresh the config, fetch every
//! feed sequentially, post what is new, persist the watermarks, then sleep.
//!
//! [`run_cycle`] is the unit of work and takes its collaborators as trait
//! objects so it can be driven entirely in memory by tests.  [`run`] wraps it
//! with the file and network plumbing.

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;

use crate::chat::{ChatClient, SlackClient};
use crate::config::{self, Config};
use crate::dispatch::{dispatch, Outcome};
use crate::select::select;
use crate::source::{DataSource, HttpSource};
use crate::state::State;

/// Default time between cycles.
pub const POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Counters for one cycle, logged at the end of it.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub feeds: usize,
    pub fetch_failures: usize,
    pub posted: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Process every configured feed once.
///
/// Fetch failures skip the feed.  Unparseable item dates abort the cycle
/// with an error; the watermarks of feeds already processed in this cycle
/// have been advanced in `state`.
pub fn run_cycle(
    config: &Config,
    state: &mut State,
    source: &dyn DataSource,
    chat: &dyn ChatClient,
) -> Result<CycleReport> {
    let channels = chat
        .channel_ids()
        .context("Failed to list chat channels")?;

    let mut report = CycleReport::default();

    for feed in &config.feeds {
        report.feeds += 1;
        tracing::info!(feed = %feed.name, url = %feed.url, "Polling feed");

        let items = match source.fetch(&feed.url) {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(feed = %feed.name, error = %e, "Failed to fetch feed, skipping");
                report.fetch_failures += 1;
                continue;
            }
        };

        let watermark = state.watermark_mut(&feed.name).clone();
        let selection = select(&feed.name, &feed.filter, &watermark, &items)?;

        for item in &selection.dispatch {
            match dispatch(chat, &channels, feed, item) {
                Outcome::Posted => report.posted += 1,
                Outcome::UnknownChannel => report.skipped += 1,
                Outcome::Failed => report.failed += 1,
            }
        }
        state.advance(&feed.name, selection.watermark);
    }

    Ok(report)
}

/// Options for [`run`], straight from the command line.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub config_path: PathBuf,
    pub state_path: PathBuf,
    pub config_url: Option<String>,
    pub interval: Duration,
    pub once: bool,
}

/// Poll until a fatal error occurs (or after one cycle with `once`).
pub fn run(options: &RunOptions) -> Result<()> {
    let mut state = State::load(&options.state_path, Utc::now())
        .with_context(|| format!("Failed to load state from {}", options.state_path.display()))?;
    let source = HttpSource::new()?;

    loop {
        let config = refresh_config(options)?;

        let token = config.slack_token.clone().with_context(|| {
            format!(
                "No Slack token configured: set {} or slackToken",
                config::ENV_SLACK_TOKEN
            )
        })?;
        let chat = SlackClient::new(token).context("Failed to build Slack client")?;

        let report = run_cycle(&config, &mut state, &source, &chat)?;
        tracing::info!(
            feeds = report.feeds,
            fetch_failures = report.fetch_failures,
            posted = report.posted,
            skipped = report.skipped,
            failed = report.failed,
            "Cycle complete"
        );

        state.last_run = Utc::now();
        state
            .save(&options.state_path)
            .with_context(|| format!("Failed to save state to {}", options.state_path.display()))?;

        if options.once {
            return Ok(());
        }

        tracing::info!(seconds = options.interval.as_secs(), "Sleeping");
        thread::sleep(options.interval);
    }
}

/// Pull the remote config (if any) and load the local file.
///
/// A failed download is logged and the file already on disk is used.
fn refresh_config(options: &RunOptions) -> Result<Config> {
    if let Some(url) = &options.config_url {
        if let Err(e) = config::download(url, &options.config_path) {
            tracing::warn!(url = %url, error = %e, "Config download failed, keeping previous config");
        }
    }
    Config::load(&options.config_path)
        .with_context(|| format!("Failed to load config from {}", options.config_path.display()))
}
