//! feed-relay: polls RSS/Atom feeds and relays new items to Slack.
//!
//! ## Architecture overview
//!
//! ```text
//! ┌───────────┐ items ┌───────────┐ selected ┌─────────────┐ post ┌─────────┐
//! │ source/   │ ────► │ select.rs │ ───────► │ dispatch.rs │ ───► │ chat/   │
//! │ (fetch)   │       │ (core)    │          │             │      │ (Slack) │
//! └───────────┘       └───────────┘          └─────────────┘      └─────────┘
//!                           │ watermark
//!                           ▼
//!                     ┌───────────┐
//!                     │ state.rs  │  (YAML lock file)
//!                     └───────────┘
//! ```
//!
//! * **`source/`** — the `DataSource` trait, HTTP fetching, RSS and Atom parsing.
//! * **`timestamp`** — lenient publish-date parsing.
//! * **`select`** — decides which items are new and which pass the filter.
//! * **`state`** — the per-feed watermark store.
//! * **`dispatch`** — posts items, including spoiler threads.
//! * **`chat/`** — the `ChatClient` trait and the Slack implementation.
//! * **`config`** — `conf.yaml` loading, remote refresh and linting.
//! * **`poll`** — one cycle, and the forever loop around it.

mod chat;
mod config;
mod dispatch;
mod poll;
mod select;
mod source;
mod state;
mod timestamp;
mod util;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;

use config::Config;
use poll::RunOptions;
use state::State;

#[derive(Parser, Debug)]
#[command(
    name = "feed-relay",
    version,
    about = "Relay new RSS/Atom items to Slack channels"
)]
struct Args {
    /// Lint the config and state files, then exit
    #[arg(long)]
    lint: bool,

    /// Feed configuration file
    #[arg(long, value_name = "FILE", default_value = "conf.yaml")]
    config: PathBuf,

    /// Watermark state file
    #[arg(long, value_name = "FILE", default_value = "feed-relay.lock")]
    state: PathBuf,

    /// Download the config from this URL before every cycle
    #[arg(long, value_name = "URL")]
    config_url: Option<String>,

    /// Seconds to sleep between cycles
    #[arg(long, value_name = "SECS", default_value_t = poll::POLL_INTERVAL.as_secs())]
    interval: u64,

    /// Run a single cycle and exit
    #[arg(long)]
    once: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    if args.lint {
        return lint(&args.config, &args.state);
    }

    poll::run(&RunOptions {
        config_path: args.config,
        state_path: args.state,
        config_url: args.config_url,
        interval: Duration::from_secs(args.interval),
        once: args.once,
    })
}

/// Parse both files the way a real run would, reporting soft problems.
fn lint(config_path: &Path, state_path: &Path) -> Result<()> {
    tracing::info!("Linting config files...");

    let config = Config::load(config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    for warning in config.lint_warnings() {
        tracing::warn!("{warning}");
    }

    State::load(state_path, Utc::now())
        .with_context(|| format!("Failed to load state from {}", state_path.display()))?;

    tracing::info!(feeds = config.feeds.len(), "Success!");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_defaults() {
        let args = Args::try_parse_from(["feed-relay"]).unwrap();
        assert!(!args.lint);
        assert!(!args.once);
        assert_eq!(args.config, PathBuf::from("conf.yaml"));
        assert_eq!(args.state, PathBuf::from("feed-relay.lock"));
        assert_eq!(args.interval, 60);
        assert!(args.config_url.is_none());
    }

    #[test]
    fn args_overrides() {
        let args = Args::try_parse_from([
            "feed-relay",
            "--lint",
            "--config",
            "/etc/relay.yaml",
            "--config-url",
            "https://example.com/conf.yaml",
            "--interval",
            "300",
        ])
        .unwrap();
        assert!(args.lint);
        assert_eq!(args.config, PathBuf::from("/etc/relay.yaml"));
        assert_eq!(args.config_url.as_deref(), Some("https://example.com/conf.yaml"));
        assert_eq!(args.interval, 300);
    }

    #[test]
    fn lint_accepts_valid_files() {
        let dir = tempfile::tempdir().unwrap();
        let conf = dir.path().join("conf.yaml");
        std::fs::write(
            &conf,
            "streams:\n  - name: a\n    url: https://example.com/a.rss\n    channel: general\n",
        )
        .unwrap();

        lint(&conf, &dir.path().join("missing.lock")).unwrap();
    }

    #[test]
    fn lint_rejects_bad_pattern() {
        let dir = tempfile::tempdir().unwrap();
        let conf = dir.path().join("conf.yaml");
        std::fs::write(
            &conf,
            "streams:\n  - name: a\n    url: u\n    channel: c\n    include: \"(\"\n",
        )
        .unwrap();

        assert!(lint(&conf, &dir.path().join("missing.lock")).is_err());
    }

    #[test]
    fn lint_rejects_corrupt_state() {
        let dir = tempfile::tempdir().unwrap();
        let conf = dir.path().join("conf.yaml");
        let lock = dir.path().join("state.lock");
        std::fs::write(&conf, "streams: []\n").unwrap();
        std::fs::write(&lock, "lastRun: [oops").unwrap();

        assert!(lint(&conf, &lock).is_err());
    }
}
