//! Feed configuration (`conf.yaml`).
//!
//! ```yaml
//! slackToken: xoxb-...        # optional, SLACK_TOKEN wins when set
//! streams:
//!   - name: release-notes
//!     url: https://example.com/releases.rss
//!     channel: releases
//!     include: "^v\\d"        # optional
//!     exclude: ""             # optional
//!     spoiler: false          # optional
//! ```
//!
//! The file can be refreshed from a remote URL before every cycle; a failed
//! download keeps whatever is already on disk.
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::select::Filter;
use crate::source::HTTP_TIMEOUT;
use crate::util::write_atomic;

/// Environment variable holding the Slack bot token.
pub const ENV_SLACK_TOKEN: &str = "SLACK_TOKEN";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid YAML in config file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid {kind} pattern {pattern:?} for feed {feed:?}: {source}")]
    Pattern {
        feed: String,
        kind: &'static str,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Failed to download config: {0}")]
    Download(#[from] reqwest::Error),

    #[error("Failed to download config: HTTP status {0}")]
    Status(u16),

    #[error("Failed to write downloaded config to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// On-disk shape of the config file.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawConfig {
    streams: Vec<RawStream>,
    slack_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawStream {
    name: String,
    url: String,
    channel: String,
    #[serde(default)]
    include: String,
    #[serde(default)]
    exclude: String,
    #[serde(default)]
    spoiler: bool,
}

/// One polled feed, with its patterns already compiled.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    pub name: String,
    pub url: String,
    /// Destination channel name (not id).
    pub channel: String,
    /// Post the title in-channel and the link in its reply thread.
    pub spoiler: bool,
    pub filter: Filter,
}

/// Top-level configuration.
///
/// Custom Debug impl masks `slack_token`.
#[derive(Clone, Default)]
pub struct Config {
    pub feeds: Vec<FeedConfig>,
    pub slack_token: Option<String>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("feeds", &self.feeds)
            .field(
                "slack_token",
                &self.slack_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl Config {
    /// Load and compile the config file.
    ///
    /// `SLACK_TOKEN` in the environment overrides `slackToken` in the file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config = Self::from_yaml(&content)?;
        if let Some(token) = std::env::var(ENV_SLACK_TOKEN)
            .ok()
            .filter(|t| !t.is_empty())
        {
            config.slack_token = Some(token);
        }

        tracing::info!(path = %path.display(), feeds = config.feeds.len(), "Loaded configuration");
        Ok(config)
    }

    /// Parse config text and compile every feed's patterns.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let raw: RawConfig = serde_yaml::from_str(content)?;

        let feeds = raw
            .streams
            .into_iter()
            .map(FeedConfig::compile)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            feeds,
            slack_token: raw.slack_token.filter(|t| !t.is_empty()),
        })
    }

    /// Problems that do not stop the relay from running but are probably
    /// mistakes.
    pub fn lint_warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        let mut names = HashSet::new();

        for feed in &self.feeds {
            if !names.insert(feed.name.as_str()) {
                warnings.push(format!(
                    "feed {:?} is defined more than once; they will share one watermark",
                    feed.name
                ));
            }
            if feed.filter.has_include() && feed.filter.has_exclude() {
                warnings.push(format!(
                    "feed {:?} sets both include and exclude; exclude is ignored",
                    feed.name
                ));
            }
            if feed.channel.trim().is_empty() {
                warnings.push(format!("feed {:?} has no channel", feed.name));
            }
        }

        if self.slack_token.is_none() {
            warnings.push(format!(
                "no Slack token: set {ENV_SLACK_TOKEN} or slackToken"
            ));
        }

        warnings
    }
}

impl FeedConfig {
    fn compile(raw: RawStream) -> Result<Self, ConfigError> {
        let pattern_error = |kind: &'static str, pattern: &str, source| ConfigError::Pattern {
            feed: raw.name.clone(),
            kind,
            pattern: pattern.to_string(),
            source,
        };
        // compile separately so the error names the offending pattern
        Filter::new(&raw.include, "").map_err(|e| pattern_error("include", &raw.include, e))?;
        let filter = Filter::new(&raw.include, &raw.exclude)
            .map_err(|e| pattern_error("exclude", &raw.exclude, e))?;

        Ok(Self {
            name: raw.name,
            url: raw.url,
            channel: raw.channel,
            spoiler: raw.spoiler,
            filter,
        })
    }
}

/// Download the config at `url` over `path`.
///
/// The file is replaced atomically; on any error the existing file is left
/// untouched.
pub fn download(url: &str, path: &Path) -> Result<(), ConfigError> {
    let client = reqwest::blocking::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()?;
    let resp = client.get(url).send()?;

    let status = resp.status();
    if status.as_u16() >= 400 {
        return Err(ConfigError::Status(status.as_u16()));
    }

    let body = resp.bytes()?;
    write_atomic(path, &body).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(url, path = %path.display(), bytes = body.len(), "Downloaded config");
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
