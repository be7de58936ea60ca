//! Persisted watermark store.
//!
//! The state file records, per feed, the newest item seen so far.  It is read
//! once at startup and rewritten after every cycle.
//!
//! ```yaml
//! lastRun: 2024-01-01T00:00:00Z
//! streams:
//!   release-notes:
//!     rssId: https://example.com/posts/42
//!     rssTime: 2024-01-01T00:00:00Z
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::util::write_atomic;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("Failed to read state file: {0}")]
    Read(#[source] std::io::Error),

    #[error("Failed to write state file: {0}")]
    Write(#[source] std::io::Error),

    #[error("Invalid YAML in state file: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Identifier placed in a freshly created watermark before any item is seen.
pub const INITIAL_ID: &str = "0";

/// The most recently observed item of one feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Watermark {
    #[serde(rename = "rssId")]
    pub id: String,
    #[serde(rename = "rssTime")]
    pub time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct State {
    /// When the last cycle finished.  New feeds start their watermark here.
    pub last_run: DateTime<Utc>,
    #[serde(default)]
    pub streams: BTreeMap<String, Watermark>,
}

impl State {
    /// Fresh state whose new feeds will only pick up items published after `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            last_run: now,
            streams: BTreeMap::new(),
        }
    }

    /// Load the state file.
    ///
    /// - Missing or empty file → fresh state starting at `now`
    /// - Invalid YAML → `Err(StateError::Parse)`
    ///
    /// A `last_run` more than a year before `now` is clamped to `now`, so a
    /// deployment revived after a long outage does not replay its backlog.
    pub fn load(path: &Path, now: DateTime<Utc>) -> Result<Self, StateError> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "No state file found, starting fresh");
                return Ok(Self::new(now));
            }
            Err(e) => return Err(StateError::Read(e)),
        };

        if content.trim().is_empty() {
            tracing::info!(path = %path.display(), "State file is empty, starting fresh");
            return Ok(Self::new(now));
        }

        let mut state: State = serde_yaml::from_str(&content)?;
        state.clamp_stale(now);
        tracing::info!(
            path = %path.display(),
            feeds = state.streams.len(),
            last_run = %state.last_run,
            "Loaded state"
        );
        Ok(state)
    }

    pub fn save(&self, path: &Path) -> Result<(), StateError> {
        let yaml = serde_yaml::to_string(self)?;
        write_atomic(path, yaml.as_bytes()).map_err(StateError::Write)?;
        tracing::debug!(path = %path.display(), "Saved state");
        Ok(())
    }

    fn clamp_stale(&mut self, now: DateTime<Utc>) {
        let cutoff = now.checked_sub_months(Months::new(12)).unwrap_or(now);
        if self.last_run < cutoff {
            tracing::warn!(
                last_run = %self.last_run,
                "Last run is over a year old, skipping the backlog"
            );
            self.last_run = now;
        }
    }

    /// The watermark for `feed`, created on first sight.
    pub fn watermark_mut(&mut self, feed: &str) -> &mut Watermark {
        let last_run = self.last_run;
        self.streams
            .entry(feed.to_string())
            .or_insert_with(|| Watermark {
                id: INITIAL_ID.to_string(),
                time: last_run,
            })
    }

    /// Store a new watermark for `feed`.  A watermark older than the stored
    /// one is ignored, so the stored time never goes backwards.
    pub fn advance(&mut self, feed: &str, watermark: Watermark) {
        match self.streams.get_mut(feed) {
            Some(current) if watermark.time < current.time => {
                tracing::warn!(feed, "Refusing to move watermark backwards");
            }
            Some(current) => *current = watermark,
            None => {
                self.streams.insert(feed.to_string(), watermark);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn missing_file_gives_fresh_state() {
        let dir = tempfile::tempdir().unwrap();
        let now = ts(2024, 5, 1);
        let state = State::load(&dir.path().join("nope.lock"), now).unwrap();
        assert_eq!(state, State::new(now));
    }

    #[test]
    fn empty_file_gives_fresh_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.lock");
        std::fs::write(&path, "  \n").unwrap();

        let now = ts(2024, 5, 1);
        assert_eq!(State::load(&path, now).unwrap(), State::new(now));
    }

    #[test]
    fn invalid_yaml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.lock");
        std::fs::write(&path, "streams: [not, a, map").unwrap();

        let err = State::load(&path, ts(2024, 5, 1)).unwrap_err();
        assert!(matches!(err, StateError::Parse(_)));
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.lock");
        let now = ts(2024, 5, 1);

        let mut state = State::new(now);
        state.advance(
            "news",
            Watermark {
                id: "guid-9".to_string(),
                time: ts(2024, 4, 30),
            },
        );
        state.save(&path).unwrap();

        let loaded = State::load(&path, now).unwrap();
        assert_eq!(loaded, state);
    }

    #[test]
    fn reads_documented_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.lock");
        std::fs::write(
            &path,
            "lastRun: 2024-04-01T00:00:00Z\nstreams:\n  news:\n    rssId: g1\n    rssTime: 2024-03-01T12:00:00Z\n",
        )
        .unwrap();

        let state = State::load(&path, ts(2024, 5, 1)).unwrap();
        assert_eq!(state.last_run, ts(2024, 4, 1));
        assert_eq!(state.streams["news"].id, "g1");
        assert_eq!(
            state.streams["news"].time,
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn stale_last_run_is_clamped_to_now() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.lock");
        State::new(ts(2020, 1, 1)).save(&path).unwrap();

        let now = ts(2024, 5, 1);
        assert_eq!(State::load(&path, now).unwrap().last_run, now);
    }

    #[test]
    fn recent_last_run_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.lock");
        State::new(ts(2024, 1, 1)).save(&path).unwrap();

        let loaded = State::load(&path, ts(2024, 5, 1)).unwrap();
        assert_eq!(loaded.last_run, ts(2024, 1, 1));
    }

    #[test]
    fn watermark_is_created_lazily_from_last_run() {
        let mut state = State::new(ts(2024, 5, 1));
        assert!(state.streams.is_empty());

        let mark = state.watermark_mut("news").clone();
        assert_eq!(mark.id, INITIAL_ID);
        assert_eq!(mark.time, ts(2024, 5, 1));
        assert_eq!(state.streams.len(), 1);
    }

    #[test]
    fn watermark_is_not_reset_once_created() {
        let mut state = State::new(ts(2024, 5, 1));
        state.advance(
            "news",
            Watermark {
                id: "g2".to_string(),
                time: ts(2024, 5, 2),
            },
        );
        state.last_run = ts(2024, 6, 1);

        assert_eq!(state.watermark_mut("news").id, "g2");
    }

    #[test]
    fn advance_never_moves_backwards() {
        let mut state = State::new(ts(2024, 5, 1));
        state.advance(
            "news",
            Watermark {
                id: "new".to_string(),
                time: ts(2024, 5, 3),
            },
        );
        state.advance(
            "news",
            Watermark {
                id: "old".to_string(),
                time: ts(2024, 5, 2),
            },
        );

        assert_eq!(state.streams["news"].id, "new");
    }
}
