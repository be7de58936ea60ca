//! Item selection: which fetched items are new, and which of those to post.
//!
//! Selection is pure.  Given the same watermark and item list it always
//! produces the same result, which is what makes it safe to re-run a cycle
//! after a crash before the state was saved.

use regex::Regex;
use thiserror::Error;

use crate::source::FeedItem;
use crate::state::Watermark;
use crate::timestamp::{self, TimestampError};

#[derive(Debug, Error)]
pub enum SelectError {
    #[error("feed {feed:?}: cannot parse date of item {title:?}: {source}")]
    Timestamp {
        feed: String,
        title: String,
        #[source]
        source: TimestampError,
    },
}

/// Title filter built from a feed's include/exclude patterns.
///
/// Include wins: when an include pattern is set the exclude pattern is never
/// consulted.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    include: Option<Regex>,
    exclude: Option<Regex>,
}

impl Filter {
    /// Compile a filter.  Empty pattern strings mean "not set".
    pub fn new(include: &str, exclude: &str) -> Result<Self, regex::Error> {
        let compile = |pattern: &str| {
            if pattern.is_empty() {
                Ok(None)
            } else {
                Regex::new(pattern).map(Some)
            }
        };
        Ok(Self {
            include: compile(include)?,
            exclude: compile(exclude)?,
        })
    }

    pub fn has_include(&self) -> bool {
        self.include.is_some()
    }

    pub fn has_exclude(&self) -> bool {
        self.exclude.is_some()
    }

    /// Whether an item with this title should be posted.
    pub fn accepts(&self, title: &str) -> bool {
        match (&self.include, &self.exclude) {
            (Some(include), _) => include.is_match(title),
            (None, Some(exclude)) => !exclude.is_match(title),
            (None, None) => true,
        }
    }
}

/// Result of running selection over one feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Items to post, oldest first.
    pub dispatch: Vec<FeedItem>,
    /// Watermark after every newer item has been seen.
    pub watermark: Watermark,
}

/// Pick the items of `items` to post and compute the advanced watermark.
///
/// `items` is in document order (normally newest first); it is walked oldest
/// to newest.  Every item strictly newer than the running watermark advances
/// it, whether or not the filter accepts the item.  Any unparseable date fails
/// the whole selection.
pub fn select(
    feed: &str,
    filter: &Filter,
    watermark: &Watermark,
    items: &[FeedItem],
) -> Result<Selection, SelectError> {
    let mut current = watermark.clone();
    let mut dispatch = Vec::new();

    for item in items.iter().rev() {
        let published = timestamp::parse_opt(item.published.as_deref()).map_err(|source| {
            SelectError::Timestamp {
                feed: feed.to_string(),
                title: item.title.clone(),
                source,
            }
        })?;

        if published <= current.time {
            continue;
        }

        tracing::debug!(feed, title = %item.title, "Checking item");
        if filter.accepts(&item.title) {
            dispatch.push(item.clone());
        }
        current = Watermark {
            id: item.id.clone(),
            time: published,
        };
    }

    Ok(Selection {
        dispatch,
        watermark: current,
    })
}
