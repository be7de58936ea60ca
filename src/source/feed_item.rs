//! The item type shared by every feed format.
//!
//! `FeedItem` is one entry from an RSS channel or an Atom feed.  Each format
//! parser converts its native entries into `FeedItem`s so that selection and
//! dispatch never need to know which format a feed used.
//!
//! ## Dates
//!
//! `published` is kept as the raw text the source provided.  Feeds in the wild
//! use a zoo of date formats, and an unparseable date is a hard error for the
//! run, so parsing happens in [`crate::timestamp`] at selection time where the
//! failure can be reported with the feed and item it came from.
//!
//! ## For contributors
//!
//! A new feed format does **not** need to touch this file.  Build `FeedItem`
//! values in the format's parser and leave `published` as the source wrote
//! it.  The id only has to be stable across fetches.  The watermark is keyed
//! on time, so the id is recorded for humans reading the state file.

/// A single feed entry, normalised from any feed format.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct FeedItem {
    /// Unique identifier.
    ///
    /// For RSS this is the `<guid>` element (falling back to `<link>`).
    /// For Atom it is the entry `<id>`.
    pub id: String,

    /// Human-readable headline.  Include/exclude patterns match against this.
    pub title: String,

    /// URL to the full content.  This is what gets posted to chat.
    pub link: Option<String>,

    /// Publication date exactly as the source wrote it.
    pub published: Option<String>,
}

impl FeedItem {
    /// The text posted for this item: its link, or the title when the source
    /// did not provide one.
    pub fn link_or_title(&self) -> &str {
        self.link.as_deref().unwrap_or(&self.title)
    }
}
