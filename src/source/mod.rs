//! Feed fetching.
//!
//! This module defines the [`DataSource`] trait and the common [`FeedItem`]
//! type.  Format parsers live in sub-modules: [`rss`] for RSS 2.0 and
//! [`atom`] for everything `feed-rs` handles.
//!
//! The poll loop only talks to `DataSource`, so tests swap in an in-memory
//! source and never touch the network.
//!
//! ## Adding a new feed format
//!
//! 1. Create a new file in this directory (e.g. `json_feed.rs`).
//! 2. Write a pure `fn(&[u8]) -> Result<Vec<FeedItem>>` that keeps document
//!    order and copies the raw date text into `published` without parsing it.
//! 3. Add `mod json_feed;` below and try it in [`parse_document`] before the
//!    `feed-rs` fallback.
//!
//! Selection, dispatch and the watermark store are all format-agnostic, so
//! nothing outside this directory needs to change.

mod atom;
mod feed_item;
mod rss;

pub use feed_item::FeedItem;

use std::time::Duration;

use anyhow::{Context, Result};

/// HTTP timeout shared by feed downloads.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Trait that every feed source must implement.
///
/// The poll loop calls [`fetch()`](DataSource::fetch) once per feed per
/// cycle, on the main thread.  An `Err` skips that feed for the cycle and
/// leaves its watermark alone; it never aborts the run.
///
/// ## Implementing a new source
///
/// ```ignore
/// pub struct FileSource { root: PathBuf }
///
/// impl DataSource for FileSource {
///     fn fetch(&self, url: &str) -> Result<Vec<FeedItem>> {
///         // treat the "url" as a file name under `root`
///         let bytes = std::fs::read(self.root.join(url))?;
///         parse_document(&bytes)
///     }
/// }
/// ```
pub trait DataSource {
    /// Fetch the feed at `url` and return its items in document order.
    ///
    /// Most feeds list newest first; callers must not assume either order.
    fn fetch(&self, url: &str) -> Result<Vec<FeedItem>>;
}

/// Fetches feeds over HTTP with a blocking [`reqwest`] client.
///
/// One client is built at startup and reused for every feed, so connections
/// to the same host are pooled across cycles.
pub struct HttpSource {
    client: reqwest::blocking::Client,
}

impl HttpSource {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .timeout(HTTP_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }
}

impl DataSource for HttpSource {
    fn fetch(&self, url: &str) -> Result<Vec<FeedItem>> {
        let body = self
            .client
            .get(url)
            .send()?
            .error_for_status()?
            .bytes()?;
        parse_document(body.as_ref())
    }
}

/// Parse a feed document of any supported format.
///
/// RSS 2.0 is tried first; anything else goes through `feed-rs`.
pub fn parse_document(bytes: &[u8]) -> Result<Vec<FeedItem>> {
    match ::rss::Channel::read_from(bytes) {
        Ok(channel) => Ok(rss::parse_channel(&channel)),
        Err(rss_err) => {
            tracing::debug!(error = %rss_err, "Not an RSS document, trying feed-rs");
            atom::parse_document(bytes).context("Document is neither RSS nor Atom")
        }
    }
}
