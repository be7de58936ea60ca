//! RSS 2.0 parsing.
//!
//! Converts an [`rss::Channel`] into [`FeedItem`]s, preserving document order.

use super::FeedItem;

/// Parse an already-fetched [`rss::Channel`] into [`FeedItem`]s.
///
/// This is a pure function (no I/O) so that tests can exercise the
/// parsing logic without hitting the network.
pub fn parse_channel(channel: &rss::Channel) -> Vec<FeedItem> {
    channel
        .items()
        .iter()
        .map(|item| {
            // Prefer <guid>, fall back to <link>, then empty string.
            let id = item
                .guid()
                .map(|g| g.value().to_string())
                .or_else(|| item.link().map(String::from))
                .unwrap_or_default();

            // Prefer <pubDate>, fall back to Dublin Core <dc:date>.
            let published = item
                .pub_date()
                .or_else(|| {
                    item.dublin_core_ext()
                        .and_then(|dc| dc.dates().first())
                        .map(String::as_str)
                })
                .map(String::from);

            FeedItem {
                id,
                title: item.title().unwrap_or("(untitled)").to_string(),
                link: item.link().map(String::from),
                published,
            }
        })
        .collect()
}
