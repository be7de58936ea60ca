//! Atom (and anything else `feed-rs` understands) parsing.
//!
//! Used as the fallback when a document is not RSS 2.0.  YouTube channel
//! feeds are the common case.

use anyhow::Result;
use feed_rs::parser;

use super::FeedItem;

/// Parse a non-RSS feed document into [`FeedItem`]s, preserving document order.
///
/// `feed-rs` has already parsed the dates, so `published` is rendered back as
/// RFC 3339.  Entries without a published date fall back to their updated date.
pub fn parse_document(bytes: &[u8]) -> Result<Vec<FeedItem>> {
    let feed = parser::parse(bytes)?;

    let items = feed
        .entries
        .into_iter()
        .map(|entry| {
            let link = entry.links.first().map(|l| l.href.clone());
            let title = entry
                .title
                .map(|t| t.content)
                .unwrap_or_else(|| "(untitled)".to_string());
            let id = if entry.id.trim().is_empty() {
                link.clone().unwrap_or_default()
            } else {
                entry.id
            };

            FeedItem {
                id,
                title,
                link,
                published: entry.published.or(entry.updated).map(|dt| dt.to_rfc3339()),
            }
        })
        .collect();

    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ATOM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Channel</title>
  <id>urn:channel</id>
  <updated>2024-03-02T00:00:00Z</updated>
  <entry>
    <id>yt:video:abc</id>
    <title>Episode 2</title>
    <link rel="alternate" href="https://example.com/watch?v=abc"/>
    <published>2024-03-02T10:00:00+00:00</published>
    <updated>2024-03-02T11:00:00+00:00</updated>
  </entry>
  <entry>
    <id>yt:video:xyz</id>
    <title>Episode 1</title>
    <link rel="alternate" href="https://example.com/watch?v=xyz"/>
    <updated>2024-03-01T10:00:00+00:00</updated>
  </entry>
</feed>"#;

    #[test]
    fn parses_atom_entries() {
        let items = parse_document(ATOM.as_bytes()).unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, "yt:video:abc");
        assert_eq!(items[0].title, "Episode 2");
        assert_eq!(
            items[0].link.as_deref(),
            Some("https://example.com/watch?v=abc")
        );
        assert_eq!(
            items[0].published.as_deref(),
            Some("2024-03-02T10:00:00+00:00")
        );
    }

    #[test]
    fn falls_back_to_updated_date() {
        let items = parse_document(ATOM.as_bytes()).unwrap();
        assert_eq!(
            items[1].published.as_deref(),
            Some("2024-03-01T10:00:00+00:00")
        );
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_document(b"this is not a feed").is_err());
    }
}
