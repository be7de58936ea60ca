//! Posting selected items to chat.
//!
//! Every failure here is logged and swallowed.  The caller advances the
//! watermark regardless of the [`Outcome`].

use std::collections::HashMap;

use crate::chat::ChatClient;
use crate::config::FeedConfig;
use crate::source::FeedItem;

/// What happened to one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Posted,
    UnknownChannel,
    Failed,
}

/// Post `item` to the channel configured for `feed`.
///
/// Spoiler feeds post the title in the channel and hide the link in that
/// message's reply thread.  If the title post fails the link is not posted at
/// all, since posting it top-level would give the spoiler away.
pub fn dispatch(
    chat: &dyn ChatClient,
    channels: &HashMap<String, String>,
    feed: &FeedConfig,
    item: &FeedItem,
) -> Outcome {
    let Some(channel_id) = channels.get(&feed.channel) else {
        tracing::warn!(
            feed = %feed.name,
            channel = %feed.channel,
            "Channel does not exist on the chat server, skipping"
        );
        return Outcome::UnknownChannel;
    };

    tracing::info!(
        feed = %feed.name,
        title = %item.title,
        link = item.link.as_deref().unwrap_or(""),
        channel = %feed.channel,
        "Posting item"
    );

    if feed.spoiler {
        let ts = match chat.post_message(channel_id, &item.title, None) {
            Ok(ts) => ts,
            Err(e) => {
                tracing::error!(feed = %feed.name, error = %e, "Failed to post spoiler title");
                return Outcome::Failed;
            }
        };
        if let Err(e) = chat.post_message(channel_id, item.link_or_title(), Some(&ts)) {
            tracing::error!(feed = %feed.name, error = %e, "Failed to post spoiler reply");
            return Outcome::Failed;
        }
    } else if let Err(e) = chat.post_message(channel_id, item.link_or_title(), None) {
        tracing::error!(feed = %feed.name, error = %e, "Failed to post item");
        return Outcome::Failed;
    }

    Outcome::Posted
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::chat::{ChatError, MessageTs};
    use crate::select::Filter;
    use std::cell::RefCell;

    /// A message recorded by [`FakeChat`].
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Posted {
        pub channel_id: String,
        pub text: String,
        pub thread_ts: Option<String>,
    }

    /// In-memory chat client; records posts and can be told to fail.
    #[derive(Default)]
    pub struct FakeChat {
        pub channels: HashMap<String, String>,
        pub posts: RefCell<Vec<Posted>>,
        /// Fail every post whose text equals this.
        pub fail_text: Option<String>,
    }

    impl FakeChat {
        pub fn with_channel(name: &str, id: &str) -> Self {
            Self {
                channels: HashMap::from([(name.to_string(), id.to_string())]),
                ..Self::default()
            }
        }
    }

    impl ChatClient for FakeChat {
        fn channel_ids(&self) -> Result<HashMap<String, String>, ChatError> {
            Ok(self.channels.clone())
        }

        fn post_message(
            &self,
            channel_id: &str,
            text: &str,
            thread_ts: Option<&str>,
        ) -> Result<MessageTs, ChatError> {
            if self.fail_text.as_deref() == Some(text) {
                return Err(ChatError::Api("rate_limited".to_string()));
            }
            let mut posts = self.posts.borrow_mut();
            posts.push(Posted {
                channel_id: channel_id.to_string(),
                text: text.to_string(),
                thread_ts: thread_ts.map(String::from),
            });
            Ok(format!("ts-{}", posts.len()))
        }
    }

    fn feed(spoiler: bool) -> FeedConfig {
        FeedConfig {
            name: "shows".to_string(),
            url: "https://example.com/feed".to_string(),
            channel: "tv".to_string(),
            spoiler,
            filter: Filter::default(),
        }
    }

    fn item() -> FeedItem {
        FeedItem {
            id: "e1".to_string(),
            title: "Episode 1".to_string(),
            link: Some("https://example.com/e1".to_string()),
            published: None,
        }
    }

    #[test]
    fn plain_feed_posts_link() {
        let chat = FakeChat::with_channel("tv", "C1");
        let outcome = dispatch(&chat, &chat.channels, &feed(false), &item());

        assert_eq!(outcome, Outcome::Posted);
        assert_eq!(
            *chat.posts.borrow(),
            vec![Posted {
                channel_id: "C1".to_string(),
                text: "https://example.com/e1".to_string(),
                thread_ts: None,
            }]
        );
    }

    #[test]
    fn spoiler_feed_threads_link_under_title() {
        let chat = FakeChat::with_channel("tv", "C1");
        let outcome = dispatch(&chat, &chat.channels, &feed(true), &item());

        assert_eq!(outcome, Outcome::Posted);
        let posts = chat.posts.borrow();
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].text, "Episode 1");
        assert_eq!(posts[0].thread_ts, None);
        assert_eq!(posts[1].text, "https://example.com/e1");
        assert_eq!(posts[1].thread_ts.as_deref(), Some("ts-1"));
    }

    #[test]
    fn unknown_channel_is_skipped() {
        let chat = FakeChat::with_channel("other", "C9");
        let outcome = dispatch(&chat, &chat.channels, &feed(false), &item());

        assert_eq!(outcome, Outcome::UnknownChannel);
        assert!(chat.posts.borrow().is_empty());
    }

    #[test]
    fn failed_spoiler_title_suppresses_link() {
        let chat = FakeChat {
            fail_text: Some("Episode 1".to_string()),
            ..FakeChat::with_channel("tv", "C1")
        };
        let outcome = dispatch(&chat, &chat.channels, &feed(true), &item());

        assert_eq!(outcome, Outcome::Failed);
        assert!(chat.posts.borrow().is_empty());
    }

    #[test]
    fn failed_post_is_reported_not_raised() {
        let chat = FakeChat {
            fail_text: Some("https://example.com/e1".to_string()),
            ..FakeChat::with_channel("tv", "C1")
        };
        let outcome = dispatch(&chat, &chat.channels, &feed(false), &item());
        assert_eq!(outcome, Outcome::Failed);
    }
}
