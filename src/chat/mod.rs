//! Chat platform abstraction.
//!
//! The poll loop needs two things from a chat platform: a map from channel
//! name to channel id, and a way to post a message (optionally as a reply in a
//! thread).  [`ChatClient`] captures exactly that; [`SlackClient`] is the
//! production implementation.

mod slack;

pub use slack::SlackClient;

use std::collections::HashMap;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("chat API returned error: {0}")]
    Api(String),
}

/// Opaque handle of a posted message, used to reply in its thread.
pub type MessageTs = String;

pub trait ChatClient {
    /// Every channel visible to the bot, keyed by name.
    fn channel_ids(&self) -> Result<HashMap<String, String>, ChatError>;

    /// Post `text` to `channel_id`, as a thread reply when `thread_ts` is set.
    fn post_message(
        &self,
        channel_id: &str,
        text: &str,
        thread_ts: Option<&str>,
    ) -> Result<MessageTs, ChatError>;
}
