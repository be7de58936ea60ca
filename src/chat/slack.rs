//! Slack Web API client.
//!
//! Uses the bot-token endpoints `conversations.list` and `chat.postMessage`.
//! Slack answers HTTP 200 even for failures and signals them with
//! `"ok": false` plus an error code, so every response goes through
//! [`check_ok`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{ChatClient, ChatError, MessageTs};
use crate::source::HTTP_TIMEOUT;

const DEFAULT_API_BASE: &str = "https://slack.com/api";

/// Page size for `conversations.list`; Slack caps it at 1000.
const PAGE_LIMIT: u32 = 200;

pub struct SlackClient {
    token: String,
    api_base: String,
    client: reqwest::blocking::Client,
}

impl std::fmt::Debug for SlackClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackClient")
            .field("token", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl SlackClient {
    pub fn new(token: impl Into<String>) -> Result<Self, ChatError> {
        Self::with_api_base(token, DEFAULT_API_BASE)
    }

    /// Point the client at a different API host (a proxy or a test server).
    pub fn with_api_base(
        token: impl Into<String>,
        api_base: impl Into<String>,
    ) -> Result<Self, ChatError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()?;
        Ok(Self {
            token: token.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, method: &str) -> String {
        format!("{}/{}", self.api_base, method)
    }
}

impl ChatClient for SlackClient {
    fn channel_ids(&self) -> Result<HashMap<String, String>, ChatError> {
        let mut channels = HashMap::new();
        let mut cursor = String::new();

        loop {
            let limit = PAGE_LIMIT.to_string();
            let mut query = vec![
                ("exclude_archived", "true"),
                ("types", "public_channel,private_channel"),
                ("limit", limit.as_str()),
            ];
            if !cursor.is_empty() {
                query.push(("cursor", cursor.as_str()));
            }

            let page: ConversationsList = self
                .client
                .get(self.url("conversations.list"))
                .bearer_auth(&self.token)
                .query(&query)
                .send()?
                .error_for_status()?
                .json()?;
            check_ok(page.ok, page.error)?;

            channels.extend(page.channels.into_iter().map(|c| (c.name, c.id)));

            cursor = page
                .response_metadata
                .map(|m| m.next_cursor)
                .unwrap_or_default();
            if cursor.is_empty() {
                break;
            }
        }

        tracing::debug!(count = channels.len(), "Fetched Slack channels");
        Ok(channels)
    }

    fn post_message(
        &self,
        channel_id: &str,
        text: &str,
        thread_ts: Option<&str>,
    ) -> Result<MessageTs, ChatError> {
        let body = PostMessage {
            channel: channel_id,
            text,
            thread_ts,
        };
        let resp: PostMessageResponse = self
            .client
            .post(self.url("chat.postMessage"))
            .bearer_auth(&self.token)
            .json(&body)
            .send()?
            .error_for_status()?
            .json()?;
        check_ok(resp.ok, resp.error)?;
        Ok(resp.ts.unwrap_or_default())
    }
}

fn check_ok(ok: bool, error: Option<String>) -> Result<(), ChatError> {
    if ok {
        Ok(())
    } else {
        Err(ChatError::Api(
            error.unwrap_or_else(|| "unknown_error".to_string()),
        ))
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct PostMessage<'a> {
    channel: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    thread_ts: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct PostMessageResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    ts: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ConversationsList {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    channels: Vec<Channel>,
    #[serde(default)]
    response_metadata: Option<ResponseMetadata>,
}

#[derive(Debug, Deserialize)]
struct Channel {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct ResponseMetadata {
    #[serde(default)]
    next_cursor: String,
}
