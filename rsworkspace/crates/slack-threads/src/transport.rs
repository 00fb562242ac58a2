use std::future::Future;

use slack_morphism::prelude::{SlackBlock, SlackChannelId, SlackTs};

use crate::error::TransportError;
use crate::thread::PostedMessage;

/// Text plus optional Block Kit content for one Slack message.
#[derive(Debug, Clone, Default)]
pub struct MessageContent {
    pub text: String,
    pub blocks: Vec<SlackBlock>,
}

impl MessageContent {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            blocks: Vec::new(),
        }
    }

    pub fn with_blocks(mut self, blocks: Vec<SlackBlock>) -> Self {
        self.blocks = blocks;
        self
    }
}

/// Per-sender posting defaults applied to every `chat.postMessage`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostParameters {
    pub username: Option<String>,
    pub icon_emoji: Option<String>,
    pub markdown: bool,
}

impl Default for PostParameters {
    fn default() -> Self {
        Self {
            username: None,
            icon_emoji: None,
            markdown: true,
        }
    }
}

/// Send and edit Slack messages.
///
/// Two operations, one per Web API method the thread builders need.
pub trait Transport: Send + Sync + 'static {
    /// `chat.postMessage`. `channel` may be a name or an ID; the returned
    /// handle always carries the ID.
    fn post_message(
        &self,
        channel: &SlackChannelId,
        params: &PostParameters,
        content: &MessageContent,
        thread_ts: Option<&SlackTs>,
    ) -> impl Future<Output = Result<PostedMessage, TransportError>> + Send;

    /// `chat.update`. `channel` must be a channel ID.
    fn update_message(
        &self,
        channel: &SlackChannelId,
        ts: &SlackTs,
        params: &PostParameters,
        content: &MessageContent,
    ) -> impl Future<Output = Result<PostedMessage, TransportError>> + Send;
}
