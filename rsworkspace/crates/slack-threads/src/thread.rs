use slack_morphism::prelude::{SlackChannelId, SlackTs};

/// Identity of a message Slack has accepted.
///
/// `channel` is always the concrete channel ID from the API response;
/// `chat.update` rejects channel names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedMessage {
    pub channel: SlackChannelId,
    pub ts: SlackTs,
}

/// Root message that anchors a thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thread {
    pub channel: SlackChannelId,
    pub ts: SlackTs,
}

impl Thread {
    pub fn new(channel: impl Into<String>, ts: impl Into<String>) -> Self {
        Self {
            channel: SlackChannelId(channel.into()),
            ts: SlackTs(ts.into()),
        }
    }
}

impl From<PostedMessage> for Thread {
    fn from(root: PostedMessage) -> Self {
        Self {
            channel: root.channel,
            ts: root.ts,
        }
    }
}

/// Terminal result of a dynamic thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadOutcome {
    pub thread: Thread,
    /// Number of units submitted.
    pub total: usize,
    /// Units whose resolver failed.
    pub failures: usize,
    /// Resolved units whose final post or update Slack rejected. These are
    /// not counted as failures; the summary only reflects resolver outcomes.
    pub undelivered: usize,
}
