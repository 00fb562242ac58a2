//! In-memory Slack for unit testing thread builders without the network.
//!
//! Enabled with the `test-support` feature:
//!
//! ```toml
//! [dev-dependencies]
//! slack-threads = { path = "...", features = ["test-support"] }
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use slack_morphism::prelude::{SlackChannelId, SlackTs};

use crate::error::TransportError;
use crate::thread::PostedMessage;
use crate::transport::{MessageContent, PostParameters, Transport};

/// One call received by [`MockTransport`], in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Post {
        channel: String,
        thread_ts: Option<String>,
        text: String,
        blocks: usize,
        /// `None` when the post was rejected.
        ts: Option<String>,
    },
    Update {
        channel: String,
        ts: String,
        text: String,
        blocks: usize,
        accepted: bool,
    },
}

/// Current state of a message held by [`MockTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockMessage {
    pub channel: String,
    pub ts: String,
    pub thread_ts: Option<String>,
    pub text: String,
    pub blocks: usize,
    pub updates: usize,
}

#[derive(Default)]
struct State {
    calls: Vec<Call>,
    messages: Vec<MockMessage>,
    next_ts: u64,
    failing_texts: HashMap<String, &'static str>,
    failing_channels: HashMap<String, &'static str>,
    fail_updates: Option<&'static str>,
}

/// Records every post and update, and keeps the latest content of each
/// message so tests can assert on what a reader would see.
///
/// Channel names are resolved to IDs the way Slack does: `test-3` comes back
/// as `CTEST-3`; anything already starting with `C` is kept.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<State>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject any post or update whose text equals `text` with `code`.
    pub fn fail_text(&self, text: &str, code: &'static str) {
        self.state
            .lock()
            .unwrap()
            .failing_texts
            .insert(text.to_string(), code);
    }

    /// Reject every call addressed to `channel` (name or ID) with `code`.
    pub fn fail_channel(&self, channel: &str, code: &'static str) {
        self.state
            .lock()
            .unwrap()
            .failing_channels
            .insert(channel.to_string(), code);
    }

    /// Reject every `chat.update` with `code`.
    pub fn fail_updates(&self, code: &'static str) {
        self.state.lock().unwrap().fail_updates = Some(code);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn post_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Post { .. }))
            .count()
    }

    pub fn update_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Update { .. }))
            .count()
    }

    /// Accepted messages in posting order, with their latest content.
    pub fn messages(&self) -> Vec<MockMessage> {
        self.state.lock().unwrap().messages.clone()
    }

    /// Texts of accepted replies in `thread_ts`, in posting order.
    pub fn thread_texts(&self, thread_ts: &SlackTs) -> Vec<String> {
        self.messages()
            .into_iter()
            .filter(|m| m.thread_ts.as_deref() == Some(thread_ts.0.as_str()))
            .map(|m| m.text)
            .collect()
    }

    pub fn message(&self, ts: &SlackTs) -> Option<MockMessage> {
        self.messages().into_iter().find(|m| m.ts == ts.0)
    }

    /// Texts of accepted updates, in the order they were applied.
    pub fn update_texts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Update {
                    text,
                    accepted: true,
                    ..
                } => Some(text),
                _ => None,
            })
            .collect()
    }
}

fn channel_id(channel: &str) -> String {
    if channel.starts_with('C') {
        channel.to_string()
    } else {
        format!("C{}", channel.to_uppercase())
    }
}

impl State {
    fn rejection(&self, channel: &str, text: &str) -> Option<&'static str> {
        self.failing_channels
            .get(channel)
            .or_else(|| self.failing_channels.get(&channel_id(channel)))
            .or_else(|| self.failing_texts.get(text))
            .copied()
    }
}

impl Transport for MockTransport {
    async fn post_message(
        &self,
        channel: &SlackChannelId,
        _params: &PostParameters,
        content: &MessageContent,
        thread_ts: Option<&SlackTs>,
    ) -> Result<PostedMessage, TransportError> {
        let mut state = self.state.lock().unwrap();
        let thread_ts = thread_ts.map(|ts| ts.0.clone());

        if let Some(code) = state.rejection(&channel.0, &content.text) {
            state.calls.push(Call::Post {
                channel: channel.0.clone(),
                thread_ts,
                text: content.text.clone(),
                blocks: content.blocks.len(),
                ts: None,
            });
            return Err(TransportError::api(code));
        }

        state.next_ts += 1;
        let ts = format!("1700000000.{:06}", state.next_ts);
        let id = channel_id(&channel.0);
        state.calls.push(Call::Post {
            channel: channel.0.clone(),
            thread_ts: thread_ts.clone(),
            text: content.text.clone(),
            blocks: content.blocks.len(),
            ts: Some(ts.clone()),
        });
        state.messages.push(MockMessage {
            channel: id.clone(),
            ts: ts.clone(),
            thread_ts,
            text: content.text.clone(),
            blocks: content.blocks.len(),
            updates: 0,
        });

        Ok(PostedMessage {
            channel: SlackChannelId(id),
            ts: SlackTs(ts),
        })
    }

    async fn update_message(
        &self,
        channel: &SlackChannelId,
        ts: &SlackTs,
        _params: &PostParameters,
        content: &MessageContent,
    ) -> Result<PostedMessage, TransportError> {
        let mut state = self.state.lock().unwrap();

        let mut rejection = state
            .rejection(&channel.0, &content.text)
            .or(state.fail_updates);
        let found = state
            .messages
            .iter()
            .any(|m| m.channel == channel.0 && m.ts == ts.0);
        if rejection.is_none() && !found {
            // chat.update only accepts channel IDs.
            rejection = Some(if channel.0.starts_with('C') {
                "message_not_found"
            } else {
                "channel_not_found"
            });
        }

        state.calls.push(Call::Update {
            channel: channel.0.clone(),
            ts: ts.0.clone(),
            text: content.text.clone(),
            blocks: content.blocks.len(),
            accepted: rejection.is_none(),
        });
        if let Some(code) = rejection {
            return Err(TransportError::api(code));
        }

        if let Some(message) = state
            .messages
            .iter_mut()
            .find(|m| m.channel == channel.0 && m.ts == ts.0)
        {
            message.text = content.text.clone();
            message.blocks = content.blocks.len();
            message.updates += 1;
        }

        Ok(PostedMessage {
            channel: channel.clone(),
            ts: ts.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(name: &str) -> SlackChannelId {
        SlackChannelId(name.to_string())
    }

    #[tokio::test]
    async fn post_resolves_channel_name_to_id() {
        let mock = MockTransport::new();
        let posted = mock
            .post_message(
                &channel("test-3"),
                &PostParameters::default(),
                &MessageContent::text("hi"),
                None,
            )
            .await
            .unwrap();
        assert_eq!(posted.channel.0, "CTEST-3");
        assert_eq!(mock.post_count(), 1);
        assert_eq!(mock.messages()[0].text, "hi");
    }

    #[tokio::test]
    async fn update_requires_channel_id() {
        let mock = MockTransport::new();
        let posted = mock
            .post_message(
                &channel("test-3"),
                &PostParameters::default(),
                &MessageContent::text("hi"),
                None,
            )
            .await
            .unwrap();

        let err = mock
            .update_message(
                &channel("test-3"),
                &posted.ts,
                &PostParameters::default(),
                &MessageContent::text("bye"),
            )
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "channel_not_found");

        mock.update_message(
            &posted.channel,
            &posted.ts,
            &PostParameters::default(),
            &MessageContent::text("bye"),
        )
        .await
        .unwrap();
        let message = mock.message(&posted.ts).unwrap();
        assert_eq!(message.text, "bye");
        assert_eq!(message.updates, 1);
    }

    #[tokio::test]
    async fn failing_text_is_rejected_and_recorded() {
        let mock = MockTransport::new();
        mock.fail_text("nope", "msg_too_long");
        let err = mock
            .post_message(
                &channel("C1"),
                &PostParameters::default(),
                &MessageContent::text("nope"),
                None,
            )
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "msg_too_long");
        assert_eq!(mock.post_count(), 1);
        assert!(mock.messages().is_empty());
    }
}
