use std::sync::Arc;
use std::time::Duration;

use slack_morphism::prelude::{SlackChannelId, SlackTs};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::config::SenderConfig;
use crate::error::{Error, Result, TransportError};
use crate::message::MessageUnit;
use crate::resolve;
use crate::thread::{PostedMessage, Thread};
use crate::transport::{MessageContent, PostParameters, Transport};

/// Posts messages and threads to one destination channel.
///
/// Cheap to clone: the transport is shared, so per-channel senders made with
/// [`Sender::in_channel`] reuse the same HTTP client and rate limiter.
pub struct Sender<T> {
    pub(crate) transport: Arc<T>,
    pub(crate) params: PostParameters,
    pub(crate) channel: Option<SlackChannelId>,
    pub(crate) fallback_channel: Option<SlackChannelId>,
    pub(crate) timeout: Duration,
}

impl<T> Clone for Sender<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            params: self.params.clone(),
            channel: self.channel.clone(),
            fallback_channel: self.fallback_channel.clone(),
            timeout: self.timeout,
        }
    }
}

/// What happened to one unit once its task finished.
#[derive(Debug, Default)]
pub struct Delivery {
    /// Where the unit's content lives, if Slack accepted any post.
    pub message: Option<PostedMessage>,
    /// The resolver returned an error (its failure text was delivered).
    pub resolve_failed: bool,
    /// Last post or update Slack rejected for this unit.
    pub error: Option<TransportError>,
}

impl<T: Transport> Sender<T> {
    pub fn new(transport: Arc<T>, config: &SenderConfig) -> Self {
        Self {
            transport,
            params: config.post_parameters(),
            channel: config.channel.clone().map(SlackChannelId),
            fallback_channel: config.fallback_channel.clone().map(SlackChannelId),
            timeout: config.timeout,
        }
    }

    /// Same transport and defaults, different destination.
    pub fn in_channel(&self, channel: impl Into<String>) -> Self {
        let mut sender = self.clone();
        sender.channel = Some(SlackChannelId(channel.into()));
        sender
    }

    pub fn customize(mut self, username: impl Into<String>, icon_emoji: impl Into<String>) -> Self {
        self.params.username = Some(username.into());
        self.params.icon_emoji = Some(icon_emoji.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn channel(&self) -> Option<&SlackChannelId> {
        self.channel.as_ref()
    }

    pub(crate) fn destination(&self) -> Result<&SlackChannelId> {
        self.channel
            .as_ref()
            .filter(|c| !c.0.is_empty())
            .ok_or(Error::MissingChannel)
    }

    /// Post a single plain-text message.
    pub async fn post_message(&self, text: &str) -> Result<PostedMessage> {
        self.post_text(None, text).await
    }

    /// Post `texts` as a thread: the first text is the root, the rest are
    /// replies in order. Stops at the first rejected post.
    pub async fn post_message_thread<S: AsRef<str>>(&self, texts: &[S]) -> Result<Option<Thread>> {
        let Some((first, rest)) = texts.split_first() else {
            return Ok(None);
        };
        let thread = Thread::from(self.post_text(None, first.as_ref()).await?);
        for text in rest {
            self.transport
                .post_message(
                    &thread.channel,
                    &self.params,
                    &MessageContent::text(text.as_ref()),
                    Some(&thread.ts),
                )
                .await?;
        }
        Ok(Some(thread))
    }

    async fn post_text(&self, thread_ts: Option<&SlackTs>, text: &str) -> Result<PostedMessage> {
        let channel = self.destination()?;
        let content = MessageContent::text(text);
        match self
            .transport
            .post_message(channel, &self.params, &content, thread_ts)
            .await
        {
            Err(e) if e.is_fatal() && thread_ts.is_none() => {
                let Some(fallback) = &self.fallback_channel else {
                    return Err(e.into());
                };
                tracing::warn!(
                    error = %e,
                    channel = %channel.0,
                    fallback = %fallback.0,
                    "Destination channel unavailable, posting to fallback channel"
                );
                Ok(self
                    .transport
                    .post_message(fallback, &self.params, &content, None)
                    .await?)
            }
            other => Ok(other?),
        }
    }

    /// Post one unit outside any thread. Returns once its placeholder has
    /// been posted; the resolver keeps running on the returned task, which
    /// yields the final [`Delivery`].
    pub async fn post_message_dynamic(&self, unit: MessageUnit) -> Result<JoinHandle<Delivery>> {
        let channel = self.destination()?.clone();
        let (ack_tx, ack_rx) = oneshot::channel();
        let transport = Arc::clone(&self.transport);
        let params = self.params.clone();
        let handle = tokio::spawn(async move {
            deliver_unit(&*transport, &params, &channel, None, unit, Some(ack_tx)).await
        });
        let _ = ack_rx.await;
        Ok(handle)
    }

    /// Post one unit and wait until it is fully resolved. The returned thread
    /// is anchored at the unit's message.
    pub async fn post_message_future(
        &self,
        thread_ts: Option<&SlackTs>,
        unit: MessageUnit,
    ) -> Result<Thread> {
        let channel = self.destination()?;
        let delivery = deliver_unit(&*self.transport, &self.params, channel, thread_ts, unit, None).await;
        match (delivery.message, delivery.error) {
            (Some(message), _) => Ok(Thread::from(message)),
            (None, Some(e)) => Err(e.into()),
            (None, None) => Err(Error::NothingToPost),
        }
    }
}

/// Post a unit's placeholder, signal `placeholder_ack`, then resolve the unit
/// and replace the placeholder (or post fresh when there is none).
pub(crate) async fn deliver_unit<T: Transport>(
    transport: &T,
    params: &PostParameters,
    channel: &SlackChannelId,
    thread_ts: Option<&SlackTs>,
    unit: MessageUnit,
    placeholder_ack: Option<oneshot::Sender<()>>,
) -> Delivery {
    let mut delivery = Delivery::default();

    if let Some(text) = unit.placeholder_text() {
        match transport
            .post_message(channel, params, &MessageContent::text(text), thread_ts)
            .await
        {
            Ok(posted) => delivery.message = Some(posted),
            Err(e) => {
                tracing::warn!(error = %e, "Failed posting placeholder");
                delivery.error = Some(e);
            }
        }
    }

    if let Some(ack) = placeholder_ack {
        let _ = ack.send(());
    }

    let Some(pending) = resolve::spawn(&unit) else {
        return delivery;
    };
    let resolution = pending.wait().await;
    delivery.resolve_failed = resolution.is_failure();

    let result = match &delivery.message {
        Some(placeholder) => {
            transport
                .update_message(&placeholder.channel, &placeholder.ts, params, &resolution.content)
                .await
        }
        None => {
            transport
                .post_message(channel, params, &resolution.content, thread_ts)
                .await
        }
    };
    match result {
        Ok(posted) => {
            delivery.message = Some(posted);
            delivery.error = None;
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed delivering resolved message");
            delivery.error = Some(e);
        }
    }
    delivery
}
