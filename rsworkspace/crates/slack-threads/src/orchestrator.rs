//! Thread builders: a root message, one reply per unit, and a summary that
//! is rewritten once every unit has settled.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use tokio::sync::oneshot;
use tokio::task::JoinSet;
use tokio::time::Instant;

use crate::config::MIN_THREAD_TIMEOUT;
use crate::error::{Error, Result, TransportError};
use crate::message::MessageUnit;
use crate::resolve;
use crate::sender::{Sender, deliver_unit};
use crate::summary::DynamicSummary;
use crate::thread::{PostedMessage, Thread, ThreadOutcome};
use crate::transport::{MessageContent, Transport};

/// Stand-in deadline when `now + timeout` is not representable.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// When a dynamic thread stops waiting for resolvers.
fn thread_deadline(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout.max(MIN_THREAD_TIMEOUT))
        .unwrap_or_else(|| now + FAR_FUTURE)
}

/// Per-thread counters gathered while units settle.
#[derive(Debug, Default)]
struct Tally {
    failures: usize,
    undelivered: usize,
    fatal: Option<TransportError>,
}

impl<T: Transport> Sender<T> {
    /// Post a thread whose replies resolve concurrently.
    ///
    /// The root and every placeholder are posted first, in order. Each
    /// resolved unit then replaces its placeholder as soon as it is ready,
    /// and the root is rewritten with the summary last.
    pub async fn post_thread_dynamic(
        &self,
        summary: &DynamicSummary,
        units: Vec<MessageUnit>,
    ) -> Result<ThreadOutcome> {
        let channel = self.destination()?;
        let total = units.len();
        let deadline = thread_deadline(self.timeout);

        tracing::debug!(channel = %channel.0, total, "Starting thread");
        let root = self
            .transport
            .post_message(
                channel,
                &self.params,
                &MessageContent::text(summary.placeholder_text()),
                None,
            )
            .await
            .map_err(Error::StartThread)?;
        let thread = Thread::from(root);

        let mut pending: FuturesUnordered<_> = units
            .iter()
            .enumerate()
            .filter_map(|(index, unit)| {
                resolve::spawn(unit).map(|resolution| async move { (index, resolution.wait().await) })
            })
            .collect();

        let mut placeholders: Vec<Option<PostedMessage>> = Vec::with_capacity(total);
        for unit in &units {
            let Some(text) = unit.placeholder_text() else {
                placeholders.push(None);
                continue;
            };
            match self
                .transport
                .post_message(
                    &thread.channel,
                    &self.params,
                    &MessageContent::text(text),
                    Some(&thread.ts),
                )
                .await
            {
                Ok(posted) => placeholders.push(Some(posted)),
                Err(source) if source.is_fatal() => {
                    return Err(Error::ChannelNotFound { thread, source });
                }
                Err(e) => {
                    tracing::warn!(error = %e, thread_ts = %thread.ts.0, "Failed posting placeholder");
                    placeholders.push(None);
                }
            }
        }
        tracing::debug!(thread_ts = %thread.ts.0, pending = pending.len(), "Placeholders posted");

        let mut tally = Tally::default();
        let sleep = tokio::time::sleep_until(deadline);
        tokio::pin!(sleep);

        while !pending.is_empty() {
            tokio::select! {
                biased;

                Some((index, resolution)) = pending.next() => {
                    if resolution.is_failure() {
                        tally.failures += 1;
                    }
                    let result = match &placeholders[index] {
                        Some(placeholder) => {
                            self.transport
                                .update_message(
                                    &placeholder.channel,
                                    &placeholder.ts,
                                    &self.params,
                                    &resolution.content,
                                )
                                .await
                        }
                        None => {
                            self.transport
                                .post_message(
                                    &thread.channel,
                                    &self.params,
                                    &resolution.content,
                                    Some(&thread.ts),
                                )
                                .await
                        }
                    };
                    match result {
                        Ok(_) => {}
                        Err(source) if source.is_fatal() => {
                            return Err(Error::ChannelNotFound { thread, source });
                        }
                        Err(e) => {
                            tracing::error!(error = %e, index, "Failed delivering resolved message");
                            tally.undelivered += 1;
                        }
                    }
                }
                () = &mut sleep => {
                    let pending = pending.len();
                    tracing::warn!(thread_ts = %thread.ts.0, pending, "Thread deadline exceeded");
                    return Err(Error::DeadlineExceeded { thread, pending });
                }
            }
        }

        tracing::debug!(
            thread_ts = %thread.ts.0,
            total,
            failures = tally.failures,
            undelivered = tally.undelivered,
            "Finalizing thread"
        );
        if let Some(content) = summary.finalize(total, tally.failures)
            && let Err(source) = self
                .transport
                .update_message(&thread.channel, &thread.ts, &self.params, &content)
                .await
        {
            return Err(Error::Summary { thread, source });
        }

        Ok(ThreadOutcome {
            thread,
            total,
            failures: tally.failures,
            undelivered: tally.undelivered,
        })
    }

    /// Post `root` and wait for it to resolve, then post `units` as replies.
    /// The root is not touched again.
    pub async fn post_thread_future(&self, root: MessageUnit, units: Vec<MessageUnit>) -> Result<Thread> {
        let thread = self
            .post_message_future(None, root)
            .await
            .map_err(|e| match e {
                Error::Transport(source) => Error::StartThread(source),
                other => other,
            })?;

        let tally = self.deliver_in_order(&thread, units).await;
        if let Some(source) = tally.fatal {
            return Err(Error::ChannelNotFound { thread, source });
        }
        Ok(thread)
    }

    /// Post a root from `summarizer(0, 0)`, post `units` as replies, and
    /// rewrite the root with `summarizer(total, failures)` once all are done.
    pub async fn post_thread_future_with_summarizer<F>(
        &self,
        summarizer: F,
        units: Vec<MessageUnit>,
    ) -> Result<Thread>
    where
        F: Fn(usize, usize) -> String,
    {
        let channel = self.destination()?;
        let total = units.len();
        let root = self
            .transport
            .post_message(
                channel,
                &self.params,
                &MessageContent::text(summarizer(0, 0)),
                None,
            )
            .await
            .map_err(Error::StartThread)?;
        let thread = Thread::from(root);

        let tally = self.deliver_in_order(&thread, units).await;
        if let Some(source) = tally.fatal {
            return Err(Error::ChannelNotFound { thread, source });
        }

        let content = MessageContent::text(summarizer(total, tally.failures));
        if let Err(source) = self
            .transport
            .update_message(&thread.channel, &thread.ts, &self.params, &content)
            .await
        {
            return Err(Error::Summary { thread, source });
        }
        Ok(thread)
    }

    /// Hand each unit to its own task, starting the next one only after the
    /// previous placeholder is up, then wait for all of them.
    async fn deliver_in_order(&self, thread: &Thread, units: Vec<MessageUnit>) -> Tally {
        let mut tasks = JoinSet::new();
        for unit in units {
            let (ack_tx, ack_rx) = oneshot::channel();
            let transport = Arc::clone(&self.transport);
            let params = self.params.clone();
            let thread = thread.clone();
            tasks.spawn(async move {
                deliver_unit(
                    &*transport,
                    &params,
                    &thread.channel,
                    Some(&thread.ts),
                    unit,
                    Some(ack_tx),
                )
                .await
            });
            // Dropped without a send if the task died first.
            let _ = ack_rx.await;
        }

        let mut tally = Tally::default();
        while let Some(joined) = tasks.join_next().await {
            let delivery = match joined {
                Ok(delivery) => delivery,
                Err(e) => {
                    tracing::error!(error = %e, "Message task panicked");
                    tally.failures += 1;
                    continue;
                }
            };
            if delivery.resolve_failed {
                tally.failures += 1;
            }
            match delivery.error {
                Some(e) if e.is_fatal() => {
                    tally.fatal.get_or_insert(e);
                }
                Some(_) => tally.undelivered += 1,
                None => {}
            }
        }
        tally
    }
}
