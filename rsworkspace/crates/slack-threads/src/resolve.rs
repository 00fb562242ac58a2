//! Runs a unit's resolver and turns its outcome into displayable content.

use tokio::sync::oneshot;

use crate::error::{BoxError, ResolverError};
use crate::message::MessageUnit;
use crate::transport::MessageContent;

/// Final content for one unit. Failed resolutions carry the unit's failure
/// text and no blocks; the original error is kept for counting.
#[derive(Debug)]
pub struct Resolution {
    pub content: MessageContent,
    pub error: Option<BoxError>,
}

impl Resolution {
    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }

    fn failed(unit: &MessageUnit, error: BoxError) -> Self {
        Self {
            content: MessageContent::text(unit.failure_text(&error)),
            error: Some(error),
        }
    }
}

/// Run the unit's resolver once, inline. Returns `None` for placeholder-only
/// units, which are complete as soon as their placeholder is posted.
pub async fn resolve(unit: &MessageUnit) -> Option<Resolution> {
    let resolver = unit.resolver()?;
    let resolution = match resolver().await {
        Ok(content) => Resolution {
            content,
            error: None,
        },
        Err(error) => {
            tracing::debug!(error = %error, "Message resolver failed");
            Resolution::failed(unit, error)
        }
    };
    Some(resolution)
}

/// A resolver running on its own task.
pub(crate) struct PendingResolution {
    unit: MessageUnit,
    rx: oneshot::Receiver<Resolution>,
}

impl PendingResolution {
    /// Wait for the resolver's single result. A resolver that panicked is
    /// reported as a failure.
    pub(crate) async fn wait(self) -> Resolution {
        match self.rx.await {
            Ok(resolution) => resolution,
            Err(_) => {
                tracing::error!("Message resolver exited without reporting a result");
                Resolution::failed(&self.unit, Box::new(ResolverError::Panicked))
            }
        }
    }
}

/// Start the unit's resolver on a new task. The task reports back over a
/// channel owned by the returned handle and never touches caller state.
pub(crate) fn spawn(unit: &MessageUnit) -> Option<PendingResolution> {
    if !unit.has_resolver() {
        return None;
    }
    let (tx, rx) = oneshot::channel();
    let task_unit = unit.clone();
    tokio::spawn(async move {
        if let Some(resolution) = resolve(&task_unit).await {
            // Receiver is gone once the thread deadline has passed.
            let _ = tx.send(resolution);
        }
    });
    Some(PendingResolution {
        unit: unit.clone(),
        rx,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::message::GENERIC_FAILURE_TEXT;

    fn failing_unit() -> MessageUnit {
        MessageUnit::new()
            .with_resolver(|| async { Err::<MessageContent, BoxError>("randomly induced failure".into()) })
    }

    #[tokio::test]
    async fn placeholder_only_unit_has_no_resolution() {
        assert!(resolve(&MessageUnit::text("hello")).await.is_none());
        assert!(spawn(&MessageUnit::text("hello")).is_none());
    }

    #[tokio::test]
    async fn success_keeps_content() {
        let unit = MessageUnit::new().with_resolver(|| async {
            Ok::<_, BoxError>(MessageContent::text("40 + 2 = 42"))
        });
        let resolution = resolve(&unit).await.unwrap();
        assert!(!resolution.is_failure());
        assert_eq!(resolution.content.text, "40 + 2 = 42");
    }

    #[tokio::test]
    async fn failure_uses_on_failure_text() {
        let unit = failing_unit()
            .with_on_failure(|e| format!("computing results... failed: {e}"));
        let resolution = resolve(&unit).await.unwrap();
        assert!(resolution.is_failure());
        assert_eq!(
            resolution.content.text,
            "computing results... failed: randomly induced failure"
        );
        assert!(resolution.content.blocks.is_empty());
        assert_eq!(
            resolution.error.unwrap().to_string(),
            "randomly induced failure"
        );
    }

    #[tokio::test]
    async fn failure_without_formatter_uses_generic_text() {
        let resolution = resolve(&failing_unit()).await.unwrap();
        assert!(resolution.is_failure());
        assert_eq!(resolution.content.text, GENERIC_FAILURE_TEXT);
    }

    #[tokio::test]
    async fn spawned_resolver_runs_exactly_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let unit = MessageUnit::new().with_resolver(move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok::<_, BoxError>(MessageContent::text("done"))
            }
        });

        let resolution = spawn(&unit).unwrap().wait().await;
        assert_eq!(resolution.content.text, "done");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn panicking_resolver_is_a_failure() {
        let unit = MessageUnit::new()
            .with_resolver(|| async {
                if true {
                    panic!("resolver blew up");
                }
                Ok::<_, BoxError>(MessageContent::text("unreachable"))
            })
            .with_on_failure(|e| format!("failed: {e}"));

        let resolution = spawn(&unit).unwrap().wait().await;
        assert!(resolution.is_failure());
        assert_eq!(
            resolution.content.text,
            "failed: resolver panicked before producing a result"
        );
    }
}
