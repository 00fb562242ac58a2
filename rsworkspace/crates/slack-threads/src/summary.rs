use std::sync::Arc;

use crate::error::BoxError;
use crate::message::{FailureFn, GENERIC_FAILURE_TEXT, PlaceholderFn};
use crate::transport::MessageContent;

/// Root placeholder used when a summary has none of its own.
pub const DEFAULT_ROOT_PLACEHOLDER: &str = "preparing thread...";

/// Maps `(total, failures)` to the root message text.
pub type SummaryGenerator = Arc<dyn Fn(usize, usize) -> String + Send + Sync>;

type EventualSummaryFn =
    Arc<dyn Fn(usize, usize) -> Result<MessageContent, BoxError> + Send + Sync>;

/// Default root text. `(0, 0)` is the placeholder shown while the thread is
/// being built.
pub fn default_summary(total: usize, failures: usize) -> String {
    let mut text = String::from(":thread: Preparing responses... ");
    if total == 0 {
        return text;
    }
    let failures = failures.min(total);
    if failures == 0 {
        text.push_str(&format!("{total}/{total} done! :white_check_mark:"));
    } else {
        let succeeded = total - failures;
        text.push_str(&format!(
            "{succeeded} succeeded but {failures} failed. :x:"
        ));
    }
    text
}

/// Hooks for the thread's root message, shaped like a
/// [`MessageUnit`](crate::MessageUnit) but fed with the aggregate counts.
#[derive(Clone)]
pub struct DynamicSummary {
    placeholder: Option<PlaceholderFn>,
    eventual: Option<EventualSummaryFn>,
    on_failure: Option<FailureFn>,
}

impl DynamicSummary {
    /// Summary with no hooks: the root shows [`DEFAULT_ROOT_PLACEHOLDER`]
    /// and is never updated.
    pub fn empty() -> Self {
        Self {
            placeholder: None,
            eventual: None,
            on_failure: None,
        }
    }

    pub fn from_generator(generator: impl Fn(usize, usize) -> String + Send + Sync + 'static) -> Self {
        let generator: SummaryGenerator = Arc::new(generator);
        let initial = Arc::clone(&generator);
        Self::empty()
            .with_placeholder(move || initial(0, 0))
            .with_eventual(move |total, failures| Ok(MessageContent::text(generator(total, failures))))
    }

    pub fn with_placeholder(mut self, placeholder: impl Fn() -> String + Send + Sync + 'static) -> Self {
        self.placeholder = Some(Arc::new(placeholder));
        self
    }

    pub fn with_eventual(
        mut self,
        eventual: impl Fn(usize, usize) -> Result<MessageContent, BoxError> + Send + Sync + 'static,
    ) -> Self {
        self.eventual = Some(Arc::new(eventual));
        self
    }

    pub fn with_on_failure(
        mut self,
        on_failure: impl Fn(&BoxError) -> String + Send + Sync + 'static,
    ) -> Self {
        self.on_failure = Some(Arc::new(on_failure));
        self
    }

    pub fn placeholder_text(&self) -> String {
        self.placeholder
            .as_ref()
            .map(|placeholder| placeholder())
            .unwrap_or_else(|| DEFAULT_ROOT_PLACEHOLDER.to_string())
    }

    /// Final root content, or `None` when the summary has no eventual phase.
    pub fn finalize(&self, total: usize, failures: usize) -> Option<MessageContent> {
        let eventual = self.eventual.as_ref()?;
        let content = eventual(total, failures).unwrap_or_else(|err| {
            tracing::warn!(error = %err, "Thread summary failed to render");
            let text = self
                .on_failure
                .as_ref()
                .map(|on_failure| on_failure(&err))
                .unwrap_or_else(|| GENERIC_FAILURE_TEXT.to_string());
            MessageContent::text(text)
        });
        Some(content)
    }
}

impl Default for DynamicSummary {
    fn default() -> Self {
        Self::from_generator(default_summary)
    }
}
