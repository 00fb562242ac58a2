use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;

use crate::error::BoxError;
use crate::transport::MessageContent;

/// Shown when a resolver fails and the unit has no failure formatter.
pub const GENERIC_FAILURE_TEXT: &str = "Something went wrong generating this message.";

pub(crate) type PlaceholderFn = Arc<dyn Fn() -> String + Send + Sync>;
pub(crate) type ResolverFn =
    Arc<dyn Fn() -> BoxFuture<'static, Result<MessageContent, BoxError>> + Send + Sync>;
pub(crate) type FailureFn = Arc<dyn Fn(&BoxError) -> String + Send + Sync>;

/// One logical message in a thread.
///
/// Each capability is optional on its own:
///
/// | placeholder | resolver | behaviour |
/// |-------------|----------|-----------|
/// | yes | no  | posted once, never updated |
/// | yes | yes | posted immediately, edited in place when resolved |
/// | no  | yes | posted only once resolved |
///
/// Hooks are shared, so a unit can be cloned and submitted many times.
#[derive(Clone, Default)]
pub struct MessageUnit {
    placeholder: Option<PlaceholderFn>,
    resolver: Option<ResolverFn>,
    on_failure: Option<FailureFn>,
}

impl MessageUnit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Placeholder-only unit with fixed text.
    pub fn text(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::new().with_placeholder(move || text.clone())
    }

    pub fn with_placeholder(mut self, placeholder: impl Fn() -> String + Send + Sync + 'static) -> Self {
        self.placeholder = Some(Arc::new(placeholder));
        self
    }

    /// The deferred work. Called at most once per submission.
    pub fn with_resolver<F, Fut>(mut self, resolver: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<MessageContent, BoxError>> + Send + 'static,
    {
        self.resolver = Some(Arc::new(move || resolver().boxed()));
        self
    }

    pub fn with_on_failure(
        mut self,
        on_failure: impl Fn(&BoxError) -> String + Send + Sync + 'static,
    ) -> Self {
        self.on_failure = Some(Arc::new(on_failure));
        self
    }

    pub fn has_placeholder(&self) -> bool {
        self.placeholder.is_some()
    }

    pub fn has_resolver(&self) -> bool {
        self.resolver.is_some()
    }

    pub fn has_failure_formatter(&self) -> bool {
        self.on_failure.is_some()
    }

    pub fn placeholder_text(&self) -> Option<String> {
        self.placeholder.as_ref().map(|placeholder| placeholder())
    }

    /// Never blank: falls back to [`GENERIC_FAILURE_TEXT`].
    pub fn failure_text(&self, err: &BoxError) -> String {
        self.on_failure
            .as_ref()
            .map(|on_failure| on_failure(err))
            .unwrap_or_else(|| GENERIC_FAILURE_TEXT.to_string())
    }

    pub(crate) fn resolver(&self) -> Option<&ResolverFn> {
        self.resolver.as_ref()
    }
}

impl std::fmt::Debug for MessageUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageUnit")
            .field("placeholder", &self.has_placeholder())
            .field("resolver", &self.has_resolver())
            .field("on_failure", &self.has_failure_formatter())
            .finish()
    }
}
