//! Error types for slack-threads.
//!
//! Slack Web API failures are mapped to named codes so callers can tell a
//! vanished channel apart from a transient network problem.

use thiserror::Error;

use crate::thread::Thread;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Error produced by a message resolver.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Slack Web API error code (subset relevant to posting and updating).
///
/// Maps the `error` string of a failed `chat.*` response to a named variant;
/// everything else falls through to [`SlackErrorCode::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlackErrorCode {
    // ── Channel gone ──────────────────────────────────────────────────────────
    /// `channel_not_found`
    ChannelNotFound,
    /// `is_archived`
    ChannelArchived,
    /// `not_in_channel`
    NotInChannel,

    // ── Message ───────────────────────────────────────────────────────────────
    /// `message_not_found`
    MessageNotFound,
    /// `cant_update_message`
    CantUpdateMessage,
    /// `edit_window_closed`
    EditWindowClosed,
    /// `msg_too_long`
    MessageTooLong,
    /// `no_text`
    NoText,
    /// `invalid_blocks` / `invalid_blocks_format`
    InvalidBlocks,

    // ── Auth ──────────────────────────────────────────────────────────────────
    /// `invalid_auth`, `not_authed`, `token_revoked`, `account_inactive`
    InvalidAuth,
    /// `missing_scope`
    MissingScope,
    /// `restricted_action`
    RestrictedAction,

    // ── Transient ─────────────────────────────────────────────────────────────
    /// `ratelimited` or HTTP 429.
    RateLimited,
    /// `fatal_error`, `internal_error`, `service_unavailable`
    ServerError,
    /// Request never got a usable response.
    NetworkError,

    // ── Catch-all ─────────────────────────────────────────────────────────────
    Unknown,
}

impl SlackErrorCode {
    /// Derive the code from the `error` field of a Slack API response.
    pub fn from_raw(code: &str) -> Self {
        match code {
            "channel_not_found" => Self::ChannelNotFound,
            "is_archived" => Self::ChannelArchived,
            "not_in_channel" => Self::NotInChannel,
            "message_not_found" => Self::MessageNotFound,
            "cant_update_message" => Self::CantUpdateMessage,
            "edit_window_closed" => Self::EditWindowClosed,
            "msg_too_long" => Self::MessageTooLong,
            "no_text" => Self::NoText,
            "invalid_blocks" | "invalid_blocks_format" => Self::InvalidBlocks,
            "invalid_auth" | "not_authed" | "token_revoked" | "account_inactive" => {
                Self::InvalidAuth
            }
            "missing_scope" => Self::MissingScope,
            "restricted_action" => Self::RestrictedAction,
            "ratelimited" => Self::RateLimited,
            "fatal_error" | "internal_error" | "service_unavailable" => Self::ServerError,
            _ => Self::Unknown,
        }
    }

    /// True if the destination channel is unusable for the rest of the thread.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ChannelNotFound | Self::ChannelArchived | Self::NotInChannel
        )
    }
}

/// A failed post or update.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct TransportError {
    pub code: SlackErrorCode,
    /// Raw Slack error string, or the underlying I/O error text.
    pub message: String,
}

impl TransportError {
    /// Error reported by the Slack API in an `ok: false` response.
    pub fn api(code: impl Into<String>) -> Self {
        let message = code.into();
        Self {
            code: SlackErrorCode::from_raw(&message),
            message,
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self {
            code: SlackErrorCode::NetworkError,
            message: message.into(),
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.code.is_fatal()
    }
}

/// Raised in place of a resolver's own error when it never reported back.
#[derive(Debug, Error)]
pub enum ResolverError {
    #[error("resolver panicked before producing a result")]
    Panicked,
}

/// Errors returned by [`Sender`](crate::Sender) operations.
///
/// Only abort-class conditions are returned; per-message failures are
/// rendered into the thread and counted instead.
#[derive(Debug, Error)]
pub enum Error {
    #[error("destination channel not set")]
    MissingChannel,

    #[error("failed to start thread: {0}")]
    StartThread(#[source] TransportError),

    #[error("failed building thread: {source}")]
    ChannelNotFound {
        thread: Thread,
        source: TransportError,
    },

    #[error("failed building thread: deadline exceeded with {pending} message(s) unresolved")]
    DeadlineExceeded { thread: Thread, pending: usize },

    #[error("failed updating thread summary: {source}")]
    Summary {
        thread: Thread,
        source: TransportError,
    },

    #[error("message has neither a placeholder nor a resolver")]
    NothingToPost,

    #[error("failed posting to Slack: {0}")]
    Transport(#[from] TransportError),
}

impl Error {
    /// The partially built thread, for errors raised after the root was posted.
    pub fn thread(&self) -> Option<&Thread> {
        match self {
            Self::ChannelNotFound { thread, .. }
            | Self::DeadlineExceeded { thread, .. }
            | Self::Summary { thread, .. } => Some(thread),
            _ => None,
        }
    }
}
