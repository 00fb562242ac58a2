//! # slack-threads
//!
//! Post Slack threads whose replies are produced asynchronously.
//!
//! ## Features
//!
//! - Every reply gets an immediate placeholder, posted in caller order.
//! - Resolvers run concurrently; each placeholder is edited in place as soon as its content is ready.
//! - Failed resolvers are rendered with a per-message failure text and counted, never aborting the thread.
//! - The thread's root message is rewritten with a summary once every reply has settled.
//! - One deadline per thread (at least 60 s); missing or archived channels abort immediately.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use slack_threads::{
//!     BoxError, DynamicSummary, MessageContent, MessageUnit, Sender, SenderConfig, SlackWebTransport,
//!     SystemEnv,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SenderConfig::from_env(&SystemEnv)?;
//!     let transport = Arc::new(SlackWebTransport::new(&config.token, config.api_rps));
//!     let sender = Sender::new(transport, &config);
//!
//!     let unit = MessageUnit::new()
//!         .with_placeholder(|| "computing results...".to_string())
//!         .with_resolver(|| async { Ok::<_, BoxError>(MessageContent::text("40 + 2 = 42")) });
//!
//!     let outcome = sender
//!         .post_thread_dynamic(&DynamicSummary::default(), vec![MessageUnit::text("details below"), unit])
//!         .await?;
//!     println!("{} of {} failed", outcome.failures, outcome.total);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod env;
pub mod error;
pub mod message;
#[cfg(any(test, feature = "test-support"))]
pub mod mocks;
pub mod orchestrator;
pub mod rate_limit;
pub mod resolve;
pub mod sender;
pub mod slack;
pub mod summary;
pub mod thread;
pub mod transport;
pub mod util;

pub use config::{ConfigError, MIN_THREAD_TIMEOUT, SenderConfig};
pub use env::{ReadEnv, SystemEnv};
pub use error::{BoxError, Error, ResolverError, SlackErrorCode, TransportError};
pub use message::{GENERIC_FAILURE_TEXT, MessageUnit};
pub use sender::{Delivery, Sender};
pub use slack::SlackWebTransport;
pub use summary::{DynamicSummary, SummaryGenerator, default_summary};
pub use thread::{PostedMessage, Thread, ThreadOutcome};
pub use transport::{MessageContent, PostParameters, Transport};
pub use util::coalesce;
