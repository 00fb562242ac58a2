use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde_json::json;
use slack_morphism::prelude::SlackBlock;
use slack_threads::{
    BoxError, DynamicSummary, MessageContent, MessageUnit, Sender, SenderConfig,
    SlackWebTransport, SystemEnv, default_summary,
};

/// Share of demo resolvers that fail on purpose.
const FAILURE_RATE: f64 = 0.1;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Destination channel, overriding SLACK_CHANNEL
    #[arg(long)]
    channel: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Post a message, a three-message thread, and one dynamic message
    Simple,
    /// Post a thread of randomly delayed, occasionally failing replies
    Dynamic {
        #[arg(long, default_value_t = 5)]
        count: usize,

        #[arg(long, default_value_t = 10)]
        max_delay_secs: u64,

        /// Wait for each placeholder before starting the next reply
        #[arg(long)]
        sequential: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();
    let config = SenderConfig::from_env(&SystemEnv)?;
    let transport = Arc::new(SlackWebTransport::new(&config.token, config.api_rps));
    let mut sender = Sender::new(transport, &config);
    if let Some(channel) = args.channel {
        sender = sender.in_channel(channel);
    }

    match args.command {
        Command::Simple => run_simple(&sender).await,
        Command::Dynamic {
            count,
            max_delay_secs,
            sequential,
        } => run_dynamic(&sender, count, Duration::from_secs(max_delay_secs), sequential).await,
    }
}

async fn run_simple(sender: &Sender<SlackWebTransport>) -> anyhow::Result<()> {
    let posted = sender.post_message("Hello, World!").await?;
    tracing::info!(channel = %posted.channel.0, ts = %posted.ts.0, "Posted message");

    let thread = sender
        .post_message_thread(&[
            ":thread: starting a thread",
            "more details in the thread",
            "conclusion",
        ])
        .await?;
    if let Some(thread) = thread {
        tracing::info!(channel = %thread.channel.0, ts = %thread.ts.0, "Posted thread");
    }

    let handle = sender
        .post_message_dynamic(random_unit(0, Duration::from_secs(3)))
        .await?;
    tracing::info!("Placeholder posted, waiting for result");
    let delivery = handle.await?;
    tracing::info!(
        failed = delivery.resolve_failed,
        delivered = delivery.error.is_none(),
        "Dynamic message settled"
    );
    Ok(())
}

async fn run_dynamic(
    sender: &Sender<SlackWebTransport>,
    count: usize,
    max_delay: Duration,
    sequential: bool,
) -> anyhow::Result<()> {
    let units: Vec<MessageUnit> = (1..=count).map(|i| random_unit(i, max_delay)).collect();

    if sequential {
        let thread = sender
            .post_thread_future_with_summarizer(default_summary, units)
            .await?;
        tracing::info!(channel = %thread.channel.0, ts = %thread.ts.0, "Thread complete");
        return Ok(());
    }

    let outcome = sender
        .post_thread_dynamic(&DynamicSummary::default(), units)
        .await?;
    tracing::info!(
        channel = %outcome.thread.channel.0,
        ts = %outcome.thread.ts.0,
        total = outcome.total,
        failures = outcome.failures,
        undelivered = outcome.undelivered,
        "Thread complete"
    );
    Ok(())
}

fn random_unit(index: usize, max_delay: Duration) -> MessageUnit {
    MessageUnit::new()
        .with_placeholder(move || format!("computing result #{index}..."))
        .with_resolver(move || compute(index, max_delay))
        .with_on_failure(move |e| format!("computing result #{index}... failed: {e}"))
}

async fn compute(index: usize, max_delay: Duration) -> Result<MessageContent, BoxError> {
    let delay = max_delay.mul_f64(rand::random::<f64>());
    tokio::time::sleep(delay).await;
    if rand::random::<f64>() < FAILURE_RATE {
        return Err("randomly induced failure".into());
    }

    let a = u32::from(rand::random::<u8>());
    let b = u32::from(rand::random::<u8>());
    let text = format!("#{index}: {a} + {b} = {}", a + b);
    let blocks: Vec<SlackBlock> = serde_json::from_value(json!([
        {
            "type": "section",
            "text": { "type": "mrkdwn", "text": format!("*{text}*") }
        },
        {
            "type": "context",
            "elements": [
                { "type": "mrkdwn", "text": format!("took {:.1}s", delay.as_secs_f64()) }
            ]
        }
    ]))?;
    Ok(MessageContent::text(text).with_blocks(blocks))
}
