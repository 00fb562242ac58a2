use std::time::Duration;

use thiserror::Error;

use crate::env::ReadEnv;
use crate::transport::PostParameters;
use crate::util::coalesce;

/// Thread deadlines shorter than this are raised to it.
pub const MIN_THREAD_TIMEOUT: Duration = Duration::from_secs(60);

const DEFAULT_API_RPS: f32 = 1.0;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("no Slack API token: set SLACK_API_TOKEN or SLACK_BOT_TOKEN")]
    MissingToken,
}

/// Process-wide posting defaults, read once at startup and handed to every
/// [`Sender`](crate::Sender).
#[derive(Debug, Clone)]
pub struct SenderConfig {
    /// Bot token (xoxb-...). `SLACK_API_TOKEN` wins over `SLACK_BOT_TOKEN`.
    pub token: String,
    /// Default destination channel (name or ID). Read from `SLACK_CHANNEL`.
    pub channel: Option<String>,
    /// Channel that standalone posts are re-sent to when the destination no
    /// longer exists. Read from `SLACK_FALLBACK_CHANNEL`.
    pub fallback_channel: Option<String>,
    /// Display name override. Read from `SLACK_USERNAME`.
    pub username: Option<String>,
    /// Icon override, e.g. `robot_face`. Read from `SLACK_ICON_EMOJI`.
    pub icon_emoji: Option<String>,
    /// Render `text` as mrkdwn. Read from `SLACK_MARKDOWN`. Default: true.
    pub markdown: bool,
    /// Deadline for resolving a dynamic thread. Read from
    /// `SLACK_THREAD_TIMEOUT_SECS`. Never shorter than [`MIN_THREAD_TIMEOUT`]
    /// when applied.
    pub timeout: Duration,
    /// Max outbound Slack API requests per second. Default: 1.0.
    /// Read from `SLACK_API_RPS`. Clamped to [0.1, 50.0].
    pub api_rps: f32,
}

impl SenderConfig {
    pub fn from_env<E: ReadEnv>(env: &E) -> Result<Self, ConfigError> {
        let token = coalesce([
            env.var("SLACK_API_TOKEN").unwrap_or_default(),
            env.var("SLACK_BOT_TOKEN").unwrap_or_default(),
        ]);
        if token.is_empty() {
            tracing::error!("no Slack API token");
            return Err(ConfigError::MissingToken);
        }
        let non_empty = |key: &str| env.var(key).ok().filter(|v| !v.is_empty());
        let markdown = env
            .var("SLACK_MARKDOWN")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);
        let timeout = env
            .var("SLACK_THREAD_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(MIN_THREAD_TIMEOUT);
        let api_rps = env
            .var("SLACK_API_RPS")
            .ok()
            .and_then(|v| v.parse::<f32>().ok())
            .filter(|v| v.is_finite())
            .unwrap_or(DEFAULT_API_RPS)
            .clamp(0.1, 50.0);

        Ok(Self {
            token,
            channel: non_empty("SLACK_CHANNEL"),
            fallback_channel: non_empty("SLACK_FALLBACK_CHANNEL"),
            username: non_empty("SLACK_USERNAME"),
            icon_emoji: non_empty("SLACK_ICON_EMOJI"),
            markdown,
            timeout,
            api_rps,
        })
    }

    pub fn post_parameters(&self) -> PostParameters {
        PostParameters {
            username: self.username.clone(),
            icon_emoji: self.icon_emoji.clone(),
            markdown: self.markdown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::InMemoryEnv;

    fn base_env() -> InMemoryEnv {
        let env = InMemoryEnv::new();
        env.set("SLACK_BOT_TOKEN", "xoxb-test");
        env
    }

    #[test]
    fn from_env_defaults() {
        let config = SenderConfig::from_env(&base_env()).unwrap();
        assert_eq!(config.token, "xoxb-test");
        assert!(config.channel.is_none());
        assert!(config.fallback_channel.is_none());
        assert!(config.username.is_none());
        assert!(config.icon_emoji.is_none());
        assert!(config.markdown);
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert!((config.api_rps - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn missing_token_is_an_error() {
        let err = SenderConfig::from_env(&InMemoryEnv::new()).unwrap_err();
        assert_eq!(err, ConfigError::MissingToken);
    }

    #[test]
    fn empty_tokens_are_missing() {
        let env = InMemoryEnv::new();
        env.set("SLACK_API_TOKEN", "");
        env.set("SLACK_BOT_TOKEN", "");
        assert!(SenderConfig::from_env(&env).is_err());
    }

    #[test]
    fn api_token_wins_over_bot_token() {
        let env = base_env();
        env.set("SLACK_API_TOKEN", "xoxb-api");
        assert_eq!(SenderConfig::from_env(&env).unwrap().token, "xoxb-api");
    }

    #[test]
    fn empty_api_token_falls_back_to_bot_token() {
        let env = base_env();
        env.set("SLACK_API_TOKEN", "");
        assert_eq!(SenderConfig::from_env(&env).unwrap().token, "xoxb-test");
    }

    #[test]
    fn channels_and_identity_read() {
        let env = base_env();
        env.set("SLACK_CHANNEL", "test-3");
        env.set("SLACK_FALLBACK_CHANNEL", "C0FALLBACK");
        env.set("SLACK_USERNAME", "Slack Robot");
        env.set("SLACK_ICON_EMOJI", "robot_face");
        let config = SenderConfig::from_env(&env).unwrap();
        assert_eq!(config.channel.as_deref(), Some("test-3"));
        assert_eq!(config.fallback_channel.as_deref(), Some("C0FALLBACK"));

        let params = config.post_parameters();
        assert_eq!(params.username.as_deref(), Some("Slack Robot"));
        assert_eq!(params.icon_emoji.as_deref(), Some("robot_face"));
        assert!(params.markdown);
    }

    #[test]
    fn empty_channel_is_none() {
        let env = base_env();
        env.set("SLACK_CHANNEL", "");
        assert!(SenderConfig::from_env(&env).unwrap().channel.is_none());
    }

    #[test]
    fn markdown_disabled() {
        let env = base_env();
        env.set("SLACK_MARKDOWN", "false");
        assert!(!SenderConfig::from_env(&env).unwrap().markdown);

        let env = base_env();
        env.set("SLACK_MARKDOWN", "0");
        assert!(!SenderConfig::from_env(&env).unwrap().markdown);
    }

    #[test]
    fn timeout_custom_value() {
        let env = base_env();
        env.set("SLACK_THREAD_TIMEOUT_SECS", "300");
        assert_eq!(
            SenderConfig::from_env(&env).unwrap().timeout,
            Duration::from_secs(300)
        );
    }

    #[test]
    fn timeout_invalid_falls_back_to_default() {
        let env = base_env();
        env.set("SLACK_THREAD_TIMEOUT_SECS", "soon");
        assert_eq!(SenderConfig::from_env(&env).unwrap().timeout, MIN_THREAD_TIMEOUT);
    }

    #[test]
    fn api_rps_clamped() {
        let env = base_env();
        env.set("SLACK_API_RPS", "9999.0");
        assert!((SenderConfig::from_env(&env).unwrap().api_rps - 50.0).abs() < f32::EPSILON);

        let env = base_env();
        env.set("SLACK_API_RPS", "0.0");
        assert!((SenderConfig::from_env(&env).unwrap().api_rps - 0.1).abs() < f32::EPSILON);
    }

    #[test]
    fn api_rps_nan_falls_back_to_default() {
        let env = base_env();
        env.set("SLACK_API_RPS", "NaN");
        assert!((SenderConfig::from_env(&env).unwrap().api_rps - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn api_rps_infinite_falls_back_to_default() {
        let env = base_env();
        env.set("SLACK_API_RPS", "inf");
        assert!((SenderConfig::from_env(&env).unwrap().api_rps - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn api_rps_invalid_falls_back_to_default() {
        let env = base_env();
        env.set("SLACK_API_RPS", "fast");
        assert!((SenderConfig::from_env(&env).unwrap().api_rps - 1.0).abs() < f32::EPSILON);
    }
}
