//! Slack Web API transport: `chat.postMessage` and `chat.update` over HTTPS.

use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use slack_morphism::prelude::{SlackBlock, SlackChannelId, SlackTs};

use crate::error::{SlackErrorCode, TransportError};
use crate::rate_limit::RateLimiter;
use crate::thread::PostedMessage;
use crate::transport::{MessageContent, PostParameters, Transport};

pub const SLACK_API_BASE: &str = "https://slack.com";

pub struct SlackWebTransport {
    http: HttpClient,
    token: String,
    api_base: String,
    limiter: RateLimiter,
}

#[derive(Serialize)]
struct PostMessageBody<'a> {
    channel: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "no_blocks")]
    blocks: &'a [SlackBlock],
    #[serde(skip_serializing_if = "Option::is_none")]
    thread_ts: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    icon_emoji: Option<&'a str>,
    mrkdwn: bool,
}

#[derive(Serialize)]
struct UpdateMessageBody<'a> {
    channel: &'a str,
    ts: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "no_blocks")]
    blocks: &'a [SlackBlock],
}

#[derive(Deserialize)]
struct ChatResponse {
    ok: bool,
    error: Option<String>,
    channel: Option<String>,
    ts: Option<String>,
}

fn no_blocks(blocks: &&[SlackBlock]) -> bool {
    blocks.is_empty()
}

impl SlackWebTransport {
    pub fn new(token: impl Into<String>, api_rps: f32) -> Self {
        Self::with_api_base(token, api_rps, SLACK_API_BASE)
    }

    /// `api_base` should be `"https://slack.com"` in production; it is exposed
    /// for testing against a local mock server.
    pub fn with_api_base(token: impl Into<String>, api_rps: f32, api_base: &str) -> Self {
        Self {
            http: HttpClient::new(),
            token: token.into(),
            api_base: api_base.trim_end_matches('/').to_string(),
            limiter: RateLimiter::new(api_rps),
        }
    }

    async fn call<B: Serialize>(
        &self,
        method: &str,
        body: &B,
    ) -> Result<PostedMessage, TransportError> {
        self.limiter.acquire().await;

        let url = format!("{}/api/{method}", self.api_base);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await
            .map_err(|e| TransportError::network(format!("{method} request: {e}")))?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(TransportError::api("ratelimited"));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| TransportError::network(format!("{method} parse: {e}")))?;

        if !parsed.ok {
            return Err(TransportError::api(
                parsed.error.unwrap_or_else(|| "unknown".to_string()),
            ));
        }

        match (parsed.channel, parsed.ts) {
            (Some(channel), Some(ts)) => Ok(PostedMessage {
                channel: SlackChannelId(channel),
                ts: SlackTs(ts),
            }),
            _ => Err(TransportError {
                code: SlackErrorCode::Unknown,
                message: format!("{method}: missing channel or ts in Slack response"),
            }),
        }
    }
}

impl Transport for SlackWebTransport {
    async fn post_message(
        &self,
        channel: &SlackChannelId,
        params: &PostParameters,
        content: &MessageContent,
        thread_ts: Option<&SlackTs>,
    ) -> Result<PostedMessage, TransportError> {
        let body = PostMessageBody {
            channel: &channel.0,
            text: &content.text,
            blocks: &content.blocks,
            thread_ts: thread_ts.map(|ts| ts.0.as_str()),
            username: params.username.as_deref(),
            icon_emoji: params.icon_emoji.as_deref(),
            mrkdwn: params.markdown,
        };
        self.call("chat.postMessage", &body).await
    }

    async fn update_message(
        &self,
        channel: &SlackChannelId,
        ts: &SlackTs,
        _params: &PostParameters,
        content: &MessageContent,
    ) -> Result<PostedMessage, TransportError> {
        let body = UpdateMessageBody {
            channel: &channel.0,
            ts: &ts.0,
            text: &content.text,
            blocks: &content.blocks,
        };
        self.call("chat.update", &body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slack_morphism::prelude::SlackDividerBlock;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn transport(server: &MockServer) -> SlackWebTransport {
        SlackWebTransport::with_api_base("xoxb-test", 50.0, &server.uri())
    }

    fn params() -> PostParameters {
        PostParameters {
            username: Some("Slack Robot".to_string()),
            icon_emoji: Some("robot_face".to_string()),
            markdown: true,
        }
    }

    #[tokio::test]
    async fn post_message_returns_channel_id_and_ts() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/chat.postMessage"))
            .and(header("authorization", "Bearer xoxb-test"))
            .and(body_partial_json(serde_json::json!({
                "channel": "test-3",
                "text": "computing results...",
                "thread_ts": "1700000000.000100",
                "username": "Slack Robot",
                "icon_emoji": "robot_face",
                "mrkdwn": true
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "channel": "C0TEST3",
                "ts": "1700000000.000200"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let posted = transport(&server)
            .post_message(
                &SlackChannelId("test-3".to_string()),
                &params(),
                &MessageContent::text("computing results..."),
                Some(&SlackTs("1700000000.000100".to_string())),
            )
            .await
            .unwrap();

        assert_eq!(posted.channel, SlackChannelId("C0TEST3".to_string()));
        assert_eq!(posted.ts, SlackTs("1700000000.000200".to_string()));
        server.verify().await;
    }

    #[tokio::test]
    async fn post_message_sends_blocks_when_present() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/chat.postMessage"))
            .and(body_partial_json(serde_json::json!({
                "blocks": [{ "type": "divider" }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "channel": "C1",
                "ts": "1.0"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let content = MessageContent::text("with blocks")
            .with_blocks(vec![SlackBlock::Divider(SlackDividerBlock::new())]);
        let result = transport(&server)
            .post_message(
                &SlackChannelId("C1".to_string()),
                &PostParameters::default(),
                &content,
                None,
            )
            .await;

        assert!(result.is_ok(), "{result:?}");
        server.verify().await;
    }

    #[tokio::test]
    async fn update_message_targets_ts() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/chat.update"))
            .and(body_partial_json(serde_json::json!({
                "channel": "C0TEST3",
                "ts": "1700000000.000200",
                "text": "40 + 2 = 42"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "channel": "C0TEST3",
                "ts": "1700000000.000200"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let result = transport(&server)
            .update_message(
                &SlackChannelId("C0TEST3".to_string()),
                &SlackTs("1700000000.000200".to_string()),
                &params(),
                &MessageContent::text("40 + 2 = 42"),
            )
            .await;

        assert!(result.is_ok(), "{result:?}");
        server.verify().await;
    }

    #[tokio::test]
    async fn api_error_is_classified() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/chat.update"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": false,
                "error": "channel_not_found"
            })))
            .mount(&server)
            .await;

        let err = transport(&server)
            .update_message(
                &SlackChannelId("C404".to_string()),
                &SlackTs("1.0".to_string()),
                &params(),
                &MessageContent::text("x"),
            )
            .await
            .unwrap_err();

        assert_eq!(err.code, SlackErrorCode::ChannelNotFound);
        assert!(err.is_fatal());
        assert_eq!(err.to_string(), "channel_not_found");
    }

    #[tokio::test]
    async fn http_429_is_rate_limited() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/chat.postMessage"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "1"))
            .mount(&server)
            .await;

        let err = transport(&server)
            .post_message(
                &SlackChannelId("C1".to_string()),
                &params(),
                &MessageContent::text("x"),
                None,
            )
            .await
            .unwrap_err();

        assert_eq!(err.code, SlackErrorCode::RateLimited);
        assert!(!err.is_fatal());
    }

    #[tokio::test]
    async fn missing_ts_in_response_is_an_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/chat.postMessage"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "ok": true })),
            )
            .mount(&server)
            .await;

        let err = transport(&server)
            .post_message(
                &SlackChannelId("C1".to_string()),
                &params(),
                &MessageContent::text("x"),
                None,
            )
            .await
            .unwrap_err();

        assert_eq!(err.code, SlackErrorCode::Unknown);
        assert!(err.message.contains("missing channel or ts"));
    }

    #[tokio::test]
    async fn unreachable_server_is_network_error() {
        let transport = SlackWebTransport::with_api_base("xoxb-test", 50.0, "http://127.0.0.1:1");
        let err = transport
            .post_message(
                &SlackChannelId("C1".to_string()),
                &params(),
                &MessageContent::text("x"),
                None,
            )
            .await
            .unwrap_err();

        assert_eq!(err.code, SlackErrorCode::NetworkError);
        assert!(err.message.starts_with("chat.postMessage request:"));
    }
}
