//! # Telegram Bot API Adapter
//!
//! Implements the `ForumTransport` trait on top of the Telegram Bot API using `reqwest`.
//! Only the three calls the swarm commands need are covered: creating a forum topic,
//! renaming it, and posting a message into it.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::traits::ForumTransport;
use crate::domain::types::ForumTopic;

pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";
const MAX_ATTEMPTS: u32 = 3;
const MAX_RETRY_AFTER_SECS: u64 = 30;

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    error_code: Option<i64>,
    #[serde(default)]
    parameters: Option<ResponseParameters>,
}

#[derive(Debug, Deserialize)]
struct ResponseParameters {
    #[serde(default)]
    retry_after: Option<u64>,
}

#[derive(Debug, Serialize)]
struct CreateForumTopicRequest<'a> {
    chat_id: i64,
    name: &'a str,
}

#[derive(Debug, Serialize)]
struct EditForumTopicRequest<'a> {
    chat_id: i64,
    message_thread_id: i64,
    name: &'a str,
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message_thread_id: Option<i64>,
    disable_notification: bool,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    message_id: i64,
}

/// Telegram answers a rename to the current name with this error; the topic is alive.
fn is_not_modified(description: &str) -> bool {
    description.contains("TOPIC_NOT_MODIFIED")
}

#[derive(Clone)]
pub struct TelegramClient {
    http: Client,
    api_base: String,
    token: String,
}

impl TelegramClient {
    pub fn new(token: &str, api_base: Option<&str>) -> Result<Self, String> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| format!("Failed to create HTTP client: {}", e))?;
        Ok(Self {
            http,
            api_base: api_base
                .unwrap_or(DEFAULT_API_BASE)
                .trim_end_matches('/')
                .to_string(),
            token: token.to_string(),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }

    /// POSTs `body` to `method`, retrying when the API asks us to slow down.
    async fn call<B, T>(&self, method: &str, body: &B) -> Result<T, String>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = self.method_url(method);
        let mut attempt = 0;
        loop {
            attempt += 1;
            let response = self
                .http
                .post(&url)
                .json(body)
                .send()
                .await
                .map_err(|e| format!("{} request failed: {}", method, e.without_url()))?;

            let payload: ApiResponse<T> = response
                .json()
                .await
                .map_err(|e| format!("{} returned an unreadable response: {}", method, e))?;

            if payload.ok {
                return payload
                    .result
                    .ok_or_else(|| format!("{} returned ok without a result", method));
            }

            let description = payload
                .description
                .unwrap_or_else(|| "unknown error".to_string());
            let retry_after = payload.parameters.and_then(|p| p.retry_after);

            if payload.error_code == Some(429) && attempt < MAX_ATTEMPTS {
                let wait = retry_after.unwrap_or(1).min(MAX_RETRY_AFTER_SECS);
                tracing::warn!(
                    "Telegram rate limited {} (attempt {}/{}), retrying in {}s",
                    method,
                    attempt,
                    MAX_ATTEMPTS,
                    wait
                );
                tokio::time::sleep(Duration::from_secs(wait)).await;
                continue;
            }

            return Err(match payload.error_code {
                Some(code) => format!("{} failed ({}): {}", method, code, description),
                None => format!("{} failed: {}", method, description),
            });
        }
    }
}

#[async_trait]
impl ForumTransport for TelegramClient {
    async fn create_forum_topic(&self, chat_id: i64, name: &str) -> Result<ForumTopic, String> {
        tracing::info!("Creating forum topic {:?} in chat {}", name, chat_id);
        self.call("createForumTopic", &CreateForumTopicRequest { chat_id, name })
            .await
    }

    async fn edit_forum_topic(
        &self,
        chat_id: i64,
        thread_id: i64,
        name: &str,
    ) -> Result<(), String> {
        let request = EditForumTopicRequest {
            chat_id,
            message_thread_id: thread_id,
            name,
        };
        match self.call::<_, bool>("editForumTopic", &request).await {
            Ok(_) => Ok(()),
            Err(e) if is_not_modified(&e) => Ok(()),
            Err(e) => {
                tracing::warn!("Rename of topic {}:{} failed: {}", chat_id, thread_id, e);
                Err(e)
            }
        }
    }

    async fn send_message(
        &self,
        chat_id: i64,
        thread_id: Option<i64>,
        text: &str,
        disable_notification: bool,
    ) -> Result<i64, String> {
        let request = SendMessageRequest {
            chat_id,
            text,
            message_thread_id: thread_id,
            disable_notification,
        };
        self.call::<_, SentMessage>("sendMessage", &request)
            .await
            .map(|sent| sent.message_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_url_strips_trailing_slash() {
        let client = TelegramClient::new("123:abc", Some("http://localhost:8081/")).unwrap();
        assert_eq!(
            client.method_url("sendMessage"),
            "http://localhost:8081/bot123:abc/sendMessage"
        );
    }

    #[test]
    fn test_default_api_base() {
        let client = TelegramClient::new("t", None).unwrap();
        assert_eq!(client.method_url("getMe"), "https://api.telegram.org/bott/getMe");
    }

    #[test]
    fn test_not_modified_detection() {
        assert!(is_not_modified(
            "editForumTopic failed (400): Bad Request: TOPIC_NOT_MODIFIED"
        ));
        assert!(!is_not_modified(
            "editForumTopic failed (400): Bad Request: message thread not found"
        ));
    }

    #[test]
    fn test_error_response_parses() {
        let raw = r#"{"ok":false,"error_code":429,"description":"Too Many Requests","parameters":{"retry_after":3}}"#;
        let parsed: ApiResponse<SentMessage> = serde_json::from_str(raw).unwrap();
        assert!(!parsed.ok);
        assert!(parsed.result.is_none());
        assert_eq!(parsed.error_code, Some(429));
        assert_eq!(parsed.parameters.and_then(|p| p.retry_after), Some(3));
    }

    fn decode<T: DeserializeOwned>(raw: &str) -> ApiResponse<T> {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn test_ok_response_decodes_for_any_result_type() {
        let topic: ApiResponse<ForumTopic> =
            decode(r#"{"ok":true,"result":{"message_thread_id":77,"name":"z80 @feat"}}"#);
        assert_eq!(topic.result.unwrap().message_thread_id, 77);
        let renamed: ApiResponse<bool> = decode(r#"{"ok":true,"result":true}"#);
        assert_eq!(renamed.result, Some(true));
        let failed: ApiResponse<bool> = decode(r#"{"ok":false,"description":"Bad Request"}"#);
        assert!(failed.result.is_none());
    }

    #[test]
    fn test_send_message_request_omits_missing_thread() {
        let body = serde_json::to_value(SendMessageRequest {
            chat_id: 5,
            text: "hi",
            message_thread_id: None,
            disable_notification: true,
        })
        .unwrap();
        assert!(body.get("message_thread_id").is_none());
        assert_eq!(body["disable_notification"], true);
    }
}
