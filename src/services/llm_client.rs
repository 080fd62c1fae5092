// src/services/llm_client.rs
//! Remote chat-completion client. Only built when AI is switched on and an
//! API key is configured; every failure is absorbed by the coach's fallback.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::LlmError;

const CONNECT_TIMEOUT_SECS: u64 = 30;
const REQUEST_TIMEOUT_SECS: u64 = 60;
const TEMPERATURE: f32 = 0.7;
const MAX_TOKENS: u32 = 1500;

pub const DEFAULT_BASE_URL: &str = "https://api.deepseek.com/v1";
pub const DEFAULT_MODEL: &str = "deepseek-chat";

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, LlmError>;
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI-compatible chat-completion client (DeepSeek by default).
#[derive(Debug, Clone)]
pub struct DeepSeekClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl DeepSeekClient {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, LlmError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| LlmError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.into(),
        })
    }
}

fn map_status(status: StatusCode) -> LlmError {
    match status.as_u16() {
        401 | 403 => LlmError::Unauthorized,
        429 => LlmError::RateLimited,
        code @ 500..=599 => LlmError::Server(code),
        code => LlmError::InvalidResponse(format!("unexpected status {code}")),
    }
}

fn map_transport(err: reqwest::Error) -> LlmError {
    if err.is_timeout() {
        LlmError::Timeout
    } else {
        LlmError::Network(err.to_string())
    }
}

#[async_trait]
impl LlmClient for DeepSeekClient {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, LlmError> {
        let body = CompletionRequest {
            model: &self.model,
            messages: vec![
                WireMessage {
                    role: "system",
                    content: system,
                },
                WireMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(map_transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(map_status(status));
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| LlmError::InvalidResponse("no content in choices".to_string()))
    }
}

/// Bounded exponential backoff: the delay doubles after each failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
        }
    }
}

pub async fn complete_with_retry(
    client: &dyn LlmClient,
    policy: RetryPolicy,
    system: &str,
    prompt: &str,
) -> Result<String, LlmError> {
    let mut delay = policy.initial_delay;
    let mut attempt = 1;
    loop {
        match client.complete(system, prompt).await {
            Ok(text) => return Ok(text),
            Err(err) if err.is_retryable() && attempt < policy.max_attempts => {
                warn!(attempt, error = %err, ?delay, "LLM call failed, retrying");
                tokio::time::sleep(delay).await;
                delay = delay.saturating_mul(2);
                attempt += 1;
            }
            Err(err) => {
                debug!(attempt, error = %err, "LLM call gave up");
                return Err(err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Scripted {
        replies: Mutex<Vec<Result<String, LlmError>>>,
        calls: AtomicU32,
    }

    impl Scripted {
        fn new(mut replies: Vec<Result<String, LlmError>>) -> Self {
            replies.reverse();
            Self {
                replies: Mutex::new(replies),
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl LlmClient for Scripted {
        async fn complete(&self, _system: &str, _prompt: &str) -> Result<String, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.replies.lock().unwrap().pop();
            next.unwrap_or(Err(LlmError::Timeout))
        }
    }

    fn fast() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn retries_transient_errors_then_succeeds() {
        let client = Scripted::new(vec![
            Err(LlmError::Timeout),
            Err(LlmError::Server(502)),
            Ok("plan".to_string()),
        ]);
        let out = complete_with_retry(&client, fast(), "sys", "hi").await;
        assert_eq!(out, Ok("plan".to_string()));
        assert_eq!(client.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn stops_after_max_attempts() {
        let client = Scripted::new(vec![]);
        let out = complete_with_retry(&client, fast(), "sys", "hi").await;
        assert_eq!(out, Err(LlmError::Timeout));
        assert_eq!(client.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_auth_or_rate_limit() {
        for err in [LlmError::Unauthorized, LlmError::RateLimited] {
            let client = Scripted::new(vec![Err(err.clone())]);
            let out = complete_with_retry(&client, fast(), "sys", "hi").await;
            assert_eq!(out, Err(err));
            assert_eq!(client.calls.load(Ordering::SeqCst), 1);
        }
    }

    #[test]
    fn status_mapping() {
        assert_eq!(map_status(StatusCode::UNAUTHORIZED), LlmError::Unauthorized);
        assert_eq!(map_status(StatusCode::TOO_MANY_REQUESTS), LlmError::RateLimited);
        assert_eq!(map_status(StatusCode::BAD_GATEWAY), LlmError::Server(502));
        assert!(matches!(map_status(StatusCode::NOT_FOUND), LlmError::InvalidResponse(_)));
    }
}
