//! Telegram Bot API delivery.
//!
//! [`TelegramClient`] posts `sendMessage` requests with HTML parse mode.
//! Transient failures (network errors, 429, 5xx) are retried with backoff
//! of 1 s, 2 s and 4 s; other API rejections fail immediately.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

const RETRY_DELAYS_SECS: [u64; 3] = [1, 2, 4];

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

#[derive(Debug, thiserror::Error)]
pub enum TelegramError {
    #[error("Telegram delivery is not configured")]
    Disabled,

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Telegram API returned HTTP {status}: {description}")]
    Api { status: u16, description: String },
}

impl TelegramError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Disabled => false,
            Self::Request(_) => true,
            Self::Api { status, .. } => *status == 429 || *status >= 500,
        }
    }
}

/// Anything that can push a text message to a chat.
#[async_trait]
pub trait MessageSender: Send + Sync {
    fn is_enabled(&self) -> bool;

    async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), TelegramError>;
}

#[derive(Clone)]
pub struct TelegramConfig {
    /// `None` disables delivery.
    pub bot_token: Option<String>,
    pub api_base: String,
}

impl fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &self.bot_token.as_ref().map(|_| "<redacted>"))
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }
}

/// Subset of the Bot API response envelope.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    description: Option<String>,
}

pub struct TelegramClient {
    client: reqwest::Client,
    config: TelegramConfig,
}

impl TelegramClient {
    pub fn new(config: TelegramConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build reqwest HTTP client");
        Self { client, config }
    }

    fn method_url(&self, token: &str, method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            self.config.api_base.trim_end_matches('/'),
            token,
            method
        )
    }

    async fn try_send(&self, url: &str, body: &serde_json::Value) -> Result<(), TelegramError> {
        let response = self.client.post(url).json(body).send().await?;
        let status = response.status();
        let parsed: Option<ApiResponse> = response.json().await.ok();

        match parsed {
            Some(r) if status.is_success() && r.ok => Ok(()),
            other => Err(TelegramError::Api {
                status: status.as_u16(),
                description: other
                    .and_then(|r| r.description)
                    .unwrap_or_else(|| "no description".to_string()),
            }),
        }
    }
}

#[async_trait]
impl MessageSender for TelegramClient {
    fn is_enabled(&self) -> bool {
        self.config.bot_token.is_some()
    }

    async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), TelegramError> {
        let Some(token) = self.config.bot_token.as_deref() else {
            return Err(TelegramError::Disabled);
        };
        let url = self.method_url(token, "sendMessage");
        let body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "HTML",
            "disable_web_page_preview": true,
        });

        let mut attempt = 0;
        loop {
            match self.try_send(&url, &body).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_retryable() && attempt < RETRY_DELAYS_SECS.len() => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        chat_id,
                        error = %e,
                        "Telegram send failed, retrying"
                    );
                    tokio::time::sleep(Duration::from_secs(RETRY_DELAYS_SECS[attempt])).await;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::error!(chat_id, error = %e, "Telegram send failed");
                    return Err(e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(token: Option<&str>, base: &str) -> TelegramClient {
        TelegramClient::new(TelegramConfig {
            bot_token: token.map(str::to_string),
            api_base: base.to_string(),
        })
    }

    #[test]
    fn method_url_joins_base_token_and_method() {
        let c = client(Some("123:abc"), "https://api.telegram.org/");
        assert_eq!(
            c.method_url("123:abc", "sendMessage"),
            "https://api.telegram.org/bot123:abc/sendMessage"
        );
    }

    #[tokio::test]
    async fn disabled_client_refuses_to_send() {
        let c = client(None, DEFAULT_API_BASE);
        assert!(!c.is_enabled());
        let err = c.send_text(1, "hi").await.unwrap_err();
        assert!(matches!(err, TelegramError::Disabled));
    }

    #[test]
    fn only_transient_failures_retry() {
        let api = |status| TelegramError::Api {
            status,
            description: String::new(),
        };
        assert!(api(429).is_retryable());
        assert!(api(502).is_retryable());
        assert!(!api(400).is_retryable());
        assert!(!api(403).is_retryable());
        assert!(!TelegramError::Disabled.is_retryable());
    }

    #[test]
    fn debug_output_hides_token() {
        let config = TelegramConfig {
            bot_token: Some("secret-token".to_string()),
            ..Default::default()
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("secret-token"));
        assert!(rendered.contains("redacted"));
    }

    #[test]
    fn api_error_display() {
        let err = TelegramError::Api {
            status: 400,
            description: "Bad Request: chat not found".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Telegram API returned HTTP 400: Bad Request: chat not found"
        );
    }
}
