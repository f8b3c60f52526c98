//! Advisory collaborator client.
//!
//! The advisory service is an opaque text-to-text function: it receives the
//! game digest (plus an optional user message) and returns display text. Its
//! failures never touch board state.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdvisoryError {
    #[error("advisory request failed: {0}")]
    Http(String),

    #[error("advisory reply malformed: {0}")]
    BadReply(String),
}

/// Text-in, text-out advisory capability. No state is shared with the
/// collaborator beyond what the digest contains.
#[async_trait]
pub trait AdvisoryProvider: Send + Sync {
    async fn advise(
        &self,
        digest: &str,
        user_message: Option<&str>,
    ) -> Result<String, AdvisoryError>;
}

/// HTTP adapter for a hosted advisory service.
pub struct HttpAdvisor {
    client: Client,
    url: String,
}

impl HttpAdvisor {
    pub fn new(url: &str) -> Self {
        let client = Client::builder()
            .user_agent("ChessTutor/1.0")
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .unwrap();
        Self {
            client,
            url: url.to_string(),
        }
    }
}

#[async_trait]
impl AdvisoryProvider for HttpAdvisor {
    async fn advise(
        &self,
        digest: &str,
        user_message: Option<&str>,
    ) -> Result<String, AdvisoryError> {
        let body = json!({
            "digest": digest,
            "message": user_message,
        });

        let resp = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AdvisoryError::Http(format!("request error: {e}")))?;

        if !resp.status().is_success() {
            return Err(AdvisoryError::Http(format!("HTTP {}", resp.status())));
        }

        let reply: Value = resp
            .json()
            .await
            .map_err(|e| AdvisoryError::BadReply(format!("body read error: {e}")))?;

        reply
            .get("reply")
            .and_then(|r| r.as_str())
            .map(String::from)
            .ok_or_else(|| AdvisoryError::BadReply("missing 'reply' field".to_string()))
    }
}
