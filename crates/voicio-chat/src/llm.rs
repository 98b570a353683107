//! Language-model proxy client.
//!
//! The proxy accepts `{"messages": [{role, content}, ...]}` and answers
//! `{"response": text}` on success or `{"error": text}` with a non-2xx status.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use voicio_core::config::ProxyConfig;

use crate::error::ChatError;
use crate::history::ProxyMessage;

/// Anything that can turn a message list into reply text.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, messages: &[ProxyMessage]) -> Result<String, ChatError>;
}

#[derive(Debug, Serialize)]
struct ProxyRequest<'a> {
    messages: &'a [ProxyMessage],
}

#[derive(Debug, Deserialize)]
struct ProxyReply {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// HTTP client for the generative-language proxy route.
#[derive(Clone)]
pub struct ProxyClient {
    client: Client,
    url: String,
}

impl ProxyClient {
    pub fn new(config: &ProxyConfig) -> Result<Self, ChatError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ChatError::Transport(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            url: config.url(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl LanguageModel for ProxyClient {
    async fn generate(&self, messages: &[ProxyMessage]) -> Result<String, ChatError> {
        tracing::debug!(url = %self.url, messages = messages.len(), "Sending proxy request");

        let response = self
            .client
            .post(&self.url)
            .json(&ProxyRequest { messages })
            .send()
            .await
            .map_err(|e| ChatError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<ProxyReply>().await {
                Ok(ProxyReply { error: Some(error), .. }) => error,
                _ => status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string(),
            };
            return Err(ChatError::ProxyStatus {
                status: status.as_u16(),
                message,
            });
        }

        let reply: ProxyReply = response
            .json()
            .await
            .map_err(|e| ChatError::Transport(format!("Failed to parse proxy reply: {}", e)))?;

        match reply.response {
            Some(text) if !text.trim().is_empty() => Ok(text),
            _ => Err(ChatError::EmptyReply),
        }
    }
}
