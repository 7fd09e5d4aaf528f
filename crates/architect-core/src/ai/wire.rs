//! OpenAI-compatible chat-completions transport shared by both adapters.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::provider::{ProviderError, ProviderKind, ProviderResult};

pub const TEMPERATURE: f32 = 0.7;

#[derive(Debug, Serialize)]
pub(crate) struct ChatRequestMessage<'a> {
    pub role: &'static str,
    pub content: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatRequestMessage<'a>>,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

/// One configured chat-completions endpoint
#[derive(Clone)]
pub(crate) struct CompletionEndpoint {
    client: Client,
    provider: ProviderKind,
    base_url: String,
    api_key: Option<String>,
    model: String,
    max_tokens: u32,
    timeout_secs: u64,
}

impl CompletionEndpoint {
    pub fn new(
        provider: ProviderKind,
        base_url: &str,
        api_key: Option<String>,
        model: &str,
        max_tokens: u32,
        timeout_secs: u64,
    ) -> Self {
        Self {
            client: build_client(timeout_secs),
            provider,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model: model.to_string(),
            max_tokens,
            timeout_secs,
        }
    }

    pub fn has_credentials(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    pub fn set_base_url(&mut self, base_url: &str) {
        self.base_url = base_url.trim_end_matches('/').to_string();
    }

    pub fn set_model(&mut self, model: &str) {
        self.model = model.to_string();
    }

    pub fn set_timeout(&mut self, timeout_secs: u64) {
        self.timeout_secs = timeout_secs;
        self.client = build_client(timeout_secs);
    }

    /// Send a system + user exchange and return the first choice's text.
    pub async fn complete(&self, system: &str, user: &str) -> ProviderResult<String> {
        let provider = self.provider;
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ProviderError::Unavailable(provider))?;

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatRequestMessage {
                    role: "system",
                    content: system,
                },
                ChatRequestMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: self.max_tokens,
        };

        info!(
            "Sending {} request: model={}, max_tokens={}",
            provider.as_str(),
            request.model,
            request.max_tokens
        );

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!("{} API error {}: {}", provider.as_str(), status, body);
            return Err(ProviderError::Api {
                provider,
                status: status.as_u16(),
                body,
            });
        }

        let completion: ChatResponse =
            response.json().await.map_err(|e| ProviderError::Decode {
                provider,
                message: e.to_string(),
            })?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or(ProviderError::EmptyCompletion(provider))
    }

    fn transport_error(&self, e: reqwest::Error) -> ProviderError {
        if e.is_timeout() {
            ProviderError::Timeout {
                provider: self.provider,
                secs: self.timeout_secs,
            }
        } else {
            ProviderError::Transport {
                provider: self.provider,
                source: e,
            }
        }
    }
}

fn build_client(timeout_secs: u64) -> Client {
    match Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            warn!(
                "Failed to build HTTP client with {}s timeout, using defaults: {}",
                timeout_secs, e
            );
            Client::default()
        }
    }
}
