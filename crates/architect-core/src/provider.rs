use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::parser::ParsedReply;
use crate::state::ChatContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderKind {
    GenerativeUi,
    Chat,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::GenerativeUi => "genui",
            ProviderKind::Chat => "openai",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "genui" | "thesys" => Some(ProviderKind::GenerativeUi),
            "openai" | "chat" => Some(ProviderKind::Chat),
            _ => None,
        }
    }

    pub fn all() -> Vec<ProviderKind> {
        vec![ProviderKind::GenerativeUi, ProviderKind::Chat]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderKind::GenerativeUi => "Generative UI (Thesys C1)",
            ProviderKind::Chat => "ChatGPT (OpenAI)",
        }
    }
}

/// Which tier of the pipeline produced a reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResponseSource {
    Primary,
    Secondary,
    Offline,
}

impl ResponseSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseSource::Primary => "primary",
            ResponseSource::Secondary => "secondary",
            ResponseSource::Offline => "offline",
        }
    }
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{} is not configured", .0.display_name())]
    Unavailable(ProviderKind),

    #[error("{} request failed: {source}", .provider.display_name())]
    Transport {
        provider: ProviderKind,
        #[source]
        source: reqwest::Error,
    },

    #[error("{} request timed out after {secs}s", .provider.display_name())]
    Timeout { provider: ProviderKind, secs: u64 },

    #[error("{} API error {status}: {body}", .provider.display_name())]
    Api {
        provider: ProviderKind,
        status: u16,
        body: String,
    },

    #[error("{} returned an empty completion", .0.display_name())]
    EmptyCompletion(ProviderKind),

    #[error("{} returned an unreadable response: {message}", .provider.display_name())]
    Decode {
        provider: ProviderKind,
        message: String,
    },
}

impl ProviderError {
    pub fn provider(&self) -> ProviderKind {
        match self {
            ProviderError::Unavailable(p) | ProviderError::EmptyCompletion(p) => *p,
            ProviderError::Transport { provider, .. }
            | ProviderError::Timeout { provider, .. }
            | ProviderError::Api { provider, .. }
            | ProviderError::Decode { provider, .. } => *provider,
        }
    }
}

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Unparsed completion text as returned by a remote provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawProviderReply {
    pub provider: ProviderKind,
    pub text: String,
}

/// A remote completion backend the orchestrator can fall back across
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Credential check only; never touches the network
    fn is_available(&self) -> bool;

    async fn generate(
        &self,
        query: &str,
        context: Option<&ChatContext>,
    ) -> ProviderResult<RawProviderReply>;

    /// Turn the model's free text into structured message fields
    fn parse(&self, reply: &RawProviderReply) -> ParsedReply;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_round_trips_through_str() {
        for kind in ProviderKind::all() {
            assert_eq!(ProviderKind::from_str(kind.as_str()), Some(kind));
        }
        assert_eq!(ProviderKind::from_str("Thesys"), Some(ProviderKind::GenerativeUi));
        assert_eq!(ProviderKind::from_str("ollama"), None);
    }

    #[test]
    fn test_error_keeps_provider_identity() {
        let err = ProviderError::Api {
            provider: ProviderKind::Chat,
            status: 503,
            body: "overloaded".to_string(),
        };
        assert_eq!(err.provider(), ProviderKind::Chat);
        assert_eq!(err.to_string(), "ChatGPT (OpenAI) API error 503: overloaded");

        let err = ProviderError::EmptyCompletion(ProviderKind::GenerativeUi);
        assert_eq!(err.provider(), ProviderKind::GenerativeUi);
    }

    #[test]
    fn test_response_source_serializes_kebab_case() {
        let json = serde_json::to_string(&ResponseSource::Secondary).unwrap();
        assert_eq!(json, "\"secondary\"");
    }
}
