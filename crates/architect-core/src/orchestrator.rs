//! Response orchestrator: picks a tier, falls back, normalizes the reply.
//!
//! Remote tiers are tried strictly one after the other. The generative-UI
//! provider is only consulted for visually-oriented questions; the chat
//! provider comes next; the offline engine always answers last. A provider
//! failure is logged and turned into a transition, so [`Architect::generate`]
//! cannot fail.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use crate::ai::{GenUiClient, OpenAIClient};
use crate::config::{Config, DEFAULT_TIMEOUT_SECS};
use crate::knowledge::KnowledgeBase;
use crate::offline;
use crate::parser::ParsedReply;
use crate::prompt::PromptBuilder;
use crate::provider::{CompletionProvider, ProviderError, ProviderResult, ResponseSource};
use crate::state::{ChatContext, ChatMessage};

/// Phrases that suggest the answer is best shown as a widget
pub const VISUAL_TRIGGERS: &[&str] = &[
    "show me",
    "visualize",
    "diagram",
    "chart",
    "graph",
    "compare",
    "difference",
    "table",
    "flow",
    "architecture",
    "build a query",
    "query builder",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Availability {
    pub primary: bool,
    pub secondary: bool,
}

enum Stage {
    Start,
    TryPrimary,
    TrySecondary,
    Offline,
    Done(ChatMessage),
}

pub fn wants_visual(query: &str) -> bool {
    let query = query.to_lowercase();
    VISUAL_TRIGGERS.iter().any(|t| query.contains(t))
}

pub struct Architect {
    kb: Arc<KnowledgeBase>,
    primary: Arc<dyn CompletionProvider>,
    secondary: Arc<dyn CompletionProvider>,
    attempt_timeout: Duration,
}

impl Architect {
    pub fn new(
        kb: Arc<KnowledgeBase>,
        primary: Arc<dyn CompletionProvider>,
        secondary: Arc<dyn CompletionProvider>,
    ) -> Self {
        Self {
            kb,
            primary,
            secondary,
            attempt_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Wire the two remote adapters from configuration.
    pub fn from_config(config: &Config, kb: Arc<KnowledgeBase>) -> Self {
        let prompts = PromptBuilder::new(kb.clone());
        let primary = GenUiClient::from_config(config, prompts.clone());
        let secondary = OpenAIClient::from_config(config, prompts);
        Self::new(kb, Arc::new(primary), Arc::new(secondary))
            .with_timeout(Duration::from_secs(config.timeout_secs()))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    pub fn knowledge_base(&self) -> &KnowledgeBase {
        &self.kb
    }

    pub fn check_availability(&self) -> Availability {
        Availability {
            primary: self.primary.is_available(),
            secondary: self.secondary.is_available(),
        }
    }

    pub async fn generate(&self, query: &str, context: Option<&ChatContext>) -> ChatMessage {
        self.generate_with(query, context, None).await
    }

    /// `prefer_primary` overrides the visual-intent guess when set.
    pub async fn generate_with(
        &self,
        query: &str,
        context: Option<&ChatContext>,
        prefer_primary: Option<bool>,
    ) -> ChatMessage {
        let mut stage = Stage::Start;

        loop {
            stage = match stage {
                Stage::Start => {
                    let prefer = prefer_primary.unwrap_or_else(|| wants_visual(query));
                    if prefer && self.primary.is_available() {
                        Stage::TryPrimary
                    } else {
                        Stage::TrySecondary
                    }
                }
                Stage::TryPrimary => {
                    match self.attempt(self.primary.as_ref(), query, context).await {
                        Ok(parsed) => Stage::Done(finish(parsed, ResponseSource::Primary)),
                        Err(e) => {
                            warn!("Primary provider failed, falling back: {}", e);
                            Stage::TrySecondary
                        }
                    }
                }
                Stage::TrySecondary => {
                    if !self.secondary.is_available() {
                        Stage::Offline
                    } else {
                        match self.attempt(self.secondary.as_ref(), query, context).await {
                            Ok(parsed) => Stage::Done(finish(parsed, ResponseSource::Secondary)),
                            Err(e) => {
                                warn!("Secondary provider failed, answering offline: {}", e);
                                Stage::Offline
                            }
                        }
                    }
                }
                Stage::Offline => {
                    let reply = offline::classify_and_respond(&self.kb, query, context);
                    let parsed = ParsedReply {
                        content: reply.content,
                        code_blocks: reply.code_blocks,
                        highlights: reply.highlights,
                        ui_payload: None,
                    };
                    Stage::Done(finish(parsed, ResponseSource::Offline))
                }
                Stage::Done(message) => return message,
            };
        }
    }

    async fn attempt(
        &self,
        provider: &dyn CompletionProvider,
        query: &str,
        context: Option<&ChatContext>,
    ) -> ProviderResult<ParsedReply> {
        let kind = provider.kind();
        info!("Asking {}", kind.display_name());

        let raw = tokio::time::timeout(self.attempt_timeout, provider.generate(query, context))
            .await
            .map_err(|_| ProviderError::Timeout {
                provider: kind,
                secs: self.attempt_timeout.as_secs(),
            })??;

        Ok(provider.parse(&raw))
    }
}

/// Build the outgoing message, making sure it always has visible content.
fn finish(parsed: ParsedReply, source: ResponseSource) -> ChatMessage {
    let content = if !parsed.content.trim().is_empty() {
        parsed.content
    } else if parsed.ui_payload.is_some() {
        "Here's a visual overview:".to_string()
    } else if !parsed.code_blocks.is_empty() {
        "Here's the code:".to_string()
    } else {
        "I couldn't find anything to say about that. Try asking about a component or a data flow."
            .to_string()
    };

    let mut seen = HashSet::new();
    let highlights = parsed
        .highlights
        .into_iter()
        .filter(|id| seen.insert(id.clone()))
        .collect();

    let mut message = ChatMessage::assistant(content, source);
    message.code_blocks = parsed.code_blocks;
    message.highlights = highlights;
    message.ui_payload = parsed.ui_payload;
    message
}
