use async_trait::async_trait;

use crate::ai::wire::CompletionEndpoint;
use crate::config::Config;
use crate::parser::{parse_reply, ParsedReply};
use crate::prompt::PromptBuilder;
use crate::provider::{CompletionProvider, ProviderKind, ProviderResult, RawProviderReply};
use crate::state::ChatContext;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const MAX_TOKENS: u32 = 1000;

/// Plain chat-completion provider
#[derive(Clone)]
pub struct OpenAIClient {
    endpoint: CompletionEndpoint,
    prompts: PromptBuilder,
}

impl OpenAIClient {
    pub fn new(api_key: Option<String>, prompts: PromptBuilder) -> Self {
        Self {
            endpoint: CompletionEndpoint::new(
                ProviderKind::Chat,
                DEFAULT_BASE_URL,
                api_key,
                DEFAULT_MODEL,
                MAX_TOKENS,
                crate::config::DEFAULT_TIMEOUT_SECS,
            ),
            prompts,
        }
    }

    pub fn from_config(config: &Config, prompts: PromptBuilder) -> Self {
        let mut client = Self::new(config.openai_api_key.clone(), prompts);
        if let Some(url) = &config.openai_base_url {
            client.endpoint.set_base_url(url);
        }
        if let Some(model) = &config.openai_model {
            client.endpoint.set_model(model);
        }
        client.endpoint.set_timeout(config.timeout_secs());
        client
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.endpoint.set_base_url(base_url);
        self
    }

    pub fn model(&self) -> &str {
        self.endpoint.model()
    }

    pub fn max_tokens(&self) -> u32 {
        self.endpoint.max_tokens()
    }

    pub fn list_models() -> Vec<String> {
        vec![
            "gpt-4o-mini".to_string(),
            "gpt-4o".to_string(),
            "gpt-4-turbo".to_string(),
            "gpt-3.5-turbo".to_string(),
        ]
    }
}

#[async_trait]
impl CompletionProvider for OpenAIClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Chat
    }

    fn is_available(&self) -> bool {
        self.endpoint.has_credentials()
    }

    async fn generate(
        &self,
        query: &str,
        context: Option<&ChatContext>,
    ) -> ProviderResult<RawProviderReply> {
        let user = self.prompts.query_text(query, context);
        let text = self
            .endpoint
            .complete(self.prompts.instruction_text(), &user)
            .await?;
        Ok(RawProviderReply {
            provider: ProviderKind::Chat,
            text,
        })
    }

    fn parse(&self, reply: &RawProviderReply) -> ParsedReply {
        let ids = self.prompts.knowledge_base().component_ids();
        parse_reply(&reply.text, &ids)
    }
}
