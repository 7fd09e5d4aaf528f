use async_trait::async_trait;

use crate::ai::wire::CompletionEndpoint;
use crate::config::Config;
use crate::parser::{parse_ui_reply, ParsedReply};
use crate::prompt::PromptBuilder;
use crate::provider::{CompletionProvider, ProviderKind, ProviderResult, RawProviderReply};
use crate::state::ChatContext;

pub const DEFAULT_BASE_URL: &str = "https://api.thesys.dev/v1/embed";
pub const DEFAULT_MODEL: &str = "c1/anthropic/claude-sonnet-4/v-20250815";

/// Room for prose plus an inline widget description
pub const MAX_TOKENS: u32 = 4000;

const RICH_UI_CLAUSE: &str = "\n\nWhen a visual answers the question better than prose, \
include exactly one ```json block describing a UI component with a \"component\" field. \
Allowed components: ArchitectureDiagram (diagram/architecture), FlowChart (chart/flow), \
ComparisonTable (table/comparison), Card (generic). Keep the explanation outside the block.";

/// Generative-UI provider: answers may embed a widget for the UI to render.
#[derive(Clone)]
pub struct GenUiClient {
    endpoint: CompletionEndpoint,
    prompts: PromptBuilder,
    system: String,
}

impl GenUiClient {
    pub fn new(api_key: Option<String>, prompts: PromptBuilder) -> Self {
        let system = format!("{}{}", prompts.instruction_text(), RICH_UI_CLAUSE);
        Self {
            endpoint: CompletionEndpoint::new(
                ProviderKind::GenerativeUi,
                DEFAULT_BASE_URL,
                api_key,
                DEFAULT_MODEL,
                MAX_TOKENS,
                crate::config::DEFAULT_TIMEOUT_SECS,
            ),
            prompts,
            system,
        }
    }

    pub fn from_config(config: &Config, prompts: PromptBuilder) -> Self {
        let mut client = Self::new(config.genui_api_key.clone(), prompts);
        if let Some(url) = &config.genui_base_url {
            client.endpoint.set_base_url(url);
        }
        if let Some(model) = &config.genui_model {
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

    pub fn system_prompt(&self) -> &str {
        &self.system
    }

    pub fn list_models() -> Vec<String> {
        vec![
            "c1/anthropic/claude-sonnet-4/v-20250815".to_string(),
            "c1/openai/gpt-5/v-20250915".to_string(),
        ]
    }
}

#[async_trait]
impl CompletionProvider for GenUiClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::GenerativeUi
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
        let text = self.endpoint.complete(&self.system, &user).await?;
        Ok(RawProviderReply {
            provider: ProviderKind::GenerativeUi,
            text,
        })
    }

    fn parse(&self, reply: &RawProviderReply) -> ParsedReply {
        let ids = self.prompts.knowledge_base().component_ids();
        parse_ui_reply(&reply.text, &ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderError;
    use crate::seed::demo_knowledge_base;
    use std::sync::Arc;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn prompts() -> PromptBuilder {
        PromptBuilder::new(Arc::new(demo_knowledge_base()))
    }

    #[test]
    fn test_availability_follows_credentials() {
        assert!(!GenUiClient::new(None, prompts()).is_available());
        assert!(!GenUiClient::new(Some(String::new()), prompts()).is_available());
        assert!(GenUiClient::new(Some("tk".to_string()), prompts()).is_available());
    }

    #[test]
    fn test_system_prompt_appends_rich_ui_clause() {
        let client = GenUiClient::new(None, prompts());
        assert!(client.system_prompt().starts_with(prompts().instruction_text()));
        assert!(client.system_prompt().contains("ComparisonTable (table/comparison)"));
        assert_eq!(client.max_tokens(), MAX_TOKENS);
    }

    #[tokio::test]
    async fn test_generate_refuses_when_unavailable() {
        let err = GenUiClient::new(None, prompts())
            .generate("show me the architecture", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Unavailable(ProviderKind::GenerativeUi)));
    }

    #[tokio::test]
    async fn test_generate_and_parse_widget_reply() {
        let server = MockServer::start().await;
        let reply = "Here is the pipeline.\n```json\n{\"component\": \"FlowChart\", \"steps\": 4}\n```\nIt starts at the ERP System (erp).";
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(serde_json::json!({"max_tokens": MAX_TOKENS})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"content": reply}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client =
            GenUiClient::new(Some("tk".to_string()), prompts()).with_base_url(&server.uri());
        let raw = client.generate("visualize ingestion", None).await.unwrap();
        let parsed = client.parse(&raw);

        assert_eq!(parsed.ui_payload.unwrap()["component"], "FlowChart");
        assert_eq!(parsed.highlights, vec!["erp"]);
        assert_eq!(
            parsed.content,
            "Here is the pipeline.\n\nIt starts at the ERP System (erp)."
        );
    }
}
