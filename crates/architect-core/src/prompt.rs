use std::sync::Arc;

use crate::knowledge::KnowledgeBase;
use crate::state::ChatContext;

const PREAMBLE: &str = "You are the AI Architect for a real-time analytics platform. \
You explain how the platform is built, how data moves through it, and how to use it. \
Answer precisely and ground every answer in the architecture below.";

const FORMATTING_RULES: &str = "Formatting rules:\n\
- Put code in fenced blocks tagged with the language, e.g. ```sql.\n\
- When you mention a component, write its id in parentheses right after its name, e.g. Tinybird (tinybird).\n\
- Keep answers short; prefer bullet points over long paragraphs.";

/// Builds the system and user prompts sent to remote providers.
///
/// The instruction text depends only on the knowledge base, so it is rendered
/// once at construction and shared by every request.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    kb: Arc<KnowledgeBase>,
    instruction: Arc<str>,
}

impl PromptBuilder {
    pub fn new(kb: Arc<KnowledgeBase>) -> Self {
        let instruction = build_instruction_text(&kb).into();
        Self { kb, instruction }
    }

    pub fn knowledge_base(&self) -> &KnowledgeBase {
        &self.kb
    }

    pub fn instruction_text(&self) -> &str {
        &self.instruction
    }

    pub fn query_text(&self, query: &str, context: Option<&ChatContext>) -> String {
        build_query_text(&self.kb, query, context)
    }
}

pub fn build_instruction_text(kb: &KnowledgeBase) -> String {
    let mut prompt = String::new();

    prompt.push_str(PREAMBLE);
    prompt.push_str("\n\n");

    prompt.push_str("Components:\n");
    for component in kb.components() {
        prompt.push_str(&format!(
            "- {} ({}): {}\n",
            component.name, component.id, component.responsibility
        ));
    }
    prompt.push('\n');

    prompt.push_str("Data flows:\n");
    for flow in kb.list_flows() {
        prompt.push_str(&format!(
            "- {} → {}: {} ({})\n",
            flow.from,
            flow.to,
            flow.label,
            flow.flow_type.as_str()
        ));
    }
    prompt.push('\n');

    prompt.push_str(FORMATTING_RULES);
    prompt
}

pub fn build_query_text(kb: &KnowledgeBase, query: &str, context: Option<&ChatContext>) -> String {
    let mut prompt = query.to_string();

    let Some(ctx) = context else {
        return prompt;
    };

    let mut lines = Vec::new();
    if let Some(view) = ctx.current_view {
        lines.push(format!("- Current view: {}", view.as_str()));
    }
    if let Some(tab) = &ctx.current_tab {
        lines.push(format!("- Current tab: {}", tab));
    }
    if let Some(component) = ctx
        .selected_component
        .as_deref()
        .and_then(|id| kb.lookup_component(id))
    {
        lines.push(format!(
            "- Selected component: {} ({})",
            component.name, component.id
        ));
    }
    if let Some(role) = &ctx.user_role {
        lines.push(format!("- User role: {}", role));
    }

    if !lines.is_empty() {
        prompt.push_str("\n\nContext:\n");
        prompt.push_str(&lines.join("\n"));
    }

    prompt
}
