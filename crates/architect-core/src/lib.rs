pub mod ai;
pub mod config;
pub mod knowledge;
pub mod offline;
pub mod orchestrator;
pub mod parser;
pub mod prompt;
pub mod provider;
pub mod seed;
pub mod state;

// Re-export main types for convenience
pub use ai::{GenUiClient, OpenAIClient};
pub use config::Config;
pub use knowledge::{CodeExample, FaqEntry, FlowEdge, KnowledgeBase, KnowledgeComponent};
pub use orchestrator::{Architect, Availability};
pub use parser::ParsedReply;
pub use prompt::PromptBuilder;
pub use provider::{CompletionProvider, ProviderError, ProviderKind, ResponseSource};
pub use seed::{demo_knowledge_base, load_knowledge_base};
pub use state::{ChatContext, ChatMessage, ChatRole, CodeBlock, View};
