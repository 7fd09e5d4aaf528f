//! UI-agnostic request and response types
//!
//! This module contains the value objects exchanged between the assistant
//! pipeline and whatever UI sits in front of it (terminal, MCP client, web).
//! None of them depend on a rendering framework.

use serde::{Deserialize, Serialize};

use crate::provider::ResponseSource;

/// The screen the user is looking at when asking a question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    Architecture,
    Onboarding,
    Dashboard,
}

impl View {
    pub fn as_str(&self) -> &'static str {
        match self {
            View::Architecture => "architecture",
            View::Onboarding => "onboarding",
            View::Dashboard => "dashboard",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "architecture" => Some(View::Architecture),
            "onboarding" => Some(View::Onboarding),
            "dashboard" => Some(View::Dashboard),
            _ => None,
        }
    }
}

/// UI context accompanying a single query
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_view: Option<View>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_tab: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_component: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_role: Option<String>,
}

impl ChatContext {
    pub fn in_view(view: View) -> Self {
        Self {
            current_view: Some(view),
            ..Self::default()
        }
    }

    pub fn is_architecture_view(&self) -> bool {
        self.current_view == Some(View::Architecture)
    }
}

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    Assistant,
}

/// A fenced code block lifted out of a reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeBlock {
    pub language: String,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl CodeBlock {
    pub fn new(language: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            code: code.into(),
            title: None,
        }
    }

    pub fn titled(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// A chat message in the assistant conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub code_blocks: Vec<CodeBlock>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub highlights: Vec<String>,
    /// Opaque widget description, passed through untouched to the renderer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui_payload: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<ResponseSource>,
}

impl ChatMessage {
    pub fn assistant(content: impl Into<String>, source: ResponseSource) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
            code_blocks: Vec::new(),
            highlights: Vec::new(),
            ui_payload: None,
            source: Some(source),
        }
    }

    /// True when the reply came from the offline engine rather than a model
    pub fn is_demo_mode(&self) -> bool {
        self.source == Some(ResponseSource::Offline)
    }
}
