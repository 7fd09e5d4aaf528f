//! Read-only knowledge base describing the demo platform architecture.
//!
//! The table is built once by a seed-data collaborator (see [`crate::seed`])
//! and shared behind an `Arc` for the rest of the process.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowType {
    Ingestion,
    Query,
    Auth,
    Control,
}

impl FlowType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlowType::Ingestion => "ingestion",
            FlowType::Query => "query",
            FlowType::Auth => "auth",
            FlowType::Control => "control",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExampleCategory {
    Query,
    Config,
    Example,
    Troubleshooting,
}

/// Sample payload attached to a component
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentExample {
    pub title: String,
    pub content: String,
    pub language: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeComponent {
    pub id: String,
    pub name: String,
    pub responsibility: String,
    pub category: String,
    pub description: String,
    #[serde(default)]
    pub inbound: Vec<String>,
    #[serde(default)]
    pub outbound: Vec<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub example: Option<ComponentExample>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowEdge {
    pub from: String,
    pub to: String,
    pub label: String,
    pub flow_type: FlowType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaqEntry {
    pub question: String,
    pub answer: String,
    /// Lowercase phrases; a query matches when it contains any of them
    pub keywords: Vec<String>,
    #[serde(default)]
    pub related_components: Vec<String>,
}

impl FaqEntry {
    /// `query` must already be lowercased.
    pub fn matches(&self, query: &str) -> bool {
        self.keywords
            .iter()
            .any(|k| query.contains(k.to_lowercase().as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeExample {
    pub id: String,
    pub title: String,
    pub description: String,
    pub language: String,
    pub code: String,
    #[serde(default)]
    pub related_component: Option<String>,
    pub category: ExampleCategory,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeBase {
    components: Vec<KnowledgeComponent>,
    flows: Vec<FlowEdge>,
    faqs: Vec<FaqEntry>,
    code_examples: Vec<CodeExample>,
}

impl KnowledgeBase {
    pub fn new(
        components: Vec<KnowledgeComponent>,
        flows: Vec<FlowEdge>,
        faqs: Vec<FaqEntry>,
        code_examples: Vec<CodeExample>,
    ) -> Self {
        Self {
            components,
            flows,
            faqs,
            code_examples,
        }
    }

    pub fn lookup_component(&self, id: &str) -> Option<&KnowledgeComponent> {
        self.components.iter().find(|c| c.id.eq_ignore_ascii_case(id))
    }

    pub fn components(&self) -> &[KnowledgeComponent] {
        &self.components
    }

    pub fn component_ids(&self) -> Vec<&str> {
        self.components.iter().map(|c| c.id.as_str()).collect()
    }

    pub fn list_faqs(&self) -> &[FaqEntry] {
        &self.faqs
    }

    pub fn list_flows(&self) -> &[FlowEdge] {
        &self.flows
    }

    pub fn list_code_examples(&self) -> &[CodeExample] {
        &self.code_examples
    }

    pub fn first_example_in(&self, category: ExampleCategory) -> Option<&CodeExample> {
        self.code_examples.iter().find(|e| e.category == category)
    }

    /// Components grouped by category, in first-seen category order
    pub fn components_by_category(&self) -> Vec<(&str, Vec<&KnowledgeComponent>)> {
        let mut groups: Vec<(&str, Vec<&KnowledgeComponent>)> = Vec::new();
        for component in &self.components {
            match groups
                .iter()
                .position(|(category, _)| *category == component.category)
            {
                Some(i) => groups[i].1.push(component),
                None => groups.push((component.category.as_str(), vec![component])),
            }
        }
        groups
    }
}
