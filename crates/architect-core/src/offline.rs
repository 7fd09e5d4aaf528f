//! Offline answer engine.
//!
//! Answers questions about the architecture from the knowledge base alone,
//! with no network access. Intent is picked by keyword containment, checked
//! in a fixed priority order:
//!
//! 1. orientation (architecture view with an empty or help-style query)
//! 2. a direct FAQ hit, in knowledge base order
//! 3. the [`CLASSIFIERS`] table, top to bottom
//! 4. the default menu
//!
//! Independently of the branch taken, a query asking for an example or code
//! gets the first code example related to a component it names.

use tracing::debug;

use crate::knowledge::{ExampleCategory, KnowledgeBase};
use crate::state::{ChatContext, CodeBlock};

const HELP_KEYWORDS: &[&str] = &["help", "what can you do", "get started", "where do i start"];

/// Queries shorter than this (after trimming) count as empty
const NEAR_EMPTY_CHARS: usize = 3;

pub const INGESTION_IDS: &[&str] = &["erp", "worker", "s3", "tinybird"];
pub const QUERY_PATH_IDS: &[&str] = &["dashboard", "gateway", "auth", "falkordb", "tinybird"];
pub const SERVING_IDS: &[&str] = &["gateway", "falkordb", "tinybird"];
pub const GATEWAY_COMPUTE_IDS: &[&str] = &["gateway", "tinybird"];

const ORIENTATION: &str = "You're looking at the platform architecture. Data enters from the \
ERP System, is landed in the S3 Data Lake by the Ingestion Worker, and is served by Tinybird \
through the API Gateway.\n\nClick any component to select it, or ask me things like:\n\
- How does data flow from ERP to Tinybird?\n\
- What is FalkorDB?\n\
- How do I query a metric?";

const INGESTION_NARRATIVE: &str = "**Ingestion pipeline: ERP → Tinybird**\n\n\
1. The ERP System (erp) records orders, invoices and inventory changes.\n\
2. Every five minutes the Ingestion Worker (worker) pulls the changes, maps them to the \
canonical schema and deduplicates them.\n\
3. The worker writes partitioned Parquet batches to the S3 Data Lake (s3), which keeps the \
full replayable history.\n\
4. Tinybird (tinybird) appends new files through its S3 connector, making them queryable \
within seconds.";

const QUERY_NARRATIVE: &str = "**Query pipeline: user → metric**\n\n\
1. A user opens a chart in the Analytics Dashboard (dashboard).\n\
2. The dashboard requests the metric from the API Gateway (gateway).\n\
3. The gateway validates the token with the Auth Service (auth) and picks up tenant and role.\n\
4. FalkorDB (falkordb) resolves the metric name to its pipe and filters.\n\
5. Tinybird (tinybird) executes the pipe and the rows travel back to the chart.";

const FLOW_MENU: &str = "The platform has three main data flows:\n\n\
- **Ingestion**: ERP → Ingestion Worker → S3 → Tinybird\n\
- **Query**: Dashboard → API Gateway → FalkorDB / Tinybird\n\
- **Auth**: API Gateway ↔ Auth Service\n\n\
Ask about one of them, e.g. \"How does data flow from ERP to Tinybird?\"";

const QUERY_WALKTHROUGH: &str = "**Querying a metric**\n\n\
1. Get a token from the Auth Service.\n\
2. Call the API Gateway at `/v1/metrics/<name>` with the token as a bearer header.\n\
3. The gateway looks up the metric definition in FalkorDB.\n\
4. It runs the matching Tinybird pipe with your tenant filter applied.\n\
5. Rows come back as JSON, ready to chart.\n\n\
This is the pipe behind the revenue metric:";

const HOW_TO_MENU: &str = "I can walk you through:\n\n\
- How to query a metric\n\
- How data gets from the ERP into dashboards\n\
- How access control is applied\n\n\
Try \"How do I query a metric?\"";

const STORAGE_VS_COMPUTE: &str = "**S3 Data Lake vs Tinybird**\n\n\
| | S3 Data Lake (s3) | Tinybird (tinybird) |\n\
|---|---|---|\n\
| Role | Storage | Compute |\n\
| Holds | Full raw history | Query-ready recent data |\n\
| Latency | Seconds to minutes | Milliseconds |\n\
| Cost | Very cheap per GB | Priced for query throughput |\n\n\
S3 is the durable source of truth you can replay from; Tinybird is the fast engine that \
serves dashboards from it.";

const COMPARISON_MENU: &str = "I can compare:\n\n\
- S3 Data Lake vs Tinybird (storage vs compute)\n\
- FalkorDB vs Tinybird (definitions vs execution)\n\n\
Try \"What's the difference between S3 and Tinybird?\"";

const QUERY_EXAMPLE_LEAD: &str =
    "Here's a query served through the API Gateway and executed by Tinybird:";

const DEFAULT_MENU: &str = "I'm running in offline mode, but I can still help with:\n\n\
- **Data flow**: \"How does data flow from ERP to Tinybird?\"\n\
- **Components**: \"What is FalkorDB?\"\n\
- **How-to**: \"How do I query a metric?\"\n\
- **Comparisons**: \"Difference between S3 and Tinybird?\"\n\
- **Queries**: \"Show me a SQL example\"";

/// The branch that answered a query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Orientation,
    Faq(usize),
    DataFlow,
    ComponentDefinition,
    HowTo,
    Comparison,
    QueryExample,
    Default,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OfflineReply {
    pub content: String,
    pub code_blocks: Vec<CodeBlock>,
    pub highlights: Vec<String>,
}

impl OfflineReply {
    fn text(content: &str) -> Self {
        Self {
            content: content.to_string(),
            ..Self::default()
        }
    }

    fn highlighting(content: &str, ids: &[&str]) -> Self {
        Self {
            content: content.to_string(),
            code_blocks: Vec::new(),
            highlights: ids.iter().map(|id| id.to_string()).collect(),
        }
    }
}

pub type Generator = fn(&KnowledgeBase, &str) -> OfflineReply;

/// One keyword rule: any trigger contained in the query selects `generate`
pub struct Classifier {
    pub intent: Intent,
    pub triggers: &'static [&'static str],
    pub generate: Generator,
}

impl Classifier {
    pub fn matches(&self, query: &str) -> bool {
        contains_any(query, self.triggers)
    }
}

/// Evaluated top to bottom; the first match wins.
pub const CLASSIFIERS: &[Classifier] = &[
    Classifier {
        intent: Intent::DataFlow,
        triggers: &["data flow", "how does data"],
        generate: data_flow,
    },
    Classifier {
        intent: Intent::ComponentDefinition,
        triggers: &["what is", "what does"],
        generate: component_definition,
    },
    Classifier {
        intent: Intent::HowTo,
        triggers: &["how do i", "how to"],
        generate: how_to,
    },
    Classifier {
        intent: Intent::Comparison,
        triggers: &["difference", "compare"],
        generate: comparison,
    },
    Classifier {
        intent: Intent::QueryExample,
        triggers: &["query", "sql"],
        generate: query_example,
    },
];

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// Decide which branch answers `query`.
pub fn classify(kb: &KnowledgeBase, query: &str, context: Option<&ChatContext>) -> Intent {
    let query = query.to_lowercase();

    let near_empty = query.trim().chars().count() < NEAR_EMPTY_CHARS;
    if context.is_some_and(|c| c.is_architecture_view())
        && (near_empty || contains_any(&query, HELP_KEYWORDS))
    {
        return Intent::Orientation;
    }

    if let Some(index) = kb.list_faqs().iter().position(|faq| faq.matches(&query)) {
        return Intent::Faq(index);
    }

    CLASSIFIERS
        .iter()
        .find(|c| c.matches(&query))
        .map(|c| c.intent)
        .unwrap_or(Intent::Default)
}

/// Answer `query` from the knowledge base alone.
pub fn classify_and_respond(
    kb: &KnowledgeBase,
    query: &str,
    context: Option<&ChatContext>,
) -> OfflineReply {
    let lowered = query.to_lowercase();
    let intent = classify(kb, query, context);
    debug!("Offline engine classified query as {:?}", intent);

    let mut reply = match intent {
        Intent::Orientation => OfflineReply::text(ORIENTATION),
        Intent::Faq(index) => faq_answer(kb, index),
        Intent::Default => OfflineReply::text(DEFAULT_MENU),
        other => CLASSIFIERS
            .iter()
            .find(|c| c.intent == other)
            .map(|c| (c.generate)(kb, &lowered))
            .unwrap_or_else(|| OfflineReply::text(DEFAULT_MENU)),
    };

    attach_related_example(kb, &lowered, &mut reply);
    reply
}

fn faq_answer(kb: &KnowledgeBase, index: usize) -> OfflineReply {
    match kb.list_faqs().get(index) {
        Some(faq) => OfflineReply {
            content: faq.answer.clone(),
            code_blocks: Vec::new(),
            highlights: faq.related_components.clone(),
        },
        None => OfflineReply::text(DEFAULT_MENU),
    }
}

fn data_flow(_kb: &KnowledgeBase, query: &str) -> OfflineReply {
    if query.contains("erp") && query.contains("tinybird") {
        OfflineReply::highlighting(INGESTION_NARRATIVE, INGESTION_IDS)
    } else if contains_any(query, &["user", "query", "metric"]) {
        OfflineReply::highlighting(QUERY_NARRATIVE, QUERY_PATH_IDS)
    } else {
        OfflineReply::text(FLOW_MENU)
    }
}

fn component_definition(kb: &KnowledgeBase, query: &str) -> OfflineReply {
    let found = kb.components().iter().find(|c| {
        query.contains(c.id.to_lowercase().as_str())
            || query.contains(c.name.to_lowercase().as_str())
    });

    let Some(component) = found else {
        return OfflineReply::text(&component_menu(kb));
    };

    let mut content = format!(
        "**{}** ({})\n\n{}\n\n{}",
        component.name, component.category, component.responsibility, component.description
    );
    if !component.inbound.is_empty() {
        content.push_str("\n\n**Inbound:**");
        for item in &component.inbound {
            content.push_str(&format!("\n- {}", item));
        }
    }
    if !component.outbound.is_empty() {
        content.push_str("\n\n**Outbound:**");
        for item in &component.outbound {
            content.push_str(&format!("\n- {}", item));
        }
    }

    let code_blocks = component
        .example
        .iter()
        .map(|ex| CodeBlock::new(ex.language.clone(), ex.content.clone()).titled(ex.title.clone()))
        .collect();

    OfflineReply {
        content,
        code_blocks,
        highlights: vec![component.id.clone()],
    }
}

fn component_menu(kb: &KnowledgeBase) -> String {
    let mut content = String::from("These are the components of the platform:");
    for (category, members) in kb.components_by_category() {
        content.push_str(&format!("\n\n**{}**", category));
        for component in members {
            content.push_str(&format!("\n- {}: {}", component.name, component.responsibility));
        }
    }
    content.push_str("\n\nAsk \"What is <component>?\" for details.");
    content
}

fn query_example_block(kb: &KnowledgeBase) -> Option<CodeBlock> {
    kb.first_example_in(ExampleCategory::Query).map(|ex| {
        CodeBlock::new(ex.language.clone(), ex.code.clone()).titled(ex.title.clone())
    })
}

fn how_to(kb: &KnowledgeBase, query: &str) -> OfflineReply {
    if !contains_any(query, &["query", "metric"]) {
        return OfflineReply::text(HOW_TO_MENU);
    }

    let mut reply = OfflineReply::highlighting(QUERY_WALKTHROUGH, SERVING_IDS);
    reply.code_blocks.extend(query_example_block(kb));
    reply
}

fn comparison(_kb: &KnowledgeBase, query: &str) -> OfflineReply {
    if query.contains("s3") && query.contains("tinybird") {
        OfflineReply::highlighting(STORAGE_VS_COMPUTE, &["s3", "tinybird"])
    } else {
        OfflineReply::text(COMPARISON_MENU)
    }
}

fn query_example(kb: &KnowledgeBase, _query: &str) -> OfflineReply {
    let mut reply = OfflineReply::highlighting(QUERY_EXAMPLE_LEAD, GATEWAY_COMPUTE_IDS);
    reply.code_blocks.extend(query_example_block(kb));
    reply
}

fn attach_related_example(kb: &KnowledgeBase, query: &str, reply: &mut OfflineReply) {
    if !reply.code_blocks.is_empty() || !contains_any(query, &["example", "code"]) {
        return;
    }

    let related = kb.list_code_examples().iter().find(|ex| {
        ex.related_component
            .as_deref()
            .is_some_and(|id| query.contains(id.to_lowercase().as_str()))
    });

    if let Some(example) = related {
        reply.content.push_str(&format!("\n\nExample: {}", example.title));
        reply.code_blocks.push(
            CodeBlock::new(example.language.clone(), example.code.clone())
                .titled(example.title.clone()),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::demo_knowledge_base;
    use crate::state::View;

    fn ask(query: &str) -> OfflineReply {
        classify_and_respond(&demo_knowledge_base(), query, None)
    }

    #[test]
    fn test_ingestion_scenario() {
        let reply = ask("How does data flow from ERP to Tinybird?");
        assert_eq!(reply.content, INGESTION_NARRATIVE);
        assert_eq!(reply.highlights, vec!["erp", "worker", "s3", "tinybird"]);
        assert!(reply.code_blocks.is_empty());
    }

    #[test]
    fn test_query_pipeline_flow() {
        let reply = ask("How does data reach the user?");
        assert_eq!(reply.content, QUERY_NARRATIVE);
        assert_eq!(reply.highlights, QUERY_PATH_IDS);
    }

    #[test]
    fn test_generic_flow_menu_has_no_highlights() {
        let reply = ask("Explain the data flow");
        assert_eq!(reply.content, FLOW_MENU);
        assert!(reply.highlights.is_empty());
    }

    #[test]
    fn test_component_definition_falkordb() {
        let reply = ask("What is FalkorDB used for?");
        assert!(reply.content.contains("Graph store holding metric definitions"));
        assert!(reply.content.contains("The semantic layer"));
        assert!(reply.content.contains("**Inbound:**"));
        assert_eq!(reply.highlights, vec!["falkordb"]);
        assert_eq!(reply.code_blocks.len(), 1);
        assert_eq!(reply.code_blocks[0].language, "cypher");
    }

    #[test]
    fn test_component_without_inbound_omits_section() {
        let reply = ask("What is the ERP System?");
        assert_eq!(reply.highlights, vec!["erp"]);
        assert!(!reply.content.contains("**Inbound:**"));
        assert!(reply.content.contains("**Outbound:**"));
    }

    #[test]
    fn test_unknown_component_lists_all_by_category() {
        let kb = demo_knowledge_base();
        let reply = classify_and_respond(&kb, "What is Kafka?", None);
        assert!(reply.highlights.is_empty());
        for component in kb.components() {
            assert!(reply.content.contains(&component.name));
        }
        assert!(reply.content.contains("**storage**"));
    }

    #[test]
    fn test_how_to_query_metric() {
        let reply = ask("How do I query a metric?");
        assert_eq!(reply.highlights, SERVING_IDS);
        assert_eq!(reply.code_blocks.len(), 1);
        assert_eq!(reply.code_blocks[0].language, "sql");
        assert_eq!(
            reply.code_blocks[0].title.as_deref(),
            Some("Monthly revenue for a tenant")
        );
    }

    #[test]
    fn test_how_to_menu() {
        let reply = ask("How to get started with onboarding");
        assert_eq!(reply.content, HOW_TO_MENU);
        assert!(reply.highlights.is_empty());
    }

    #[test]
    fn test_storage_vs_compute() {
        let reply = ask("What's the difference between S3 and Tinybird?");
        assert_eq!(reply.content, STORAGE_VS_COMPUTE);
        assert_eq!(reply.highlights, vec!["s3", "tinybird"]);
    }

    #[test]
    fn test_comparison_menu() {
        let reply = ask("compare the options");
        assert_eq!(reply.content, COMPARISON_MENU);
    }

    #[test]
    fn test_sql_example() {
        let reply = ask("Show me some SQL");
        assert_eq!(reply.highlights, vec!["gateway", "tinybird"]);
        assert_eq!(reply.code_blocks.len(), 1);
        assert!(reply.content.starts_with(QUERY_EXAMPLE_LEAD));
    }

    #[test]
    fn test_faq_beats_classifiers() {
        let kb = demo_knowledge_base();
        let query = "Why Tinybird? Compare it with a warehouse";
        assert_eq!(classify(&kb, query, None), Intent::Faq(0));

        let reply = classify_and_respond(&kb, query, None);
        assert_eq!(reply.content, kb.list_faqs()[0].answer);
        assert_eq!(reply.highlights, kb.list_faqs()[0].related_components);
    }

    #[test]
    fn test_classifier_priority_order() {
        let kb = demo_knowledge_base();
        // "what is" wins over "difference"
        assert_eq!(
            classify(&kb, "what is the difference", None),
            Intent::ComponentDefinition
        );
        // "how do i" wins over "query"
        assert_eq!(classify(&kb, "how do i write a query", None), Intent::HowTo);
        assert_eq!(classify(&kb, "data flow query", None), Intent::DataFlow);
        assert_eq!(classify(&kb, "hello there", None), Intent::Default);
    }

    #[test]
    fn test_classifier_table_order() {
        let order: Vec<Intent> = CLASSIFIERS.iter().map(|c| c.intent).collect();
        assert_eq!(
            order,
            vec![
                Intent::DataFlow,
                Intent::ComponentDefinition,
                Intent::HowTo,
                Intent::Comparison,
                Intent::QueryExample,
            ]
        );
    }

    #[test]
    fn test_empty_query_in_architecture_view() {
        let kb = demo_knowledge_base();
        let ctx = ChatContext::in_view(View::Architecture);
        let reply = classify_and_respond(&kb, "", Some(&ctx));
        assert_eq!(reply.content, ORIENTATION);
        assert!(reply.code_blocks.is_empty());
        assert!(reply.highlights.is_empty());
    }

    #[test]
    fn test_help_keyword_in_architecture_view() {
        let kb = demo_knowledge_base();
        let ctx = ChatContext::in_view(View::Architecture);
        assert_eq!(classify(&kb, "Can you help me?", Some(&ctx)), Intent::Orientation);
        // Orientation outranks the FAQ table
        assert_eq!(classify(&kb, "help: why tinybird", Some(&ctx)), Intent::Orientation);
    }

    #[test]
    fn test_empty_query_elsewhere_gets_default_menu() {
        let kb = demo_knowledge_base();
        let ctx = ChatContext::in_view(View::Dashboard);
        let reply = classify_and_respond(&kb, "", Some(&ctx));
        assert_eq!(reply.content, DEFAULT_MENU);
        assert!(reply.highlights.is_empty());
    }

    #[test]
    fn test_example_enrichment_attaches_related_code() {
        let reply = ask("Give me a code example for the worker");
        assert_eq!(
            reply.content,
            format!("{}\n\nExample: Ingestion worker configuration", DEFAULT_MENU)
        );
        assert_eq!(reply.code_blocks.len(), 1);
        assert_eq!(reply.code_blocks[0].language, "yaml");
    }

    #[test]
    fn test_enrichment_skipped_when_code_already_present() {
        let reply = ask("sql example for the gateway");
        assert_eq!(reply.code_blocks.len(), 1);
        assert_eq!(reply.code_blocks[0].language, "sql");
    }

    #[test]
    fn test_every_reply_has_content() {
        let kb = demo_knowledge_base();
        let ctx = ChatContext::in_view(View::Architecture);
        for query in ["", " ", "?", "what is", "compare", "sql", "how to", "data flow", "zzz"] {
            assert!(!classify_and_respond(&kb, query, None).content.is_empty());
            assert!(!classify_and_respond(&kb, query, Some(&ctx)).content.is_empty());
        }
    }
}
