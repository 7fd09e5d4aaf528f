//! Demo seed data for the knowledge base.
//!
//! This is the architecture of the fictional analytics platform the demo
//! walks through. The pipeline treats it as an opaque table; swap it for a
//! JSON document via [`load_knowledge_base`] to describe another system.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::knowledge::{
    CodeExample, ComponentExample, ExampleCategory, FaqEntry, FlowEdge, FlowType,
    KnowledgeBase, KnowledgeComponent,
};

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn component(
    id: &str,
    name: &str,
    category: &str,
    responsibility: &str,
    description: &str,
) -> KnowledgeComponent {
    KnowledgeComponent {
        id: id.to_string(),
        name: name.to_string(),
        responsibility: responsibility.to_string(),
        category: category.to_string(),
        description: description.to_string(),
        inbound: Vec::new(),
        outbound: Vec::new(),
        dependencies: Vec::new(),
        example: None,
    }
}

fn flow(from: &str, to: &str, label: &str, flow_type: FlowType) -> FlowEdge {
    FlowEdge {
        from: from.to_string(),
        to: to.to_string(),
        label: label.to_string(),
        flow_type,
    }
}

fn components() -> Vec<KnowledgeComponent> {
    let mut erp = component(
        "erp",
        "ERP System",
        "source",
        "System of record for orders, invoices and inventory",
        "The customer's ERP is never queried directly by dashboards. Changes are \
         captured incrementally so the ERP only sees light, predictable read load.",
    );
    erp.outbound = strings(&["Order and invoice change events to the Ingestion Worker"]);

    let mut worker = component(
        "worker",
        "Ingestion Worker",
        "processing",
        "Pulls ERP changes, normalizes them and writes Parquet batches",
        "A scheduled worker that reads change data from the ERP, maps it onto the \
         canonical schema, deduplicates by primary key and lands partitioned Parquet \
         files in the data lake.",
    );
    worker.inbound = strings(&["Change events from the ERP System"]);
    worker.outbound = strings(&[
        "Parquet batches to the S3 Data Lake",
        "Schema updates to FalkorDB",
    ]);
    worker.dependencies = strings(&["erp", "s3"]);
    worker.example = Some(ComponentExample {
        title: "Worker schedule".to_string(),
        language: "yaml".to_string(),
        content: "schedule: \"*/5 * * * *\"\nsource: erp\ntables: [orders, invoices]\nsink: s3://acme-lake/raw/"
            .to_string(),
    });

    let mut s3 = component(
        "s3",
        "S3 Data Lake",
        "storage",
        "Durable, cheap storage for raw and normalized history",
        "Object storage holding every batch ever ingested, partitioned by table and \
         day. It is the replayable source of truth for analytics, not a query engine.",
    );
    s3.inbound = strings(&["Parquet batches from the Ingestion Worker"]);
    s3.outbound = strings(&["Appended files to Tinybird"]);

    let mut tinybird = component(
        "tinybird",
        "Tinybird",
        "compute",
        "Real-time analytical engine serving metric queries",
        "Managed ClickHouse that ingests lake files through its S3 connector and \
         publishes parameterized SQL pipes as low-latency API endpoints.",
    );
    tinybird.inbound = strings(&[
        "Appended files from the S3 Data Lake",
        "Pipe executions from the API Gateway",
    ]);
    tinybird.outbound = strings(&["Metric rows to the API Gateway"]);
    tinybird.dependencies = strings(&["s3"]);
    tinybird.example = Some(ComponentExample {
        title: "Monthly revenue pipe".to_string(),
        language: "sql".to_string(),
        content: "SELECT toStartOfMonth(order_date) AS month, sum(net_amount) AS revenue\nFROM erp_orders\nGROUP BY month\nORDER BY month"
            .to_string(),
    });

    let mut falkordb = component(
        "falkordb",
        "FalkorDB",
        "semantic",
        "Graph store holding metric definitions and entity relationships",
        "The semantic layer: a graph of metrics, dimensions and the tables that back \
         them. The gateway asks it which pipe and filters implement a requested \
         metric so every dashboard computes a metric the same way.",
    );
    falkordb.inbound = strings(&[
        "Schema updates from the Ingestion Worker",
        "Metric lookups from the API Gateway",
    ]);
    falkordb.outbound = strings(&["Resolved metric definitions to the API Gateway"]);
    falkordb.example = Some(ComponentExample {
        title: "Resolve a metric".to_string(),
        language: "cypher".to_string(),
        content: "MATCH (m:Metric {name: 'revenue'})-[:COMPUTED_BY]->(p:Pipe)\nRETURN p.name, m.filters"
            .to_string(),
    });

    let mut gateway = component(
        "gateway",
        "API Gateway",
        "serving",
        "Single entry point that authenticates, resolves and executes metric requests",
        "Receives metric requests from the dashboard, validates the caller, resolves \
         the metric through FalkorDB and executes the matching Tinybird pipe with \
         tenant filters applied.",
    );
    gateway.inbound = strings(&["Metric requests from the Analytics Dashboard"]);
    gateway.outbound = strings(&[
        "Token validation to the Auth Service",
        "Metric lookups to FalkorDB",
        "Pipe executions to Tinybird",
    ]);
    gateway.dependencies = strings(&["auth", "falkordb", "tinybird"]);

    let mut auth = component(
        "auth",
        "Auth Service",
        "security",
        "Issues and validates tokens carrying tenant and role claims",
        "Validates bearer tokens for the gateway and supplies the tenant id and role \
         used for row-level filtering.",
    );
    auth.inbound = strings(&["Token validation from the API Gateway"]);

    let mut dashboard = component(
        "dashboard",
        "Analytics Dashboard",
        "presentation",
        "Web UI where users explore metrics",
        "Renders charts and tables. It never talks to storage directly; every number \
         is fetched through the API Gateway.",
    );
    dashboard.outbound = strings(&["Metric requests to the API Gateway"]);
    dashboard.dependencies = strings(&["gateway"]);

    vec![erp, worker, s3, tinybird, falkordb, gateway, auth, dashboard]
}

fn flows() -> Vec<FlowEdge> {
    vec![
        flow("erp", "worker", "Change data capture", FlowType::Ingestion),
        flow("worker", "s3", "Parquet batches", FlowType::Ingestion),
        flow("s3", "tinybird", "S3 connector append", FlowType::Ingestion),
        flow("worker", "falkordb", "Schema updates", FlowType::Control),
        flow("dashboard", "gateway", "Metric request", FlowType::Query),
        flow("gateway", "auth", "Token validation", FlowType::Auth),
        flow("gateway", "falkordb", "Resolve metric definition", FlowType::Query),
        flow("gateway", "tinybird", "Execute pipe", FlowType::Query),
    ]
}

fn faqs() -> Vec<FaqEntry> {
    vec![
        FaqEntry {
            question: "Why Tinybird instead of a traditional warehouse?".to_string(),
            answer: "Tinybird (tinybird) gives sub-second queries on fresh data and turns \
                     SQL into versioned API endpoints, so the API Gateway (gateway) can serve \
                     dashboards without a separate caching tier. A warehouse would be cheaper \
                     for ad-hoc exploration but too slow and too costly for interactive, \
                     per-tenant dashboards."
                .to_string(),
            keywords: strings(&["why tinybird", "why use tinybird", "tinybird instead"]),
            related_components: strings(&["tinybird", "gateway"]),
        },
        FaqEntry {
            question: "How fresh is the data on the dashboard?".to_string(),
            answer: "The Ingestion Worker (worker) runs every five minutes and Tinybird \
                     (tinybird) picks up new files within seconds, so dashboards are \
                     typically less than ten minutes behind the ERP."
                .to_string(),
            keywords: strings(&["how fresh", "data freshness", "how often", "how stale"]),
            related_components: strings(&["worker", "tinybird"]),
        },
        FaqEntry {
            question: "Who can see which metrics?".to_string(),
            answer: "Every request carries a token issued by the Auth Service (auth). The \
                     API Gateway (gateway) injects the tenant id and role from that token \
                     into every pipe call, so row-level filtering cannot be bypassed from \
                     the dashboard."
                .to_string(),
            keywords: strings(&["permission", "access control", "row-level", "who can see"]),
            related_components: strings(&["auth", "gateway"]),
        },
        FaqEntry {
            question: "What happens if the ERP is down?".to_string(),
            answer: "Dashboards keep working on the data already ingested. The Ingestion \
                     Worker (worker) resumes from its last checkpoint once the ERP System \
                     (erp) is reachable again, so no changes are lost."
                .to_string(),
            keywords: strings(&["erp is down", "erp outage", "erp goes down"]),
            related_components: strings(&["erp", "worker"]),
        },
        FaqEntry {
            question: "How are metric definitions kept consistent?".to_string(),
            answer: "Metrics are defined once in FalkorDB (falkordb). The gateway resolves \
                     each request against that graph, so two dashboards asking for \
                     \"revenue\" always run the same pipe with the same filters."
                .to_string(),
            keywords: strings(&["metric definition", "semantic layer", "consistent metric"]),
            related_components: strings(&["falkordb", "gateway"]),
        },
    ]
}

fn code_examples() -> Vec<CodeExample> {
    vec![
        CodeExample {
            id: "monthly-revenue".to_string(),
            title: "Monthly revenue for a tenant".to_string(),
            description: "Tinybird pipe behind the revenue chart".to_string(),
            language: "sql".to_string(),
            code: "SELECT\n    toStartOfMonth(order_date) AS month,\n    sum(net_amount) AS revenue\nFROM erp_orders\nWHERE company_id = {{String(company_id, required=True)}}\nGROUP BY month\nORDER BY month"
                .to_string(),
            related_component: Some("tinybird".to_string()),
            category: ExampleCategory::Query,
        },
        CodeExample {
            id: "gateway-request".to_string(),
            title: "Request a metric through the gateway".to_string(),
            description: "What the dashboard sends for a chart".to_string(),
            language: "bash".to_string(),
            code: "curl -H \"Authorization: Bearer $TOKEN\" \\\n  \"https://api.acme.dev/v1/metrics/revenue?granularity=month\""
                .to_string(),
            related_component: Some("gateway".to_string()),
            category: ExampleCategory::Example,
        },
        CodeExample {
            id: "worker-schedule".to_string(),
            title: "Ingestion worker configuration".to_string(),
            description: "Tables and cadence pulled from the ERP".to_string(),
            language: "yaml".to_string(),
            code: "schedule: \"*/5 * * * *\"\nsource:\n  system: erp\n  tables: [orders, invoices, inventory]\nsink:\n  bucket: s3://acme-lake/raw/\n  format: parquet"
                .to_string(),
            related_component: Some("worker".to_string()),
            category: ExampleCategory::Config,
        },
        CodeExample {
            id: "metric-lookup".to_string(),
            title: "Look up a metric definition".to_string(),
            description: "Cypher the gateway runs against the semantic layer".to_string(),
            language: "cypher".to_string(),
            code: "MATCH (m:Metric {name: $metric})-[:COMPUTED_BY]->(p:Pipe)\nRETURN p.name AS pipe, m.filters AS filters"
                .to_string(),
            related_component: Some("falkordb".to_string()),
            category: ExampleCategory::Example,
        },
        CodeExample {
            id: "missing-partitions".to_string(),
            title: "Find days missing from the lake".to_string(),
            description: "First check when a chart shows a gap".to_string(),
            language: "bash".to_string(),
            code: "aws s3 ls s3://acme-lake/raw/orders/ | awk '{print $2}' | sort | tail -n 14"
                .to_string(),
            related_component: Some("s3".to_string()),
            category: ExampleCategory::Troubleshooting,
        },
    ]
}

/// The knowledge base shipped with the demo
pub fn demo_knowledge_base() -> KnowledgeBase {
    KnowledgeBase::new(components(), flows(), faqs(), code_examples())
}

/// Load a knowledge base from a JSON document with the same shape
pub fn load_knowledge_base(path: &Path) -> Result<KnowledgeBase> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read knowledge base {:?}", path))?;
    let kb: KnowledgeBase = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse knowledge base {:?}", path))?;
    validate(&kb).with_context(|| format!("Invalid knowledge base {:?}", path))?;
    Ok(kb)
}

/// Component ids must be unique (ignoring case), and every flow endpoint, FAQ
/// and code example must point at a known component.
pub fn validate(kb: &KnowledgeBase) -> Result<()> {
    let mut ids = HashSet::new();
    for component in kb.components() {
        if !ids.insert(component.id.to_ascii_lowercase()) {
            bail!("duplicate component id '{}'", component.id);
        }
    }

    let check = |id: &str, owner: &str| -> Result<()> {
        if ids.contains(&id.to_ascii_lowercase()) {
            Ok(())
        } else {
            bail!("{} references unknown component '{}'", owner, id)
        }
    };

    for flow in kb.list_flows() {
        let owner = format!("flow {} -> {}", flow.from, flow.to);
        check(&flow.from, &owner)?;
        check(&flow.to, &owner)?;
    }
    for faq in kb.list_faqs() {
        for id in &faq.related_components {
            check(id, &format!("FAQ {:?}", faq.question))?;
        }
    }
    for example in kb.list_code_examples() {
        if let Some(id) = &example.related_component {
            check(id, &format!("code example '{}'", example.id))?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_kb_has_expected_components() {
        let kb = demo_knowledge_base();
        assert_eq!(
            kb.component_ids(),
            vec!["erp", "worker", "s3", "tinybird", "falkordb", "gateway", "auth", "dashboard"]
        );
    }

    #[test]
    fn test_faq_related_components_exist() {
        let kb = demo_knowledge_base();
        for faq in kb.list_faqs() {
            for id in &faq.related_components {
                assert!(kb.lookup_component(id).is_some(), "{} in {:?}", id, faq.question);
            }
        }
    }

    #[test]
    fn test_load_knowledge_base_from_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kb.json");
        let json = serde_json::to_string(&demo_knowledge_base()).unwrap();
        std::fs::write(&path, json).unwrap();

        let kb = load_knowledge_base(&path).unwrap();
        assert_eq!(kb.components().len(), 8);
        assert_eq!(kb.list_code_examples().len(), 5);
    }

    #[test]
    fn test_load_knowledge_base_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kb.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(load_knowledge_base(&path).is_err());
    }

    fn write_kb(dir: &tempfile::TempDir, value: &serde_json::Value) -> std::path::PathBuf {
        let path = dir.path().join("kb.json");
        std::fs::write(&path, value.to_string()).unwrap();
        path
    }

    #[test]
    fn test_demo_kb_is_valid() {
        assert!(validate(&demo_knowledge_base()).is_ok());
    }

    #[test]
    fn test_load_knowledge_base_rejects_duplicate_ids() {
        let dir = tempfile::tempdir().unwrap();
        let mut value = serde_json::to_value(demo_knowledge_base()).unwrap();
        let components = value["components"].as_array_mut().unwrap();
        let mut dup = components[0].clone();
        dup["id"] = serde_json::json!("ERP");
        components.push(dup);

        let err = load_knowledge_base(&write_kb(&dir, &value)).unwrap_err();
        assert!(format!("{:#}", err).contains("duplicate component id 'ERP'"));
    }

    #[test]
    fn test_load_knowledge_base_rejects_dangling_references() {
        let dir = tempfile::tempdir().unwrap();
        let mut value = serde_json::to_value(demo_knowledge_base()).unwrap();
        value["flows"][0]["to"] = serde_json::json!("warehouse");

        let err = load_knowledge_base(&write_kb(&dir, &value)).unwrap_err();
        assert!(format!("{:#}", err).contains("unknown component 'warehouse'"));

        let mut value = serde_json::to_value(demo_knowledge_base()).unwrap();
        value["faqs"][0]["relatedComponents"] = serde_json::json!(["redshift"]);
        let err = load_knowledge_base(&write_kb(&dir, &value)).unwrap_err();
        assert!(format!("{:#}", err).contains("unknown component 'redshift'"));
    }
}
