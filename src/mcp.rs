use architect_core::{Architect, ChatContext, View};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, warn};

use crate::render::to_markdown;

#[derive(Debug, Deserialize)]
struct McpRequest {
    #[allow(dead_code)]
    jsonrpc: String,
    id: Option<serde_json::Value>,
    method: String,
    #[serde(default)]
    params: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct McpResponse {
    jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<McpError>,
}

#[derive(Debug, Serialize)]
struct McpError {
    code: i32,
    message: String,
}

impl McpResponse {
    fn success(id: Option<serde_json::Value>, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    fn error(id: Option<serde_json::Value>, code: i32, message: &str) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(McpError {
                code,
                message: message.to_string(),
            }),
        }
    }

    fn text(id: Option<serde_json::Value>, text: String) -> Self {
        Self::success(
            id,
            serde_json::json!({
                "content": [{
                    "type": "text",
                    "text": text
                }]
            }),
        )
    }
}

#[derive(Debug, Serialize)]
struct ToolDefinition {
    name: String,
    description: String,
    #[serde(rename = "inputSchema")]
    input_schema: serde_json::Value,
}

fn get_tools() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "ask_architect".to_string(),
            description: "Ask the AI Architect a question about the platform architecture"
                .to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The question (e.g., 'How does data flow from ERP to Tinybird?')"
                    },
                    "view": {
                        "type": "string",
                        "description": "Current screen: 'architecture', 'onboarding' or 'dashboard'"
                    },
                    "tab": {
                        "type": "string",
                        "description": "Current tab within the screen"
                    },
                    "component": {
                        "type": "string",
                        "description": "Id of the selected component (e.g., 'tinybird')"
                    },
                    "role": {
                        "type": "string",
                        "description": "Role of the user asking"
                    },
                    "preferPrimary": {
                        "type": "boolean",
                        "description": "Force or skip the generative-UI provider"
                    }
                },
                "required": ["query"]
            }),
        },
        ToolDefinition {
            name: "lookup_component".to_string(),
            description: "Get the knowledge base entry for a component by id".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "id": {
                        "type": "string",
                        "description": "Component id (e.g., 'falkordb', 's3')"
                    }
                },
                "required": ["id"]
            }),
        },
        ToolDefinition {
            name: "check_availability".to_string(),
            description: "Report which remote providers are configured".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {}
            }),
        },
    ]
}

fn handle_initialize(id: Option<serde_json::Value>) -> McpResponse {
    McpResponse::success(
        id,
        serde_json::json!({
            "protocolVersion": "2024-11-05",
            "capabilities": {
                "tools": {}
            },
            "serverInfo": {
                "name": "architect",
                "version": env!("CARGO_PKG_VERSION")
            }
        }),
    )
}

fn handle_tools_list(id: Option<serde_json::Value>) -> McpResponse {
    McpResponse::success(
        id,
        serde_json::json!({
            "tools": get_tools()
        }),
    )
}

async fn handle_tool_call(
    id: Option<serde_json::Value>,
    params: &serde_json::Value,
    architect: &Architect,
) -> McpResponse {
    let tool_name = params
        .get("name")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    let arguments = params.get("arguments").cloned().unwrap_or(serde_json::json!({}));

    match tool_name {
        "ask_architect" => handle_ask(id, &arguments, architect).await,
        "lookup_component" => handle_lookup_component(id, &arguments, architect),
        "check_availability" => {
            let availability = architect.check_availability();
            McpResponse::text(id, serde_json::json!(availability).to_string())
        }
        _ => McpResponse::error(id, -32601, &format!("Unknown tool: {}", tool_name)),
    }
}

fn context_from_arguments(args: &serde_json::Value) -> ChatContext {
    let field = |name: &str| args.get(name).and_then(|v| v.as_str()).map(str::to_string);
    ChatContext {
        current_view: field("view").as_deref().and_then(View::from_str),
        current_tab: field("tab"),
        selected_component: field("component"),
        user_role: field("role"),
    }
}

async fn handle_ask(
    id: Option<serde_json::Value>,
    args: &serde_json::Value,
    architect: &Architect,
) -> McpResponse {
    let query = match args.get("query").and_then(|v| v.as_str()) {
        Some(q) => q,
        None => return McpResponse::error(id, -32602, "Missing 'query' parameter"),
    };
    let prefer_primary = args.get("preferPrimary").and_then(|v| v.as_bool());
    let context = context_from_arguments(args);

    let message = architect
        .generate_with(query, Some(&context), prefer_primary)
        .await;

    McpResponse::success(
        id,
        serde_json::json!({
            "content": [{
                "type": "text",
                "text": to_markdown(&message)
            }],
            "structuredContent": message
        }),
    )
}

fn handle_lookup_component(
    id: Option<serde_json::Value>,
    args: &serde_json::Value,
    architect: &Architect,
) -> McpResponse {
    let component_id = match args.get("id").and_then(|v| v.as_str()) {
        Some(c) => c,
        None => return McpResponse::error(id, -32602, "Missing 'id' parameter"),
    };

    match architect.knowledge_base().lookup_component(component_id) {
        Some(component) => match serde_json::to_string_pretty(component) {
            Ok(text) => McpResponse::text(id, text),
            Err(e) => McpResponse::error(id, -32603, &e.to_string()),
        },
        None => McpResponse::error(id, -32602, &format!("Unknown component: {}", component_id)),
    }
}

async fn handle_line(line: &str, architect: &Architect) -> Option<McpResponse> {
    let request: McpRequest = match serde_json::from_str(line) {
        Ok(r) => r,
        Err(e) => return Some(McpResponse::error(None, -32700, &format!("Parse error: {}", e))),
    };
    debug!("MCP request: {}", request.method);

    let response = match request.method.as_str() {
        "initialize" => handle_initialize(request.id),
        "notifications/initialized" => return None, // Notification, no response
        "tools/list" => handle_tools_list(request.id),
        "tools/call" => handle_tool_call(request.id, &request.params, architect).await,
        _ => McpResponse::error(
            request.id,
            -32601,
            &format!("Method not found: {}", request.method),
        ),
    };
    Some(response)
}

pub async fn run_mcp_server(architect: Architect) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let Some(response) = handle_line(&line, &architect).await else {
            continue;
        };

        match serde_json::to_vec(&response) {
            Ok(mut frame) => {
                frame.push(b'\n');
                stdout.write_all(&frame).await?;
                stdout.flush().await?;
            }
            Err(e) => warn!("Failed to encode MCP response: {}", e),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use architect_core::{demo_knowledge_base, Config};
    use std::sync::Arc;

    fn offline_architect() -> Architect {
        Architect::from_config(&Config::default(), Arc::new(demo_knowledge_base()))
    }

    async fn call(line: &str) -> serde_json::Value {
        let response = handle_line(line, &offline_architect()).await.unwrap();
        serde_json::to_value(response).unwrap()
    }

    #[tokio::test]
    async fn test_tools_list() {
        let value = call(r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#).await;
        let names: Vec<&str> = value["result"]["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["ask_architect", "lookup_component", "check_availability"]);
    }

    #[tokio::test]
    async fn test_ask_architect_offline() {
        let value = call(
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"ask_architect","arguments":{"query":"How does data flow from ERP to Tinybird?"}}}"#,
        )
        .await;
        let structured = &value["result"]["structuredContent"];
        assert_eq!(structured["source"], "offline");
        assert_eq!(
            structured["highlights"],
            serde_json::json!(["erp", "worker", "s3", "tinybird"])
        );
        assert!(value["result"]["content"][0]["text"]
            .as_str()
            .unwrap()
            .contains("Ingestion pipeline"));
    }

    #[tokio::test]
    async fn test_ask_requires_query() {
        let value = call(
            r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"ask_architect","arguments":{}}}"#,
        )
        .await;
        assert_eq!(value["error"]["code"], -32602);
    }

    #[tokio::test]
    async fn test_lookup_component() {
        let value = call(
            r#"{"jsonrpc":"2.0","id":4,"method":"tools/call","params":{"name":"lookup_component","arguments":{"id":"s3"}}}"#,
        )
        .await;
        let text = value["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("S3 Data Lake"));
    }

    #[tokio::test]
    async fn test_notification_has_no_response() {
        let response = handle_line(
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            &offline_architect(),
        )
        .await;
        assert!(response.is_none());
    }

    #[tokio::test]
    async fn test_garbage_is_a_parse_error() {
        let value = call("{not json").await;
        assert_eq!(value["error"]["code"], -32700);
    }

    #[test]
    fn test_context_from_arguments() {
        let args = serde_json::json!({"view": "Architecture", "component": "s3"});
        let ctx = context_from_arguments(&args);
        assert_eq!(ctx.current_view, Some(View::Architecture));
        assert_eq!(ctx.selected_component.as_deref(), Some("s3"));
        assert!(ctx.user_role.is_none());
    }
}
