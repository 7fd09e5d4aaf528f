//! Turns raw model output into structured message fields.
//!
//! Models are asked to fence code as ```lang and to write a component id in
//! parentheses right after the component's name. Both conventions are lifted
//! out here so the UI can render code blocks separately and highlight the
//! mentioned components on the architecture diagram.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::state::CodeBlock;

/// Key whose presence marks a ```json block as a rich-UI payload
pub const UI_PAYLOAD_SENTINEL: &str = "component";

static FENCED_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"```([\w+#.-]*)[^\n]*\n([\s\S]*?)```").expect("fenced block pattern")
});

static JSON_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)```json\b[^\n]*\n([\s\S]*?)```").expect("json block pattern")
});

static EXCESS_NEWLINES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n{3,}").expect("newline pattern"));

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedReply {
    pub content: String,
    pub code_blocks: Vec<CodeBlock>,
    pub highlights: Vec<String>,
    pub ui_payload: Option<Value>,
}

/// Parse a reply from a plain chat-completion provider.
pub fn parse_reply(raw: &str, component_ids: &[&str]) -> ParsedReply {
    parse(raw, component_ids, false)
}

/// Parse a reply from the generative-UI provider, which may carry a widget
/// description inside a ```json block.
pub fn parse_ui_reply(raw: &str, component_ids: &[&str]) -> ParsedReply {
    parse(raw, component_ids, true)
}

fn parse(raw: &str, component_ids: &[&str], detect_ui_payload: bool) -> ParsedReply {
    let mut text = raw.to_string();

    let ui_payload = if detect_ui_payload {
        take_ui_payload(&mut text)
    } else {
        None
    };

    let (text, code_blocks) = take_code_blocks(&text);

    ParsedReply {
        content: normalize_whitespace(&text),
        code_blocks,
        highlights: extract_highlights(raw, component_ids),
        ui_payload,
    }
}

/// Remove the first ```json block that parses and carries the sentinel key.
fn take_ui_payload(text: &mut String) -> Option<Value> {
    let found = JSON_BLOCK.captures_iter(text.as_str()).find_map(|caps| {
        let whole = caps.get(0)?;
        let body = caps.get(1)?.as_str().trim();
        match serde_json::from_str::<Value>(body) {
            Ok(value) if value.get(UI_PAYLOAD_SENTINEL).is_some() => {
                Some((whole.range(), value))
            }
            Ok(_) => None,
            Err(e) => {
                debug!("Ignoring malformed JSON block in provider reply: {}", e);
                None
            }
        }
    });

    let (range, value) = found?;
    text.replace_range(range, "");
    Some(value)
}

fn take_code_blocks(text: &str) -> (String, Vec<CodeBlock>) {
    let mut remaining = String::with_capacity(text.len());
    let mut blocks = Vec::new();
    let mut last = 0;

    for caps in FENCED_BLOCK.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        let language = caps
            .get(1)
            .map(|m| m.as_str())
            .filter(|tag| !tag.is_empty())
            .unwrap_or("text");
        let code = caps.get(2).map(|m| m.as_str().trim()).unwrap_or_default();

        remaining.push_str(&text[last..whole.start()]);
        last = whole.end();
        blocks.push(CodeBlock::new(language, code));
    }
    remaining.push_str(&text[last..]);

    (remaining, blocks)
}

/// Known component ids mentioned as `(id)`, deduplicated in first-mention order.
///
/// Ids are searched for literally, so KB ids may contain any character.
pub fn extract_highlights(raw: &str, component_ids: &[&str]) -> Vec<String> {
    let haystack = raw.to_ascii_lowercase();
    let mut mentions: Vec<(usize, &str)> = component_ids
        .iter()
        .filter_map(|id| {
            let needle = format!("({})", id.to_ascii_lowercase());
            haystack.find(&needle).map(|pos| (pos, *id))
        })
        .collect();
    mentions.sort_by_key(|(pos, _)| *pos);

    let mut seen = HashSet::new();
    mentions
        .into_iter()
        .filter(|(_, id)| seen.insert(id.to_ascii_lowercase()))
        .map(|(_, id)| id.to_string())
        .collect()
}

fn normalize_whitespace(text: &str) -> String {
    EXCESS_NEWLINES.replace_all(text.trim(), "\n\n").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDS: &[&str] = &["erp", "worker", "s3", "tinybird", "falkordb", "gateway"];

    #[test]
    fn test_extracts_fenced_blocks_in_order() {
        let raw = "Run this:\n```sql\nSELECT 1\n```\nthen\n```\nplain output\n```\n\
                   and\n```Python\nprint(1)\n```";
        let parsed = parse_reply(raw, IDS);

        assert_eq!(parsed.code_blocks.len(), 3);
        assert_eq!(parsed.code_blocks[0], CodeBlock::new("sql", "SELECT 1"));
        assert_eq!(parsed.code_blocks[1], CodeBlock::new("text", "plain output"));
        assert_eq!(parsed.code_blocks[2].language, "Python");
        assert!(!parsed.content.contains("```"));
        assert!(!parsed.content.contains("SELECT 1"));
        assert!(parsed.content.starts_with("Run this:"));
    }

    #[test]
    fn test_no_mentions_means_no_highlights() {
        let parsed = parse_reply("Tinybird is fast (really).", IDS);
        assert!(parsed.highlights.is_empty());
    }

    #[test]
    fn test_repeated_mentions_are_deduplicated() {
        let raw = "Tinybird (tinybird) reads S3 (s3). Again (tinybird) and (TINYBIRD).";
        let parsed = parse_reply(raw, IDS);
        assert_eq!(parsed.highlights, vec!["tinybird", "s3"]);
    }

    #[test]
    fn test_mentions_inside_code_still_count() {
        let raw = "See below\n```text\nERP (erp) -> Worker (worker)\n```";
        let parsed = parse_reply(raw, IDS);
        assert_eq!(parsed.highlights, vec!["erp", "worker"]);
    }

    #[test]
    fn test_collapses_blank_line_runs() {
        let raw = "\n\nFirst\n\n\n\n\nSecond\n\n\nThird  \n";
        let parsed = parse_reply(raw, IDS);
        assert_eq!(parsed.content, "First\n\nSecond\n\nThird");
    }

    #[test]
    fn test_ui_payload_is_lifted_out() {
        let raw = "Here is the diagram.\n\
                   ```json\n{\"component\": \"ArchitectureDiagram\", \"props\": {\"nodes\": 4}}\n```\n\
                   The gateway (gateway) serves it.";
        let parsed = parse_ui_reply(raw, IDS);

        let payload = parsed.ui_payload.unwrap();
        assert_eq!(payload["component"], "ArchitectureDiagram");
        assert_eq!(payload["props"]["nodes"], 4);
        assert!(parsed.code_blocks.is_empty());
        assert!(!parsed.content.contains("ArchitectureDiagram"));
        assert_eq!(parsed.highlights, vec!["gateway"]);
    }

    #[test]
    fn test_json_without_sentinel_stays_a_code_block() {
        let raw = "Config:\n```json\n{\"retries\": 3}\n```";
        let parsed = parse_ui_reply(raw, IDS);
        assert!(parsed.ui_payload.is_none());
        assert_eq!(parsed.code_blocks, vec![CodeBlock::new("json", "{\"retries\": 3}")]);
    }

    #[test]
    fn test_malformed_json_is_not_fatal() {
        let raw = "Oops\n```json\n{\"component\": \n```\nstill here";
        let parsed = parse_ui_reply(raw, IDS);
        assert!(parsed.ui_payload.is_none());
        assert_eq!(parsed.code_blocks.len(), 1);
        assert_eq!(parsed.content, "Oops\n\nstill here");
    }

    #[test]
    fn test_plain_parser_ignores_ui_payloads() {
        let raw = "```json\n{\"component\": \"Table\"}\n```";
        let parsed = parse_reply(raw, IDS);
        assert!(parsed.ui_payload.is_none());
        assert_eq!(parsed.code_blocks.len(), 1);
        assert_eq!(parsed.content, "");
    }

    #[test]
    fn test_fence_info_string_is_discarded() {
        let raw = "Intro\n```jsx filename=App.jsx\nconst a = 1;\n```\n\
                   Middle prose explaining things.\n```sql\nSELECT 1\n```\nOutro";
        let parsed = parse_reply(raw, IDS);

        assert_eq!(
            parsed.code_blocks,
            vec![CodeBlock::new("jsx", "const a = 1;"), CodeBlock::new("sql", "SELECT 1")]
        );
        assert_eq!(parsed.content, "Intro\n\nMiddle prose explaining things.\n\nOutro");
    }

    #[test]
    fn test_ui_payload_fence_may_carry_info_string() {
        let raw = "Look:\n```json title=widget\n{\"component\": \"Card\"}\n```\nDone.";
        let parsed = parse_ui_reply(raw, IDS);
        assert_eq!(parsed.ui_payload.unwrap()["component"], "Card");
        assert!(parsed.code_blocks.is_empty());
        assert_eq!(parsed.content, "Look:\n\nDone.");
    }

    #[test]
    fn test_highlights_match_ids_with_any_characters() {
        let raw = "The gateway (api.gateway) and orders (Order Service) and (s3).";
        let parsed = parse_reply(raw, &["s3", "api.gateway", "order service"]);
        assert_eq!(parsed.highlights, vec!["api.gateway", "order service", "s3"]);
    }
}
