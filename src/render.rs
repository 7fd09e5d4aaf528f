use architect_core::{ChatMessage, ResponseSource};
use colored::*;

/// Plain markdown rendering, used for MCP tool results
pub fn to_markdown(message: &ChatMessage) -> String {
    let mut out = message.content.clone();

    for block in &message.code_blocks {
        out.push_str("\n\n");
        if let Some(title) = &block.title {
            out.push_str(&format!("{}:\n", title));
        }
        out.push_str(&format!("```{}\n{}\n```", block.language, block.code));
    }

    if !message.highlights.is_empty() {
        out.push_str(&format!("\n\nHighlighted components: {}", message.highlights.join(", ")));
    }

    out
}

pub fn print_message(message: &ChatMessage) {
    println!("\n{}", message.content);

    for (i, block) in message.code_blocks.iter().enumerate() {
        let title = block.title.as_deref().unwrap_or("");
        println!(
            "\n{} {}",
            format!("[{}] {}", i + 1, block.language).bold().cyan(),
            title.dimmed()
        );
        for line in block.code.lines() {
            println!("    {}", line.green());
        }
    }

    if !message.highlights.is_empty() {
        println!("\n{} {}", "Components:".bold(), message.highlights.join(", ").yellow());
    }

    if message.ui_payload.is_some() {
        println!("{}", "(interactive view available in the web UI)".dimmed());
    }

    match message.source {
        Some(ResponseSource::Offline) => {
            println!("\n{}", "⚠ demo mode: answered offline from the knowledge base".yellow())
        }
        Some(source) => println!("\n{}", format!("source: {}", source.as_str()).dimmed()),
        None => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use architect_core::CodeBlock;

    #[test]
    fn test_markdown_includes_code_and_highlights() {
        let mut msg = ChatMessage::assistant("Intro", ResponseSource::Secondary);
        msg.code_blocks.push(CodeBlock::new("sql", "SELECT 1").titled("Probe"));
        msg.highlights = vec!["tinybird".to_string(), "s3".to_string()];

        assert_eq!(
            to_markdown(&msg),
            "Intro\n\nProbe:\n```sql\nSELECT 1\n```\n\nHighlighted components: tinybird, s3"
        );
    }

    #[test]
    fn test_markdown_plain_message() {
        let msg = ChatMessage::assistant("Just text", ResponseSource::Offline);
        assert_eq!(to_markdown(&msg), "Just text");
    }
}
