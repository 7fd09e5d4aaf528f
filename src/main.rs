use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;
use tracing_subscriber::EnvFilter;

use architect_core::{
    demo_knowledge_base, load_knowledge_base, Architect, ChatContext, Config, GenUiClient,
    KnowledgeBase, OpenAIClient, PromptBuilder, ProviderKind, View,
};

mod mcp;
mod render;

#[derive(Parser)]
#[command(name = "architect")]
#[command(about = "Ask the AI Architect about the platform architecture")]
struct Cli {
    /// Knowledge base JSON to use instead of the built-in demo data
    #[arg(long, global = true)]
    kb: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a question
    Ask {
        /// Your question
        query: String,
        /// Screen the question is asked from (architecture, onboarding, dashboard)
        #[arg(long, value_parser = parse_view)]
        view: Option<View>,
        /// Tab within the screen
        #[arg(long)]
        tab: Option<String>,
        /// Id of the selected component
        #[arg(long)]
        component: Option<String>,
        /// Role of the user asking
        #[arg(long)]
        role: Option<String>,
        /// Always try the generative-UI provider first
        #[arg(long, conflicts_with = "no_primary")]
        prefer_primary: bool,
        /// Never use the generative-UI provider
        #[arg(long)]
        no_primary: bool,
        /// Print the reply as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show which remote providers are configured
    Status,
    /// List the components in the knowledge base
    Components,
    /// List selectable models per provider
    Models,
    /// Run as an MCP server over stdio
    Mcp,
    /// Show or edit the saved configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the config file location and saved values
    Show,
    /// Save an API key for a provider (genui, openai); an empty key clears it
    SetKey {
        #[arg(value_parser = parse_provider)]
        provider: ProviderKind,
        key: String,
    },
    /// Save the model a provider should use
    SetModel {
        #[arg(value_parser = parse_provider)]
        provider: ProviderKind,
        model: String,
    },
}

fn parse_provider(s: &str) -> Result<ProviderKind, String> {
    ProviderKind::from_str(s).ok_or_else(|| format!("unknown provider '{}'", s))
}

fn parse_view(s: &str) -> Result<View, String> {
    View::from_str(s).ok_or_else(|| format!("unknown view '{}'", s))
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_env("ARCHITECT_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    if let Commands::Config { action } = &cli.command {
        return run_config(action);
    }

    let kb = Arc::new(match &cli.kb {
        Some(path) => load_knowledge_base(path)?,
        None => demo_knowledge_base(),
    });
    let config = Config::load()?;

    match cli.command {
        Commands::Ask {
            query,
            view,
            tab,
            component,
            role,
            prefer_primary,
            no_primary,
            json,
        } => {
            let architect = Architect::from_config(&config, kb);
            let context = ChatContext {
                current_view: view,
                current_tab: tab,
                selected_component: component,
                user_role: role,
            };
            let preference = match (prefer_primary, no_primary) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            };

            let message = architect
                .generate_with(&query, Some(&context), preference)
                .await;

            if json {
                println!("{}", serde_json::to_string_pretty(&message)?);
            } else {
                render::print_message(&message);
            }
        }
        Commands::Status => print_status(&Architect::from_config(&config, kb)),
        Commands::Components => list_components(&kb),
        Commands::Models => list_models(&config, kb),
        Commands::Mcp => mcp::run_mcp_server(Architect::from_config(&config, kb)).await?,
        Commands::Config { .. } => {}
    }

    Ok(())
}

/// Edits go to the file only; environment overrides are never persisted.
fn run_config(action: &ConfigAction) -> Result<()> {
    let path = Config::get_config_path()?;
    let mut config = Config::load_from(&path)?;

    match action {
        ConfigAction::Show => {
            println!("{} {}", "Config file:".bold(), path.display());
            let mask = |key: &Option<String>| match key {
                Some(_) => "set".green(),
                None => "not set".red(),
            };
            let model = |m: &Option<String>| m.clone().unwrap_or_else(|| "(default)".to_string());
            println!(
                "  genui  key: {}  model: {}",
                mask(&config.genui_api_key),
                model(&config.genui_model)
            );
            println!(
                "  openai key: {}  model: {}",
                mask(&config.openai_api_key),
                model(&config.openai_model)
            );
            println!("  timeout: {}s", config.timeout_secs());
            return Ok(());
        }
        ConfigAction::SetKey { provider, key } => config.set_api_key(*provider, key),
        ConfigAction::SetModel { provider, model } => config.set_model(*provider, model),
    }

    config.save()?;
    println!("{} {}", "Saved".green(), path.display());
    Ok(())
}

fn print_status(architect: &Architect) {
    let availability = architect.check_availability();
    let mark = |ok: bool| if ok { "configured".green() } else { "not configured".red() };

    println!("{}", "AI Architect providers".bold().blue());
    println!("  Primary (generative UI): {}", mark(availability.primary));
    println!("  Secondary (chat):        {}", mark(availability.secondary));
    if !availability.primary && !availability.secondary {
        println!(
            "\n{}",
            "Answers will come from the offline knowledge base (demo mode).".yellow()
        );
    }
}

fn list_components(kb: &KnowledgeBase) {
    for (category, members) in kb.components_by_category() {
        println!("\n{}", category.bold().blue());
        for component in members {
            println!(
                "  {:<10} {} - {}",
                component.id.yellow(),
                component.name.bold(),
                component.responsibility
            );
        }
    }
}

fn list_models(config: &Config, kb: Arc<KnowledgeBase>) {
    let prompts = PromptBuilder::new(kb);
    let genui = GenUiClient::from_config(config, prompts.clone());
    let openai = OpenAIClient::from_config(config, prompts);

    println!("{} (max {} tokens)", "Generative UI".bold().blue(), genui.max_tokens());
    for model in GenUiClient::list_models() {
        let marker = if model == genui.model() { "*" } else { " " };
        println!("  {} {}", marker, model);
    }

    println!("\n{} (max {} tokens)", "Chat".bold().blue(), openai.max_tokens());
    for model in OpenAIClient::list_models() {
        let marker = if model == openai.model() { "*" } else { " " };
        println!("  {} {}", marker, model);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_ask_with_context() {
        let cli = Cli::try_parse_from([
            "architect", "ask", "What is S3?", "--view", "dashboard", "--component", "s3",
            "--no-primary",
        ])
        .unwrap();
        match cli.command {
            Commands::Ask { query, view, component, no_primary, prefer_primary, .. } => {
                assert_eq!(query, "What is S3?");
                assert_eq!(view, Some(View::Dashboard));
                assert_eq!(component.as_deref(), Some("s3"));
                assert!(no_primary);
                assert!(!prefer_primary);
            }
            _ => panic!("expected ask"),
        }
    }

    #[test]
    fn test_conflicting_preferences_are_rejected() {
        let result =
            Cli::try_parse_from(["architect", "ask", "q", "--prefer-primary", "--no-primary"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_config_set_key() {
        let cli =
            Cli::try_parse_from(["architect", "config", "set-key", "genui", "tk-1"]).unwrap();
        match cli.command {
            Commands::Config {
                action: ConfigAction::SetKey { provider, key },
            } => {
                assert_eq!(provider, ProviderKind::GenerativeUi);
                assert_eq!(key, "tk-1");
            }
            _ => panic!("expected config set-key"),
        }
        assert!(Cli::try_parse_from(["architect", "config", "set-model", "claude", "m"]).is_err());
    }

    #[test]
    fn test_unknown_view_is_rejected() {
        let result = Cli::try_parse_from(["architect", "ask", "q", "--view", "settings"]);
        assert!(result.is_err());
    }
}
