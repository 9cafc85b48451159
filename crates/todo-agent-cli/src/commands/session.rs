use anyhow::{Context, Result};
use console::style;
use std::sync::Arc;

use todo_agent::agent::Agent;
use todo_agent::bridge::{register_bridge_tools, BridgeClient, DEFAULT_BRIDGE_TIMEOUT};
use todo_agent::configuration::{ConfigError, Settings, TodoApiSettings};
use todo_agent::conversation::Conversation;
use todo_agent::providers::factory;
use todo_agent::registry::ToolRegistry;
use todo_agent::todo::register_todo_tools;

use crate::prompt::cliclack::CliclackPrompt;
use crate::session::session::Session;
use crate::session::session_file::{read_messages, session_path};

pub async fn execute(
    session_name: Option<String>,
    headless_text: Option<String>,
    bridge: Option<String>,
) -> Result<()> {
    let settings = Settings::new()?;

    let provider_config = match settings.provider.into_config() {
        Ok(config) => config,
        Err(ConfigError::MissingEnvVar { env_var }) => {
            print_missing_key_hint(&env_var);
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };
    let provider = factory::get_provider(provider_config)?;

    let registry = build_registry(&settings.todo_api, bridge.as_deref()).await?;
    let session_file = session_name.as_deref().map(session_path).transpose()?;
    let conversation = match &session_file {
        Some(path) if path.exists() => Conversation::from_messages(
            read_messages(path)
                .with_context(|| format!("Failed to read session {}", path.display()))?,
        ),
        _ => Conversation::new(),
    };

    let agent = Agent::with_config(provider, registry, settings.agent.to_config())
        .with_conversation(conversation);
    let mut session = Session::new(agent, Box::new(CliclackPrompt::new()), session_file);

    match headless_text {
        Some(text) => session.headless_start(&text).await,
        None => session.start().await,
    }
}

/// Tools come from the bridge when one is given, otherwise straight from the todo service
pub async fn build_registry(
    todo_api: &TodoApiSettings,
    bridge: Option<&str>,
) -> Result<Arc<ToolRegistry>> {
    let mut registry = ToolRegistry::new();
    match bridge {
        Some(url) => {
            let client = BridgeClient::new(url, DEFAULT_BRIDGE_TIMEOUT)
                .context("Failed to set up the bridge client")?;
            register_bridge_tools(&mut registry, Arc::new(client))
                .await
                .with_context(|| format!("Failed to load tools from the bridge at {}", url))?;
        }
        None => {
            let client = todo_api
                .client()
                .context("Failed to set up the todo API client")?;
            register_todo_tools(&mut registry, Arc::new(client))?;
        }
    }
    Ok(Arc::new(registry))
}

fn print_missing_key_hint(env_var: &str) {
    let rule = "=".repeat(60);
    println!("\n{}", rule);
    println!("{}", style(format!("WARNING: No {} found!", env_var)).yellow().bold());
    println!("{}", rule);
    println!("\nTo manage your todos with the model, set your API key:");
    println!("  export {}=your-api-key-here", env_var);
    println!("\nOr create a .env file with:");
    println!("  {}=your-api-key-here", env_var);
}

