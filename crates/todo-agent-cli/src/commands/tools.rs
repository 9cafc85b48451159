use anyhow::Result;
use console::style;
use todo_agent::configuration::Settings;

use super::session::build_registry;

pub async fn execute(bridge: Option<String>) -> Result<()> {
    let settings = Settings::new()?;
    let registry = build_registry(&settings.todo_api, bridge.as_deref()).await?;

    let backend = bridge.as_deref().unwrap_or(&settings.todo_api.base_url);
    println!("{} tools backed by {}\n", registry.len(), style(backend).cyan());
    for tool in registry.describe_all() {
        println!("  {}  {}", style(&tool.name).bold(), style(&tool.description).dim());
    }
    Ok(())
}
