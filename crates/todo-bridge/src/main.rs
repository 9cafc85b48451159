use std::sync::Arc;

use anyhow::Context;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

use todo_agent::configuration::Settings;
use todo_agent::registry::ToolRegistry;
use todo_agent::todo::register_todo_tools;

mod routes;
mod state;

use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let settings = Settings::new()?;

    let client = settings
        .todo_api
        .client()
        .context("Failed to set up the todo API client")?;
    let mut registry = ToolRegistry::new();
    register_todo_tools(&mut registry, Arc::new(client))?;
    info!(
        tools = registry.len(),
        todo_api = %settings.todo_api.base_url,
        "registered todo tools"
    );

    let state = AppState::new(Arc::new(registry), settings.agent.to_config().tool_timeout);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = routes::configure(state).layer(cors);

    let addr = settings.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
