use std::sync::Arc;
use std::time::Duration;

use todo_agent::invoker::ToolInvoker;
use todo_agent::registry::ToolRegistry;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub invoker: ToolInvoker,
}

impl AppState {
    /// `tool_timeout` bounds each call; `None` lets calls run as long as they need
    pub fn new(registry: Arc<ToolRegistry>, tool_timeout: Option<Duration>) -> Self {
        let mut invoker = ToolInvoker::new(registry);
        if let Some(limit) = tool_timeout {
            invoker = invoker.with_timeout(limit);
        }
        Self { invoker }
    }
}
