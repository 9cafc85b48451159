use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::errors::AgentResult;
use crate::models::content::Content;
use crate::models::tool::Tool;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error("A tool named {0} is already registered")]
    DuplicateName(String),

    #[error("Tool not found: {0}")]
    UnknownTool(String),
}

/// Executes one tool on behalf of the model
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Run the tool with the arguments supplied by the model
    async fn call(&self, arguments: Value) -> AgentResult<Vec<Content>>;
}

/// Name to handler mapping, populated once at startup and read-only afterwards.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: Vec<Tool>,
    handlers: HashMap<String, Arc<dyn ToolHandler>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool, rejecting names that are already taken
    pub fn register(
        &mut self,
        tool: Tool,
        handler: Arc<dyn ToolHandler>,
    ) -> Result<(), RegistryError> {
        if self.handlers.contains_key(&tool.name) {
            return Err(RegistryError::DuplicateName(tool.name));
        }
        self.handlers.insert(tool.name.clone(), handler);
        self.tools.push(tool);
        Ok(())
    }

    /// Descriptors of every registered tool, in registration order
    pub fn describe_all(&self) -> &[Tool] {
        &self.tools
    }

    pub fn lookup(&self, name: &str) -> Result<Arc<dyn ToolHandler>, RegistryError> {
        self.handlers
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownTool(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
