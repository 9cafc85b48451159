//! Client side of the todo-bridge HTTP service.
//!
//! The bridge serves a tool registry over `GET /tools` and `POST /tools/call`.
//! [`register_bridge_tools`] mirrors that registry locally so an agent can run
//! against a bridge instead of calling the todo service directly.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::errors::{AgentError, AgentResult};
use crate::models::content::{contents_to_text, Content};
use crate::models::tool::Tool;
use crate::registry::{RegistryError, ToolHandler, ToolRegistry};

pub const DEFAULT_BRIDGE_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListToolsResponse {
    pub tools: Vec<Tool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallToolRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default = "empty_arguments")]
    pub arguments: Value,
}

/// Tool failures arrive as a normal response with `is_error` set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallToolResponse {
    pub id: String,
    pub is_error: bool,
    pub content: Vec<Content>,
}

fn empty_arguments() -> Value {
    Value::Object(Default::default())
}

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Bridge answered {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

#[derive(Debug, Clone)]
pub struct BridgeClient {
    client: Client,
    base_url: String,
}

impl BridgeClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, BridgeError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, BridgeError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(BridgeError::Status { status, body })
    }

    pub async fn list_tools(&self) -> Result<Vec<Tool>, BridgeError> {
        let response = self
            .client
            .get(format!("{}/tools", self.base_url))
            .send()
            .await?;
        let listed: ListToolsResponse = Self::check(response).await?.json().await?;
        Ok(listed.tools)
    }

    pub async fn call_tool(
        &self,
        request: &CallToolRequest,
    ) -> Result<CallToolResponse, BridgeError> {
        let response = self
            .client
            .post(format!("{}/tools/call", self.base_url))
            .json(request)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }
}

/// One remote tool, called through the bridge
pub struct BridgeTool {
    client: Arc<BridgeClient>,
    name: String,
}

impl BridgeTool {
    pub fn new(client: Arc<BridgeClient>, name: impl Into<String>) -> Self {
        Self {
            client,
            name: name.into(),
        }
    }
}

#[async_trait]
impl ToolHandler for BridgeTool {
    async fn call(&self, arguments: Value) -> AgentResult<Vec<Content>> {
        let request = CallToolRequest {
            id: None,
            name: self.name.clone(),
            arguments,
        };
        let response = self
            .client
            .call_tool(&request)
            .await
            .map_err(|e| AgentError::ExecutionError(e.to_string()))?;

        if response.is_error {
            tracing::debug!(tool = %self.name, id = %response.id, "bridge reported a tool failure");
            return Err(AgentError::ExecutionError(contents_to_text(&response.content)));
        }
        Ok(response.content)
    }
}

/// Registers every tool the bridge advertises and returns how many were added
pub async fn register_bridge_tools(
    registry: &mut ToolRegistry,
    client: Arc<BridgeClient>,
) -> Result<usize, BridgeError> {
    let tools = client.list_tools().await?;
    let count = tools.len();
    for tool in tools {
        let handler = BridgeTool::new(client.clone(), tool.name.clone());
        registry.register(tool, Arc::new(handler))?;
    }
    tracing::info!(tools = count, bridge = %client.base_url(), "registered bridge tools");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn bridge_with_tools() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tools"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "tools": [
                    {
                        "name": "list_todos",
                        "description": "List todos",
                        "input_schema": {"type": "object", "properties": {"priority": {"type": "string"}}}
                    },
                    {
                        "name": "delete_todo",
                        "description": "Delete a todo",
                        "input_schema": {"type": "object", "properties": {"todo_id": {"type": "integer"}}}
                    }
                ]
            })))
            .mount(&server)
            .await;
        server
    }

    async fn registry_for(server: &MockServer) -> ToolRegistry {
        let client = BridgeClient::new(server.uri(), Duration::from_secs(5)).unwrap();
        let mut registry = ToolRegistry::new();
        register_bridge_tools(&mut registry, Arc::new(client))
            .await
            .unwrap();
        registry
    }

    #[tokio::test]
    async fn test_registry_mirrors_bridge_tools() {
        let server = bridge_with_tools().await;
        let registry = registry_for(&server).await;

        let names: Vec<_> = registry
            .describe_all()
            .iter()
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(names, vec!["list_todos", "delete_todo"]);
        assert_eq!(registry.describe_all()[1].description, "Delete a todo");
    }

    #[tokio::test]
    async fn test_call_forwards_name_and_arguments() {
        let server = bridge_with_tools().await;
        Mock::given(method("POST"))
            .and(path("/tools/call"))
            .and(body_json(json!({
                "name": "list_todos",
                "arguments": {"priority": "urgent"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "call_1",
                "is_error": false,
                "content": [{"type": "text", "text": "Found 1 todo(s)"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let registry = registry_for(&server).await;
        let handler = registry.lookup("list_todos").unwrap();
        let content = handler.call(json!({"priority": "urgent"})).await.unwrap();
        assert_eq!(content, vec![Content::text("Found 1 todo(s)")]);
    }

    #[tokio::test]
    async fn test_reported_failure_becomes_execution_error() {
        let server = bridge_with_tools().await;
        Mock::given(method("POST"))
            .and(path("/tools/call"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "call_2",
                "is_error": true,
                "content": [{"type": "text", "text": "Todo with id 42 not found"}]
            })))
            .mount(&server)
            .await;

        let registry = registry_for(&server).await;
        let handler = registry.lookup("delete_todo").unwrap();
        let err = handler.call(json!({"todo_id": 42})).await.unwrap_err();
        assert_eq!(
            err,
            AgentError::ExecutionError("Todo with id 42 not found".to_string())
        );
    }

    #[tokio::test]
    async fn test_bridge_outage_becomes_execution_error() {
        let server = bridge_with_tools().await;
        Mock::given(method("POST"))
            .and(path("/tools/call"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let registry = registry_for(&server).await;
        let handler = registry.lookup("list_todos").unwrap();
        match handler.call(json!({})).await {
            Err(AgentError::ExecutionError(message)) => {
                assert!(message.contains("502"), "unexpected message: {}", message);
                assert!(message.contains("bad gateway"));
            }
            other => panic!("expected an execution error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_listing_failure_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tools"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = BridgeClient::new(server.uri(), Duration::from_secs(5)).unwrap();
        let mut registry = ToolRegistry::new();
        let err = register_bridge_tools(&mut registry, Arc::new(client))
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::Status { status, .. } if status == StatusCode::INTERNAL_SERVER_ERROR));
        assert!(registry.is_empty());
    }
}
