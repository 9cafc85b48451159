use std::sync::Arc;
use std::time::Duration;

use crate::errors::AgentError;
use crate::models::message::{ToolRequest, ToolResponse};
use crate::models::tool::Tool;
use crate::registry::ToolRegistry;

/// Runs tool requests against the registry. Every request yields exactly one
/// response carrying the request id; failures are folded into the response.
#[derive(Clone)]
pub struct ToolInvoker {
    registry: Arc<ToolRegistry>,
    timeout: Option<Duration>,
}

impl ToolInvoker {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            timeout: None,
        }
    }

    /// Bound each tool call; a call that runs longer becomes a failed response
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn tools(&self) -> &[Tool] {
        self.registry.describe_all()
    }

    pub async fn invoke(&self, request: &ToolRequest) -> ToolResponse {
        let tool_result = match &request.tool_call {
            Err(e) => Err(e.clone()),
            Ok(call) => match self.registry.lookup(&call.name) {
                Err(e) => {
                    tracing::warn!(tool = %call.name, id = %request.id, "{}", e);
                    Err(AgentError::ToolNotFound(call.name.clone()))
                }
                Ok(handler) => {
                    tracing::debug!(tool = %call.name, id = %request.id, "invoking tool");
                    let future = handler.call(call.arguments.clone());
                    match self.timeout {
                        Some(limit) => match tokio::time::timeout(limit, future).await {
                            Ok(result) => result,
                            Err(_) => Err(AgentError::Timeout(format!(
                                "{} did not finish within {:?}",
                                call.name, limit
                            ))),
                        },
                        None => future.await,
                    }
                }
            },
        };

        if let Err(e) = &tool_result {
            tracing::warn!(id = %request.id, error = %e, "tool call failed");
        }

        ToolResponse {
            id: request.id.clone(),
            tool_result,
        }
    }

    /// Invoke a batch, one after another, keeping request order
    pub async fn invoke_all(&self, requests: &[&ToolRequest]) -> Vec<ToolResponse> {
        let mut responses = Vec::with_capacity(requests.len());
        for request in requests {
            responses.push(self.invoke(request).await);
        }
        responses
    }

    /// Invoke a batch concurrently; responses come back in request order
    pub async fn invoke_all_parallel(&self, requests: &[&ToolRequest]) -> Vec<ToolResponse> {
        let futures: Vec<_> = requests.iter().map(|request| self.invoke(request)).collect();
        futures::future::join_all(futures).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AgentResult;
    use crate::models::content::Content;
    use crate::models::tool::ToolCall;
    use crate::registry::ToolHandler;
    use async_trait::async_trait;
    use serde_json::{json, Value};

    struct Echo;

    #[async_trait]
    impl ToolHandler for Echo {
        async fn call(&self, arguments: Value) -> AgentResult<Vec<Content>> {
            let message = arguments
                .get("message")
                .and_then(|v| v.as_str())
                .ok_or_else(|| AgentError::InvalidParameters("message parameter required".into()))?;
            Ok(vec![Content::text(message)])
        }
    }

    struct Slow(Duration);

    #[async_trait]
    impl ToolHandler for Slow {
        async fn call(&self, _arguments: Value) -> AgentResult<Vec<Content>> {
            tokio::time::sleep(self.0).await;
            Ok(vec![Content::text("finally")])
        }
    }

    fn invoker() -> ToolInvoker {
        let mut registry = ToolRegistry::new();
        registry
            .register(
                Tool::new("echo", "reply with the input", json!({"type": "object"})),
                Arc::new(Echo),
            )
            .unwrap();
        registry
            .register(
                Tool::new("slow", "takes its time", json!({"type": "object"})),
                Arc::new(Slow(Duration::from_millis(200))),
            )
            .unwrap();
        ToolInvoker::new(Arc::new(registry))
    }

    fn request(id: &str, name: &str, arguments: Value) -> ToolRequest {
        ToolRequest {
            id: id.to_string(),
            tool_call: Ok(ToolCall::new(name, arguments)),
        }
    }

    #[tokio::test]
    async fn test_invoke_success_echoes_id() {
        let response = invoker()
            .invoke(&request("call_1", "echo", json!({"message": "hello"})))
            .await;
        assert_eq!(response.id, "call_1");
        assert_eq!(response.tool_result, Ok(vec![Content::text("hello")]));
    }

    #[tokio::test]
    async fn test_unknown_tool_is_failed_response() {
        let response = invoker()
            .invoke(&request("call_2", "launch_rockets", json!({})))
            .await;
        assert_eq!(response.id, "call_2");
        assert!(response.is_error());
        assert!(response.text().contains("launch_rockets"));
    }

    #[tokio::test]
    async fn test_handler_failure_is_failed_response() {
        let response = invoker().invoke(&request("call_3", "echo", json!({}))).await;
        assert_eq!(
            response.tool_result,
            Err(AgentError::InvalidParameters("message parameter required".into()))
        );
    }

    #[tokio::test]
    async fn test_unparsed_request_is_failed_response() {
        let bad = ToolRequest {
            id: "call_4".into(),
            tool_call: Err(AgentError::InvalidParameters("not json".into())),
        };
        let response = invoker().invoke(&bad).await;
        assert_eq!(response.id, "call_4");
        assert!(response.is_error());
    }

    #[tokio::test]
    async fn test_timeout_is_failed_response() {
        let invoker = invoker().with_timeout(Duration::from_millis(20));
        let response = invoker.invoke(&request("call_5", "slow", json!({}))).await;
        assert!(matches!(response.tool_result, Err(AgentError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_batches_keep_request_order() {
        let invoker = invoker();
        let first = request("a", "slow", json!({}));
        let second = request("b", "echo", json!({"message": "quick"}));
        let third = request("c", "missing", json!({}));
        let batch = vec![&first, &second, &third];

        for responses in [
            invoker.invoke_all(&batch).await,
            invoker.invoke_all_parallel(&batch).await,
        ] {
            let ids: Vec<_> = responses.iter().map(|r| r.id.as_str()).collect();
            assert_eq!(ids, vec!["a", "b", "c"]);
            assert!(!responses[0].is_error());
            assert!(responses[2].is_error());
        }
    }
}
