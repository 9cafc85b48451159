use async_trait::async_trait;
use indoc::indoc;
use serde_json::{json, Value};
use std::str::FromStr;
use std::sync::Arc;

use super::client::{
    Priority, TodoApiError, TodoClient, TodoCreate, TodoQuery, TodoUpdate, MAX_LIST_LIMIT,
};
use super::format::{format_todo, format_todo_list};
use crate::errors::{AgentError, AgentResult};
use crate::models::content::Content;
use crate::models::tool::Tool;
use crate::registry::{RegistryError, ToolHandler, ToolRegistry};

const DEFAULT_LIST_LIMIT: u32 = 50;

/// Register every todo tool against the given client
pub fn register_todo_tools(
    registry: &mut ToolRegistry,
    client: Arc<TodoClient>,
) -> Result<(), RegistryError> {
    registry.register(CreateTodo::tool(), Arc::new(CreateTodo(client.clone())))?;
    registry.register(ListTodos::tool(), Arc::new(ListTodos(client.clone())))?;
    registry.register(GetTodo::tool(), Arc::new(GetTodo(client.clone())))?;
    registry.register(UpdateTodo::tool(), Arc::new(UpdateTodo(client.clone())))?;
    registry.register(CompleteTodo::tool(), Arc::new(CompleteTodo(client.clone())))?;
    registry.register(DeleteTodo::tool(), Arc::new(DeleteTodo(client.clone())))?;
    registry.register(GetPriorities::tool(), Arc::new(GetPriorities(client)))?;
    Ok(())
}

fn parse_priority(raw: &str) -> AgentResult<Priority> {
    Priority::from_str(raw).map_err(|_| {
        AgentError::InvalidParameters(format!(
            "Invalid priority '{}'. Must be one of: low, medium, high, urgent",
            raw
        ))
    })
}

fn optional_priority(arguments: &Value) -> AgentResult<Option<Priority>> {
    optional_str(arguments, "priority")?
        .map(parse_priority)
        .transpose()
}

fn optional_str<'a>(arguments: &'a Value, key: &str) -> AgentResult<Option<&'a str>> {
    match arguments.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(AgentError::InvalidParameters(format!(
            "'{}' must be a string",
            key
        ))),
    }
}

/// Models sometimes send ids as strings, so numeric strings are accepted too
fn todo_id(arguments: &Value) -> AgentResult<i64> {
    let id = match arguments.get("todo_id") {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    };
    id.ok_or_else(|| AgentError::InvalidParameters("'todo_id' must be an integer".into()))
}

fn api_failure(action: &str, error: TodoApiError) -> AgentError {
    AgentError::ExecutionError(format!("Failed to {} todo: {}", action, error))
}

fn priority_schema(description: &str) -> Value {
    json!({
        "type": "string",
        "enum": ["low", "medium", "high", "urgent"],
        "description": description
    })
}

fn todo_id_schema(description: &str) -> Value {
    json!({
        "type": "integer",
        "description": description
    })
}

pub struct CreateTodo(Arc<TodoClient>);

impl CreateTodo {
    pub fn tool() -> Tool {
        Tool::new(
            "create_todo",
            "Create a new todo item.",
            json!({
                "type": "object",
                "required": ["title"],
                "properties": {
                    "title": {
                        "type": "string",
                        "description": "The title of the todo"
                    },
                    "description": {
                        "type": "string",
                        "default": null,
                        "description": "Optional detailed description"
                    },
                    "priority": priority_schema("Priority level (default: medium)")
                }
            }),
        )
    }
}

#[async_trait]
impl ToolHandler for CreateTodo {
    async fn call(&self, arguments: Value) -> AgentResult<Vec<Content>> {
        let title = optional_str(&arguments, "title")?
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| AgentError::InvalidParameters("'title' is required".into()))?;
        let priority = optional_priority(&arguments)?.unwrap_or(Priority::Medium);

        let request = TodoCreate {
            title: title.to_string(),
            description: optional_str(&arguments, "description")?.map(str::to_string),
            priority,
        };
        let todo = self
            .0
            .create(&request)
            .await
            .map_err(|e| api_failure("create", e))?;

        Ok(vec![Content::text(format!(
            "✓ Todo created successfully!\n{}",
            format_todo(&todo)
        ))])
    }
}

pub struct ListTodos(Arc<TodoClient>);

impl ListTodos {
    pub fn tool() -> Tool {
        Tool::new(
            "list_todos",
            "List todos with optional filters.",
            json!({
                "type": "object",
                "required": [],
                "properties": {
                    "priority": priority_schema("Filter by priority. Leave empty for all priorities"),
                    "completed": {
                        "type": "boolean",
                        "default": null,
                        "description": "Filter by completion status (true for completed, false for active). Leave empty for all"
                    },
                    "limit": {
                        "type": "integer",
                        "default": DEFAULT_LIST_LIMIT,
                        "description": "Maximum number of todos to return (default: 50, max: 1000)"
                    }
                }
            }),
        )
    }
}

#[async_trait]
impl ToolHandler for ListTodos {
    async fn call(&self, arguments: Value) -> AgentResult<Vec<Content>> {
        let limit = arguments
            .get("limit")
            .and_then(|v| v.as_u64())
            .map(|l| l.min(MAX_LIST_LIMIT as u64) as u32)
            .unwrap_or(DEFAULT_LIST_LIMIT);
        let completed = match arguments.get("completed") {
            None | Some(Value::Null) => None,
            Some(Value::Bool(b)) => Some(*b),
            Some(_) => {
                return Err(AgentError::InvalidParameters(
                    "'completed' must be a boolean".into(),
                ))
            }
        };

        let query = TodoQuery {
            limit,
            priority: optional_priority(&arguments)?,
            completed,
        };
        let list = self
            .0
            .list(&query)
            .await
            .map_err(|e| api_failure("list", e))?;

        Ok(vec![Content::text(format_todo_list(&list))])
    }
}

pub struct GetTodo(Arc<TodoClient>);

impl GetTodo {
    pub fn tool() -> Tool {
        Tool::new(
            "get_todo",
            "Get details of a specific todo by ID.",
            json!({
                "type": "object",
                "required": ["todo_id"],
                "properties": {
                    "todo_id": todo_id_schema("The ID of the todo to retrieve")
                }
            }),
        )
    }
}

#[async_trait]
impl ToolHandler for GetTodo {
    async fn call(&self, arguments: Value) -> AgentResult<Vec<Content>> {
        let id = todo_id(&arguments)?;
        let todo = self.0.get(id).await.map_err(|e| api_failure("get", e))?;
        Ok(vec![Content::text(format_todo(&todo))])
    }
}

pub struct UpdateTodo(Arc<TodoClient>);

impl UpdateTodo {
    pub fn tool() -> Tool {
        Tool::new(
            "update_todo",
            indoc! {"
                Update an existing todo item. Only the fields provided are changed; \
                at least one of title, description or priority must be given."},
            json!({
                "type": "object",
                "required": ["todo_id"],
                "properties": {
                    "todo_id": todo_id_schema("The ID of the todo to update"),
                    "title": {
                        "type": "string",
                        "default": null,
                        "description": "New title"
                    },
                    "description": {
                        "type": "string",
                        "default": null,
                        "description": "New description"
                    },
                    "priority": priority_schema("New priority level")
                }
            }),
        )
    }
}

#[async_trait]
impl ToolHandler for UpdateTodo {
    async fn call(&self, arguments: Value) -> AgentResult<Vec<Content>> {
        let id = todo_id(&arguments)?;
        let update = TodoUpdate {
            title: optional_str(&arguments, "title")?.map(str::to_string),
            description: optional_str(&arguments, "description")?.map(str::to_string),
            priority: optional_priority(&arguments)?,
        };
        if update.is_empty() {
            return Err(AgentError::InvalidParameters(
                "No fields provided to update. Please specify at least one field.".into(),
            ));
        }

        let todo = self
            .0
            .update(id, &update)
            .await
            .map_err(|e| api_failure("update", e))?;

        Ok(vec![Content::text(format!(
            "✓ Todo updated successfully!\n{}",
            format_todo(&todo)
        ))])
    }
}

pub struct CompleteTodo(Arc<TodoClient>);

impl CompleteTodo {
    pub fn tool() -> Tool {
        Tool::new(
            "complete_todo",
            "Mark a todo as completed.",
            json!({
                "type": "object",
                "required": ["todo_id"],
                "properties": {
                    "todo_id": todo_id_schema("The ID of the todo to mark as completed")
                }
            }),
        )
    }
}

#[async_trait]
impl ToolHandler for CompleteTodo {
    async fn call(&self, arguments: Value) -> AgentResult<Vec<Content>> {
        let id = todo_id(&arguments)?;
        let todo = self
            .0
            .complete(id)
            .await
            .map_err(|e| api_failure("complete", e))?;

        Ok(vec![Content::text(format!(
            "✓ Todo marked as completed!\n{}",
            format_todo(&todo)
        ))])
    }
}

pub struct DeleteTodo(Arc<TodoClient>);

impl DeleteTodo {
    pub fn tool() -> Tool {
        Tool::new(
            "delete_todo",
            "Delete a todo item permanently.",
            json!({
                "type": "object",
                "required": ["todo_id"],
                "properties": {
                    "todo_id": todo_id_schema("The ID of the todo to delete")
                }
            }),
        )
    }
}

#[async_trait]
impl ToolHandler for DeleteTodo {
    async fn call(&self, arguments: Value) -> AgentResult<Vec<Content>> {
        let id = todo_id(&arguments)?;
        self.0
            .delete(id)
            .await
            .map_err(|e| api_failure("delete", e))?;

        Ok(vec![Content::text(format!(
            "✓ Todo {} deleted successfully!",
            id
        ))])
    }
}

pub struct GetPriorities(Arc<TodoClient>);

impl GetPriorities {
    pub fn tool() -> Tool {
        Tool::new(
            "get_priorities",
            "Get the list of available priority levels for todos.",
            json!({
                "type": "object",
                "required": [],
                "properties": {}
            }),
        )
    }
}

#[async_trait]
impl ToolHandler for GetPriorities {
    async fn call(&self, _arguments: Value) -> AgentResult<Vec<Content>> {
        let priorities = self
            .0
            .priorities()
            .await
            .map_err(|e| AgentError::ExecutionError(format!("Failed to get priorities: {}", e)))?;

        Ok(vec![Content::text(format!(
            "Available priority levels: {}",
            priorities.join(", ")
        ))])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::todo::client::DEFAULT_TIMEOUT;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn todo_json(id: i64, title: &str, priority: &str) -> Value {
        json!({
            "id": id,
            "title": title,
            "description": null,
            "priority": priority,
            "completed": false,
            "created_at": "2024-03-01T09:30:00",
            "completed_at": null,
            "updated_at": "2024-03-01T09:30:00"
        })
    }

    async fn registry_for(server: &MockServer) -> ToolRegistry {
        let client = TodoClient::new(format!("{}/api", server.uri()), DEFAULT_TIMEOUT).unwrap();
        let mut registry = ToolRegistry::new();
        register_todo_tools(&mut registry, Arc::new(client)).unwrap();
        registry
    }

    async fn call(registry: &ToolRegistry, name: &str, arguments: Value) -> AgentResult<String> {
        let handler = registry.lookup(name).unwrap();
        let contents = handler.call(arguments).await?;
        Ok(crate::models::content::contents_to_text(&contents))
    }

    #[tokio::test]
    async fn test_registers_seven_tools() {
        let server = MockServer::start().await;
        let registry = registry_for(&server).await;
        let names: Vec<_> = registry
            .describe_all()
            .iter()
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(
            names,
            vec![
                "create_todo",
                "list_todos",
                "get_todo",
                "update_todo",
                "complete_todo",
                "delete_todo",
                "get_priorities"
            ]
        );
    }

    #[tokio::test]
    async fn test_create_defaults_to_medium() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/todos"))
            .and(body_json(json!({
                "title": "Water plants",
                "description": null,
                "priority": "medium"
            })))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(todo_json(4, "Water plants", "medium")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let registry = registry_for(&server).await;
        let text = call(&registry, "create_todo", json!({"title": "Water plants"}))
            .await
            .unwrap();
        assert!(text.starts_with("✓ Todo created successfully!\nID: 4"));
        assert!(text.contains("Priority: MEDIUM"));
    }

    #[tokio::test]
    async fn test_invalid_priority_never_reaches_api() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let registry = registry_for(&server).await;
        let err = call(
            &registry,
            "create_todo",
            json!({"title": "x", "priority": "critical"}),
        )
        .await
        .unwrap_err();
        assert_eq!(
            err,
            AgentError::InvalidParameters(
                "Invalid priority 'critical'. Must be one of: low, medium, high, urgent".into()
            )
        );
    }

    #[tokio::test]
    async fn test_list_urgent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/todos"))
            .and(query_param("priority", "urgent"))
            .and(query_param("limit", "1000"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "todos": [todo_json(1, "Pay rent", "urgent"), todo_json(2, "Call mom", "urgent")],
                "total": 2
            })))
            .mount(&server)
            .await;

        let registry = registry_for(&server).await;
        let text = call(
            &registry,
            "list_todos",
            json!({"priority": "urgent", "limit": 5000}),
        )
        .await
        .unwrap();
        assert!(text.starts_with("Found 2 todo(s):"));
        assert!(text.contains("Title: Pay rent"));
        assert!(text.contains("Title: Call mom"));
    }

    #[tokio::test]
    async fn test_list_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/todos"))
            .and(query_param("completed", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"todos": [], "total": 0})))
            .mount(&server)
            .await;

        let registry = registry_for(&server).await;
        let text = call(&registry, "list_todos", json!({"completed": true}))
            .await
            .unwrap();
        assert_eq!(text, "No todos found matching the criteria.");
    }

    #[tokio::test]
    async fn test_update_requires_a_field() {
        let server = MockServer::start().await;
        let registry = registry_for(&server).await;
        let err = call(&registry, "update_todo", json!({"todo_id": 1}))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::InvalidParameters(_)));
    }

    #[tokio::test]
    async fn test_complete_accepts_string_id() {
        let server = MockServer::start().await;
        let mut done = todo_json(7, "File taxes", "high");
        done["completed"] = json!(true);
        done["completed_at"] = json!("2024-03-05T12:00:00");
        Mock::given(method("PATCH"))
            .and(path("/api/todos/7/complete"))
            .respond_with(ResponseTemplate::new(200).set_body_json(done))
            .mount(&server)
            .await;

        let registry = registry_for(&server).await;
        let text = call(&registry, "complete_todo", json!({"todo_id": "7"}))
            .await
            .unwrap();
        assert!(text.contains("Status: ✓ Completed"));
        assert!(text.contains("Completed: 2024-03-05 12:00"));
    }

    #[tokio::test]
    async fn test_delete_missing_todo_fails() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/todos/999"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({"detail": "Todo not found"})),
            )
            .mount(&server)
            .await;

        let registry = registry_for(&server).await;
        let err = call(&registry, "delete_todo", json!({"todo_id": 999}))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            AgentError::ExecutionError("Failed to delete todo: Todo not found".into())
        );
    }

    #[tokio::test]
    async fn test_get_priorities() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/priorities"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "priorities": ["low", "medium", "high", "urgent"]
            })))
            .mount(&server)
            .await;

        let registry = registry_for(&server).await;
        let text = call(&registry, "get_priorities", json!({})).await.unwrap();
        assert_eq!(text, "Available priority levels: low, medium, high, urgent");
    }
}
