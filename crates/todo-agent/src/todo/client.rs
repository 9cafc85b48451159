use chrono::{DateTime, NaiveDateTime};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::time::Duration;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};
use thiserror::Error;

pub const TODO_API_BASE: &str = "http://localhost:8000/api";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const MAX_LIST_LIMIT: u32 = 1000;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    EnumString,
    EnumIter,
    Display,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Todo {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub priority: Priority,
    #[serde(default)]
    pub completed: bool,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub created_at: NaiveDateTime,
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub completed_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TodoList {
    pub todos: Vec<Todo>,
    pub total: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TodoCreate {
    pub title: String,
    pub description: Option<String>,
    pub priority: Priority,
}

/// Only the fields that are set are sent
#[derive(Debug, Clone, Default, Serialize)]
pub struct TodoUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
}

impl TodoUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.priority.is_none()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TodoQuery {
    pub limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
struct PriorityResponse {
    priorities: Vec<String>,
}

#[derive(Error, Debug)]
pub enum TodoApiError {
    #[error("API request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status; `detail` is its explanation
    #[error("{detail}")]
    Status { status: StatusCode, detail: String },
}

impl TodoApiError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            TodoApiError::Status { status, .. } => Some(*status),
            TodoApiError::Http(e) => e.status(),
        }
    }
}

/// Thin HTTP client for the todo service
#[derive(Debug, Clone)]
pub struct TodoClient {
    client: Client,
    base_url: String,
}

impl TodoClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, TodoApiError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, TodoApiError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }

        let body = response.text().await.unwrap_or_default();
        let detail = match serde_json::from_str::<Value>(&body) {
            Ok(Value::Object(map)) => match map.get("detail") {
                Some(Value::String(detail)) => detail.clone(),
                Some(other) => other.to_string(),
                None => format!("{} {}", status, body),
            },
            _ if body.is_empty() => status.to_string(),
            _ => format!("{} {}", status, body),
        };
        tracing::debug!(%status, %detail, "todo api returned an error");
        Err(TodoApiError::Status { status, detail })
    }

    pub async fn create(&self, todo: &TodoCreate) -> Result<Todo, TodoApiError> {
        self.send(self.client.post(self.url("/todos")).json(todo))
            .await
    }

    pub async fn list(&self, query: &TodoQuery) -> Result<TodoList, TodoApiError> {
        self.send(self.client.get(self.url("/todos")).query(query))
            .await
    }

    pub async fn get(&self, id: i64) -> Result<Todo, TodoApiError> {
        self.send(self.client.get(self.url(&format!("/todos/{id}"))))
            .await
    }

    pub async fn update(&self, id: i64, update: &TodoUpdate) -> Result<Todo, TodoApiError> {
        self.send(self.client.put(self.url(&format!("/todos/{id}"))).json(update))
            .await
    }

    pub async fn complete(&self, id: i64) -> Result<Todo, TodoApiError> {
        self.send(
            self.client
                .patch(self.url(&format!("/todos/{id}/complete"))),
        )
        .await
    }

    pub async fn delete(&self, id: i64) -> Result<MessageResponse, TodoApiError> {
        self.send(self.client.delete(self.url(&format!("/todos/{id}"))))
            .await
    }

    pub async fn priorities(&self) -> Result<Vec<String>, TodoApiError> {
        let response: PriorityResponse = self.send(self.client.get(self.url("/priorities"))).await?;
        Ok(response.priorities)
    }
}

/// Accepts RFC 3339 timestamps as well as the offset-less ISO form the service emits
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.naive_local())
        .ok()
        .or_else(|| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok())
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
}

fn deserialize_optional_timestamp<'de, D>(
    deserializer: D,
) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) => parse_timestamp(&raw)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}"))),
        None => Ok(None),
    }
}
