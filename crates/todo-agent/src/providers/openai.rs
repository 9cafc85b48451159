use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::time::Duration;

use super::base::{Provider, Usage};
use super::configs::OpenAiProviderConfig;
use super::utils::{
    handle_response, is_valid_function_name, sanitize_function_name, unparsed_request_notice,
};
use crate::errors::AgentError;
use crate::models::message::{Message, MessageContent};
use crate::models::role::Role;
use crate::models::tool::{Tool, ToolCall};

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ChatTool<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<i32>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ChatToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl ChatMessage {
    fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: Some(content.into()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatToolCall {
    id: String,
    #[serde(rename = "type", default = "function_kind")]
    kind: String,
    function: FunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct FunctionCall {
    name: String,
    /// JSON-encoded arguments, as the API sends them
    arguments: String,
}

#[derive(Debug, Serialize)]
struct ChatTool<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: FunctionSpec<'a>,
}

#[derive(Debug, Serialize)]
struct FunctionSpec<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a Value,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: Option<i32>,
    completion_tokens: Option<i32>,
    total_tokens: Option<i32>,
}

fn function_kind() -> String {
    "function".to_string()
}

/// Transcript in Chat Completions form. Each tool result becomes its own
/// `tool` message following the assistant message that requested it.
fn messages_to_chat(messages: &[Message]) -> Vec<ChatMessage> {
    let mut chat = Vec::new();
    // Unparsed requests are never echoed back as tool_calls, so their
    // responses go out as user text instead
    let mut unparsed = HashSet::new();

    for message in messages {
        let role = match message.role {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        };
        let mut head = ChatMessage {
            role: role.to_string(),
            ..Default::default()
        };
        let mut results = Vec::new();
        // tool messages must directly follow the calls, so notices go last
        let mut notices = Vec::new();

        for content in &message.content {
            match content {
                MessageContent::Text(text) if !text.text.is_empty() => {
                    let joined = head.content.get_or_insert_with(String::new);
                    if !joined.is_empty() {
                        joined.push('\n');
                    }
                    joined.push_str(&text.text);
                }
                MessageContent::Text(_) => {}
                MessageContent::ToolRequest(request) => match &request.tool_call {
                    Ok(call) => head.tool_calls.get_or_insert_with(Vec::new).push(ChatToolCall {
                        id: request.id.clone(),
                        kind: function_kind(),
                        function: FunctionCall {
                            name: sanitize_function_name(&call.name),
                            arguments: call.arguments.to_string(),
                        },
                    }),
                    Err(_) => {
                        unparsed.insert(request.id.as_str());
                    }
                },
                MessageContent::ToolResponse(response) => {
                    if unparsed.contains(response.id.as_str()) {
                        notices.push(ChatMessage::new(
                            "user",
                            unparsed_request_notice(&response.id, &response.text()),
                        ));
                        continue;
                    }
                    let text = match &response.tool_result {
                        Ok(_) => response.text(),
                        Err(e) => format!("The tool call returned the following error:\n{}", e),
                    };
                    results.push(ChatMessage {
                        tool_call_id: Some(response.id.clone()),
                        ..ChatMessage::new("tool", text)
                    });
                }
            }
        }

        if head.content.is_some() || head.tool_calls.is_some() {
            chat.push(head);
        }
        chat.extend(results);
        chat.extend(notices);
    }

    chat
}

fn tools_to_chat(tools: &[Tool]) -> Result<Vec<ChatTool<'_>>> {
    let mut seen = HashSet::new();
    tools
        .iter()
        .map(|tool| {
            if !seen.insert(tool.name.as_str()) {
                return Err(anyhow!("Duplicate tool name: {}", tool.name));
            }
            Ok(ChatTool {
                kind: "function",
                function: FunctionSpec {
                    name: &tool.name,
                    description: &tool.description,
                    parameters: &tool.input_schema,
                },
            })
        })
        .collect()
}

/// The first choice as an assistant message. Calls that cannot be executed are
/// kept as failed requests so the agent answers them.
fn chat_to_message(message: ChatMessage) -> Message {
    let mut reply = Message::assistant();
    if let Some(text) = message.content.filter(|t| !t.is_empty()) {
        reply = reply.with_text(text);
    }

    for call in message.tool_calls.unwrap_or_default() {
        let name = call.function.name;
        let tool_call = if !is_valid_function_name(&name) {
            Err(AgentError::ToolNotFound(format!(
                "The provided function name '{}' had invalid characters, it must match this regex [a-zA-Z0-9_-]+",
                name
            )))
        } else {
            serde_json::from_str::<Value>(&call.function.arguments)
                .map(|arguments| ToolCall::new(name, arguments))
                .map_err(|e| {
                    AgentError::InvalidParameters(format!(
                        "Could not interpret tool use parameters for id {}: {}",
                        call.id, e
                    ))
                })
        };
        reply = reply.with_tool_request(call.id, tool_call);
    }

    reply
}

impl From<ChatUsage> for Usage {
    fn from(usage: ChatUsage) -> Self {
        let total = usage.total_tokens.or(match (usage.prompt_tokens, usage.completion_tokens) {
            (Some(input), Some(output)) => Some(input + output),
            _ => None,
        });
        Usage::new(usage.prompt_tokens, usage.completion_tokens, total)
    }
}

pub struct OpenAiProvider {
    client: Client,
    config: OpenAiProviderConfig,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(600))
            .build()?;

        Ok(Self { client, config })
    }

    async fn post(&self, payload: Value) -> Result<Value> {
        let url = format!(
            "{}/v1/chat/completions",
            self.config.host.trim_end_matches('/')
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .send()
            .await?;

        handle_response(&payload, response).await
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    async fn complete(
        &self,
        system: &str,
        messages: &[Message],
        tools: &[Tool],
    ) -> Result<(Message, Usage)> {
        let mut chat = vec![ChatMessage::new("system", system)];
        chat.extend(messages_to_chat(messages));

        let request = ChatRequest {
            model: &self.config.model,
            messages: chat,
            tools: tools_to_chat(tools)?,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let body = self.post(serde_json::to_value(&request)?).await?;
        if let Some(error) = body.get("error") {
            return Err(anyhow!("OpenAI API error: {}", error));
        }

        let response: ChatResponse = serde_json::from_value(body.clone())
            .map_err(|e| anyhow!("Invalid response format from OpenAI API: {} ({})", e, body))?;
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("OpenAI API returned no choices: {}", body))?;

        let usage = response.usage.map(Usage::from).unwrap_or_default();
        Ok((chat_to_message(choice.message), usage))
    }
}
