use indoc::indoc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::conversation::Conversation;
use crate::errors::TurnError;
use crate::invoker::ToolInvoker;
use crate::models::message::{Message, ToolRequest, ToolResponse};
use crate::models::tool::Tool;
use crate::providers::base::{Provider, Usage};
use crate::registry::ToolRegistry;

pub const DEFAULT_MAX_ROUNDS: usize = 10;
pub const DEFAULT_MODEL_TIMEOUT: Duration = Duration::from_secs(600);
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(30);

pub const DEFAULT_SYSTEM_PROMPT: &str = indoc! {"
    You are a helpful assistant that manages the user's todo list.
    Use the available tools to create, list, inspect, update, complete and delete todos.
    Priorities are low, medium, high and urgent. When a tool reports an error, explain
    what went wrong instead of retrying the same call. Keep answers short."};

#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Tool batches allowed per user turn before the turn is abandoned
    pub max_rounds: usize,
    pub model_timeout: Option<Duration>,
    pub tool_timeout: Option<Duration>,
    /// Run the tool calls of one batch concurrently instead of in order
    pub parallel_tool_calls: bool,
    pub system_prompt: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_rounds: DEFAULT_MAX_ROUNDS,
            model_timeout: Some(DEFAULT_MODEL_TIMEOUT),
            tool_timeout: Some(DEFAULT_TOOL_TIMEOUT),
            parallel_tool_calls: false,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

/// Agent drives one conversation: it relays each user turn to the model and
/// executes the tool calls the model asks for until it produces a final answer.
///
/// Turns are processed one at a time (`&mut self`). Nothing is appended to the
/// conversation for a model round unless the round finished, so every tool
/// request in the transcript is always followed by its tool response.
pub struct Agent {
    provider: Box<dyn Provider>,
    invoker: ToolInvoker,
    conversation: Conversation,
    config: AgentConfig,
}

impl Agent {
    pub fn new(provider: Box<dyn Provider>, registry: Arc<ToolRegistry>) -> Self {
        Self::with_config(provider, registry, AgentConfig::default())
    }

    pub fn with_config(
        provider: Box<dyn Provider>,
        registry: Arc<ToolRegistry>,
        config: AgentConfig,
    ) -> Self {
        let mut invoker = ToolInvoker::new(registry);
        if let Some(limit) = config.tool_timeout {
            invoker = invoker.with_timeout(limit);
        }
        Self {
            provider,
            invoker,
            conversation: Conversation::new(),
            config,
        }
    }

    /// Continue from an earlier transcript, e.g. a restored session
    pub fn with_conversation(mut self, conversation: Conversation) -> Self {
        self.conversation = conversation;
        self
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn tools(&self) -> &[Tool] {
        self.invoker.tools()
    }

    /// Process one user turn and return the model's text for it
    pub async fn run_turn(&mut self, user_text: &str) -> Result<String, TurnError> {
        let (_cancel_tx, cancel_rx) = watch::channel(false);
        self.run_turn_cancellable(user_text, cancel_rx).await
    }

    /// Like [`Agent::run_turn`], abandoning the turn once `cancel` becomes true
    pub async fn run_turn_cancellable(
        &mut self,
        user_text: &str,
        cancel: watch::Receiver<bool>,
    ) -> Result<String, TurnError> {
        tracing::info!(messages = self.conversation.len(), "starting turn");
        self.conversation
            .append(Message::user().with_text(user_text));
        self.drive(cancel).await
    }

    /// Re-enter the model call without a new user message, after a turn ended in an error
    pub async fn resume_turn(&mut self, cancel: watch::Receiver<bool>) -> Result<String, TurnError> {
        tracing::info!(messages = self.conversation.len(), "resuming turn");
        self.drive(cancel).await
    }

    async fn drive(&mut self, mut cancel: watch::Receiver<bool>) -> Result<String, TurnError> {
        let tools = self.invoker.tools().to_vec();
        let mut texts: Vec<String> = Vec::new();
        let mut rounds = 0;

        loop {
            if *cancel.borrow() {
                tracing::warn!(rounds, "turn cancelled before model call");
                return Err(TurnError::Cancelled);
            }

            let transcript = self.conversation.snapshot();
            tracing::debug!(round = rounds, messages = transcript.len(), "calling model");
            let (response, usage) = self.complete(&transcript, &tools, &mut cancel).await?;
            log_usage(&usage);

            let text = response.text();
            if !text.is_empty() {
                texts.push(text);
            }

            let requests: Vec<ToolRequest> =
                response.tool_requests().into_iter().cloned().collect();
            if requests.is_empty() {
                self.conversation.append(response);
                tracing::info!(rounds, "turn finished");
                return Ok(texts.join("\n"));
            }

            if rounds >= self.config.max_rounds {
                tracing::warn!(
                    max_rounds = self.config.max_rounds,
                    pending = requests.len(),
                    "tool round budget exhausted"
                );
                return Err(TurnError::LoopBudgetExceeded {
                    max_rounds: self.config.max_rounds,
                });
            }
            rounds += 1;

            let responses = self.dispatch(&requests, &mut cancel).await?;
            let tool_message = responses
                .into_iter()
                .fold(Message::tool(), |message, result| {
                    message.with_content(result.into())
                });

            self.conversation.append(response);
            self.conversation.append(tool_message);
        }
    }

    async fn complete(
        &self,
        transcript: &[Message],
        tools: &[Tool],
        cancel: &mut watch::Receiver<bool>,
    ) -> Result<(Message, Usage), TurnError> {
        let call = async {
            let request = self
                .provider
                .complete(&self.config.system_prompt, transcript, tools);
            match self.config.model_timeout {
                Some(limit) => match tokio::time::timeout(limit, request).await {
                    Ok(result) => result.map_err(TurnError::ModelInvocation),
                    Err(_) => Err(TurnError::ModelTimeout(limit)),
                },
                None => request.await.map_err(TurnError::ModelInvocation),
            }
        };

        tokio::select! {
            biased;
            _ = cancelled(cancel) => {
                tracing::warn!("turn cancelled during model call");
                Err(TurnError::Cancelled)
            }
            result = call => {
                if let Err(e) = &result {
                    tracing::error!(error = %e, "model call failed");
                }
                result
            }
        }
    }

    async fn dispatch(
        &self,
        requests: &[ToolRequest],
        cancel: &mut watch::Receiver<bool>,
    ) -> Result<Vec<ToolResponse>, TurnError> {
        for request in requests {
            tracing::info!(
                tool = request.tool_name().unwrap_or("<unparsed>"),
                id = %request.id,
                "dispatching tool call"
            );
        }

        let batch: Vec<&ToolRequest> = requests.iter().collect();
        let calls = async {
            if self.config.parallel_tool_calls {
                self.invoker.invoke_all_parallel(&batch).await
            } else {
                self.invoker.invoke_all(&batch).await
            }
        };

        tokio::select! {
            biased;
            _ = cancelled(cancel) => {
                tracing::warn!("turn cancelled during tool dispatch");
                Err(TurnError::Cancelled)
            }
            responses = calls => Ok(responses),
        }
    }
}

/// Resolves once the flag is set; never resolves if the sender is gone without setting it
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    loop {
        if *cancel.borrow_and_update() {
            return;
        }
        if cancel.changed().await.is_err() {
            futures::future::pending::<()>().await;
        }
    }
}

fn log_usage(usage: &Usage) {
    tracing::debug!(
        input_tokens = ?usage.input_tokens,
        output_tokens = ?usage.output_tokens,
        total_tokens = ?usage.total_tokens,
        "model usage"
    );
}
