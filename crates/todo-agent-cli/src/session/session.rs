use anyhow::Result;
use std::path::PathBuf;
use tokio::sync::watch;

use crate::prompt::{InputType, Prompt};
use crate::session::session_file::persist_messages;
use todo_agent::agent::Agent;
use todo_agent::errors::TurnError;

pub struct Session<'a> {
    agent: Agent,
    prompt: Box<dyn Prompt + 'a>,
    session_file: Option<PathBuf>,
}

impl<'a> Session<'a> {
    pub fn new(agent: Agent, prompt: Box<dyn Prompt + 'a>, session_file: Option<PathBuf>) -> Self {
        Session {
            agent,
            prompt,
            session_file,
        }
    }

    pub async fn start(&mut self) -> Result<()> {
        self.setup_session();

        loop {
            let input = self.prompt.get_input()?;
            match input.input_type {
                InputType::Message => {
                    if let Some(content) = input.content {
                        // A failed turn is reported and the session carries on
                        let _ = self.process_turn(&content).await;
                    }
                }
                InputType::Exit => break,
                InputType::AskAgain => continue,
            }
        }

        self.close_session();
        Ok(())
    }

    pub async fn headless_start(&mut self, text: &str) -> Result<()> {
        let result = self.process_turn(text).await;
        self.prompt.close();
        result.map(|_| ()).map_err(Into::into)
    }

    async fn process_turn(&mut self, text: &str) -> Result<String, TurnError> {
        let start = self.agent.conversation().len();
        let (cancel_tx, cancel_rx) = watch::channel(false);

        self.prompt.show_busy();
        let result = {
            let turn = self.agent.run_turn_cancellable(text, cancel_rx);
            tokio::pin!(turn);
            loop {
                tokio::select! {
                    result = &mut turn => break result,
                    _ = tokio::signal::ctrl_c() => {
                        let _ = cancel_tx.send(true);
                    }
                }
            }
        };
        self.prompt.hide_busy();

        self.render_tool_calls(start);
        match &result {
            Ok(answer) => self.prompt.render_answer(answer),
            Err(TurnError::Cancelled) => self
                .prompt
                .render_notice("Interrupted: the request was cancelled."),
            Err(e) => self.prompt.render_error(&e.to_string()),
        }

        self.persist();
        result
    }

    /// Show the tool calls made since the conversation had `start` messages
    fn render_tool_calls(&mut self, start: usize) {
        let messages = self.agent.conversation().messages();
        for message in messages.iter().skip(start) {
            for request in message.tool_requests() {
                if let Ok(call) = &request.tool_call {
                    self.prompt.render_tool_call(&call.name, &call.arguments);
                }
            }
        }
    }

    fn persist(&self) {
        if let Some(path) = &self.session_file {
            if let Err(e) = persist_messages(path, self.agent.conversation().messages()) {
                tracing::warn!(path = %path.display(), "Failed to persist messages: {}", e);
            }
        }
    }

    fn setup_session(&mut self) {
        match &self.session_file {
            Some(path) => self.prompt.render_notice(&format!(
                "Starting session. Recording to {}",
                path.display()
            )),
            None => self.prompt.render_notice("Starting session."),
        }
        let restored = self.agent.conversation().len();
        if restored > 0 {
            self.prompt
                .render_notice(&format!("Restored {} earlier messages.", restored));
        }
        self.prompt.render_notice(&format!(
            "Connected to {} todo tools.",
            self.agent.tools().len()
        ));
        self.prompt.ready();
    }

    fn close_session(&mut self) {
        if let Some(path) = &self.session_file {
            let notice = format!("Closing session. Recorded to {}", path.display());
            self.prompt.render_notice(&notice);
        }
        self.prompt.close();
    }
}
