use anyhow::Result;
use std::fs::{self, File};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use todo_agent::configuration::config_dir;
use todo_agent::models::message::Message;

pub fn ensure_session_dir() -> Result<PathBuf> {
    let sessions_dir = config_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?
        .join("sessions");

    if !sessions_dir.exists() {
        fs::create_dir_all(&sessions_dir)?;
    }

    Ok(sessions_dir)
}

/// `~/.config/todo-agent/sessions/<name>.jsonl`
pub fn session_path(name: &str) -> Result<PathBuf> {
    if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
        return Err(anyhow::anyhow!("Invalid session name: {:?}", name));
    }
    Ok(ensure_session_dir()?.join(format!("{}.jsonl", name)))
}

pub fn persist_messages(session_file: &Path, messages: &[Message]) -> Result<()> {
    let file = File::create(session_file)?; // Create or truncate the file
    persist_messages_internal(file, messages)
}

pub fn persist_messages_internal(session_file: File, messages: &[Message]) -> Result<()> {
    let mut writer = io::BufWriter::new(session_file);

    for message in messages {
        serde_json::to_writer(&mut writer, &message)?;
        writeln!(writer)?;
    }

    writer.flush()?;
    Ok(())
}

pub fn read_messages(session_file: &Path) -> Result<Vec<Message>> {
    deserialize_messages(File::open(session_file)?)
}

pub fn deserialize_messages(file: File) -> Result<Vec<Message>> {
    let reader = io::BufReader::new(file);
    let mut messages = Vec::new();

    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        messages.push(serde_json::from_str::<Message>(&line)?);
    }

    Ok(messages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::NamedTempFile;
    use todo_agent::errors::AgentError;
    use todo_agent::models::content::Content;
    use todo_agent::models::role::Role;
    use todo_agent::models::tool::ToolCall;

    #[test]
    fn test_persist_turn() -> Result<()> {
        let temp_file = NamedTempFile::new()?;
        let messages = vec![
            Message::user().with_text("list urgent todos"),
            Message::assistant().with_tool_request(
                "toolu_1",
                Ok(ToolCall::new("list_todos", json!({"priority": "urgent"}))),
            ),
            Message::tool()
                .with_tool_response("toolu_1", Ok(vec![Content::text("Found 2 todo(s):")])),
            Message::assistant().with_text("You have two urgent todos."),
        ];

        persist_messages_internal(temp_file.reopen()?, &messages)?;
        let deserialized = deserialize_messages(temp_file.reopen()?)?;

        assert_eq!(messages, deserialized);
        assert_eq!(deserialized[2].role, Role::Tool);
        Ok(())
    }

    #[test]
    fn test_persist_failed_tool_response() -> Result<()> {
        let temp_file = NamedTempFile::new()?;
        let messages = vec![Message::tool().with_tool_response(
            "toolu_9",
            Err(AgentError::ExecutionError(
                "Failed to delete todo: Todo not found".into(),
            )),
        )];

        persist_messages(temp_file.path(), &messages)?;
        let deserialized = read_messages(temp_file.path())?;

        let response = deserialized[0].tool_responses()[0].clone();
        assert!(response.is_error());
        assert_eq!(
            response.text(),
            "Tool execution failed: Failed to delete todo: Todo not found"
        );
        Ok(())
    }

    #[test]
    fn test_persist_truncates_previous_contents() -> Result<()> {
        let temp_file = NamedTempFile::new()?;
        persist_messages(
            temp_file.path(),
            &[
                Message::user().with_text("one"),
                Message::assistant().with_text("two"),
            ],
        )?;
        persist_messages(temp_file.path(), &[Message::user().with_text("three")])?;

        let deserialized = read_messages(temp_file.path())?;
        assert_eq!(deserialized.len(), 1);
        assert_eq!(deserialized[0].text(), "three");
        Ok(())
    }

    #[test]
    fn test_session_name_validation() {
        assert!(session_path("").is_err());
        assert!(session_path("../escape").is_err());
        assert!(session_path(".hidden").is_err());
    }
}
