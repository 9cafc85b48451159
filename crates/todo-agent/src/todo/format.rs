use super::client::{Todo, TodoList};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

pub fn format_todo(todo: &Todo) -> String {
    let status = if todo.completed {
        "✓ Completed"
    } else {
        "○ Active"
    };

    let mut lines = vec![
        format!("ID: {}", todo.id),
        format!("Title: {}", todo.title),
        format!("Status: {}", status),
        format!("Priority: {}", todo.priority.as_ref().to_uppercase()),
        format!("Created: {}", todo.created_at.format(TIMESTAMP_FORMAT)),
    ];

    if let Some(description) = todo.description.as_deref().filter(|d| !d.is_empty()) {
        lines.push(format!("Description: {}", description));
    }
    if let Some(completed_at) = todo.completed_at {
        lines.push(format!("Completed: {}", completed_at.format(TIMESTAMP_FORMAT)));
    }

    lines.join("\n")
}

pub fn format_todo_list(list: &TodoList) -> String {
    if list.todos.is_empty() {
        return "No todos found matching the criteria.".to_string();
    }

    let items: Vec<String> = list.todos.iter().map(format_todo).collect();
    format!(
        "Found {} todo(s):\n{}\n{}",
        list.total,
        "=".repeat(50),
        items.join("\n---\n")
    )
}
