use anyhow::Result;
use serde_json::Value;

pub mod cliclack;

pub trait Prompt {
    fn render_tool_call(&mut self, name: &str, arguments: &Value);
    fn render_answer(&mut self, text: &str);
    fn render_notice(&mut self, text: &str);
    fn render_error(&mut self, text: &str);
    fn get_input(&mut self) -> Result<Input>;
    fn show_busy(&mut self);
    fn hide_busy(&mut self);
    fn close(&self);
    fn ready(&self) {
        let rule = "=".repeat(60);
        println!("\n{}", rule);
        println!("Todo agent started!");
        println!("{}", rule);
        println!("\nAsk to manage your todos using natural language.");
        println!("Examples:");
        println!("  - 'Create a todo to buy groceries with high priority'");
        println!("  - 'List all my active todos'");
        println!("  - 'Mark todo 1 as completed'");
        println!("  - 'Show me all urgent todos'");
        println!("\nType 'quit' to exit.");
        println!("{}", rule);
    }
}

pub struct Input {
    pub input_type: InputType,
    pub content: Option<String>, // None for control commands such as Exit
}

pub enum InputType {
    AskAgain, // Ask the user for input again. Control flow command.
    Message,  // User sent a message
    Exit,     // User wants to exit the session
}

pub enum Theme {
    Light,
    Dark,
}
