use std::io::{self, Write};

use anyhow::Result;
use bat::WrappingMode;
use cliclack::{input, spinner};
use console::style;
use serde_json::Value;

use super::{Input, InputType, Prompt, Theme};

pub struct CliclackPrompt {
    spinner: Option<cliclack::ProgressBar>,
    input_mode: InputMode,
    theme: Theme,
}

enum InputMode {
    Singleline,
    Multiline,
}

impl CliclackPrompt {
    pub fn new() -> Self {
        CliclackPrompt {
            spinner: None,
            input_mode: InputMode::Singleline,
            theme: Theme::Dark,
        }
    }

    fn theme_name(&self) -> &'static str {
        match self.theme {
            Theme::Light => "GitHub",
            Theme::Dark => "zenburn",
        }
    }
}

fn print_markdown(content: &str, theme: &str) {
    let printed = bat::PrettyPrinter::new()
        .input(bat::Input::from_bytes(content.as_bytes()))
        .theme(theme)
        .language("Markdown")
        .wrapping_mode(WrappingMode::Character)
        .print();
    // bat refuses some terminals; fall back to plain output
    if printed.is_err() {
        println!("{}", content);
    }
}

fn flush() {
    let _ = io::stdout().flush();
}

/// Classify a line typed at the prompt
pub fn parse_input(message_text: &str) -> Input {
    let text = message_text.trim();
    let command = text.to_ascii_lowercase();
    match command.as_str() {
        "" => Input {
            input_type: InputType::AskAgain,
            content: None,
        },
        "quit" | "exit" | "/quit" | "/exit" => Input {
            input_type: InputType::Exit,
            content: None,
        },
        _ => Input {
            input_type: InputType::Message,
            content: Some(text.to_string()),
        },
    }
}

impl Prompt for CliclackPrompt {
    fn render_tool_call(&mut self, name: &str, arguments: &Value) {
        println!(
            "{}",
            style(format!("[Calling tool {} with args {}]", name, arguments)).dim()
        );
        flush();
    }

    fn render_answer(&mut self, text: &str) {
        println!();
        print_markdown(text, self.theme_name());
        println!();
        flush();
    }

    fn render_notice(&mut self, text: &str) {
        println!("{}", style(text).yellow());
        flush();
    }

    fn render_error(&mut self, text: &str) {
        eprintln!("{} {}", style("Error:").red().bold(), text);
    }

    fn show_busy(&mut self) {
        let spin = spinner();
        spin.start("awaiting reply");
        self.spinner = Some(spin);
    }

    fn hide_busy(&mut self) {
        if let Some(spin) = self.spinner.take() {
            spin.stop("");
        }
    }

    fn get_input(&mut self) -> Result<Input> {
        let mut input = input("Query:").placeholder("").required(false);
        if let InputMode::Multiline = self.input_mode {
            input = input.multiline();
        }
        let message_text: String = input.interact()?;

        match message_text.trim().to_ascii_lowercase().as_str() {
            "/m" => {
                self.input_mode = InputMode::Multiline;
                Ok(Input {
                    input_type: InputType::AskAgain,
                    content: None,
                })
            }
            "/s" => {
                self.input_mode = InputMode::Singleline;
                Ok(Input {
                    input_type: InputType::AskAgain,
                    content: None,
                })
            }
            "/t" => {
                self.theme = match self.theme {
                    Theme::Light => {
                        println!("Switching to Dark theme");
                        Theme::Dark
                    }
                    Theme::Dark => {
                        println!("Switching to Light theme");
                        Theme::Light
                    }
                };
                Ok(Input {
                    input_type: InputType::AskAgain,
                    content: None,
                })
            }
            "/?" => {
                println!("Commands:");
                println!("quit, exit - Exit the session");
                println!("/m - Switch to multiline input mode");
                println!("/s - Switch to singleline input mode");
                println!("/t - Toggle Light/Dark theme");
                println!("/? - Display this help message");
                println!("Ctrl+C - Cancel the request in progress");
                Ok(Input {
                    input_type: InputType::AskAgain,
                    content: None,
                })
            }
            _ => Ok(parse_input(&message_text)),
        }
    }

    fn close(&self) {
        // No cleanup required
    }
}
