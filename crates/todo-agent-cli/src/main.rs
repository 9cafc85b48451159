use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod prompt;
mod session;

use commands::session::execute as session_execute;
use commands::tools::execute as tools_execute;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Call tools through a running todo-bridge at this URL, e.g. http://127.0.0.1:3000
    #[arg(long, global = true, value_name = "URL")]
    bridge: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Chat with the agent about your todos
    #[command(about = "Start an interactive session")]
    Session {
        /// Name of the session to record to and resume from
        #[arg(short, long)]
        session: Option<String>,
    },

    /// Send a single request and print the answer
    #[command(about = "Run one request without interaction")]
    Run {
        /// The request to send, e.g. "list my urgent todos"
        #[arg(short, long)]
        text: String,

        /// Name of the session to record to and resume from
        #[arg(short, long)]
        session: Option<String>,
    },

    /// List the tools offered to the model
    Tools,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    let bridge = cli.bridge;

    match cli.command {
        Some(Command::Session { session }) => session_execute(session, None, bridge).await,
        Some(Command::Run { text, session }) => {
            session_execute(session, Some(text), bridge).await
        }
        Some(Command::Tools) => tools_execute(bridge).await,
        None => session_execute(None, None, bridge).await,
    }
}
