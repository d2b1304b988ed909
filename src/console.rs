//! Operator console on stdin

use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::engine::ResponseEngine;

/// Help text printed when the console starts
pub const HELP: &str = "\
Available commands:
- \"stop\" or \"quit\": stop the bot
- \"toggle\": enable/disable automatic replies
- \"clear\": clear responded conversation history
- \"status\": show bot status";

/// A console command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Stop,
    Toggle,
    Clear,
    Status,
    Unknown(String),
}

impl ConsoleCommand {
    /// Parse one input line; blank lines yield `None`
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        let command = line.trim().to_lowercase();
        match command.as_str() {
            "" => None,
            "stop" | "quit" => Some(Self::Stop),
            "toggle" => Some(Self::Toggle),
            "clear" => Some(Self::Clear),
            "status" => Some(Self::Status),
            _ => Some(Self::Unknown(command)),
        }
    }
}

/// Apply `command` to `engine`, returning the text to print
#[must_use]
pub fn execute(command: &ConsoleCommand, engine: &ResponseEngine) -> String {
    match command {
        ConsoleCommand::Stop => "Stopping bot...".to_string(),
        ConsoleCommand::Toggle => {
            let active = engine.toggle_active();
            format!("Bot {}", if active { "enabled" } else { "disabled" })
        }
        ConsoleCommand::Clear => {
            engine.clear_all_conversation_state();
            "Responded conversation history cleared".to_string()
        }
        ConsoleCommand::Status => {
            let status = engine.status_snapshot();
            format!(
                "Bot: {}\nConversations tracked: {}",
                if status.active { "active" } else { "inactive" },
                status.tracked_conversations
            )
        }
        ConsoleCommand::Unknown(_) => "Unrecognized command".to_string(),
    }
}

/// Read commands from stdin until EOF or `stop`
///
/// Sends on `shutdown_tx` when the operator asks to stop.
pub async fn run(engine: Arc<ResponseEngine>, shutdown_tx: mpsc::Sender<()>) {
    println!("\n{HELP}\n");
    run_with(BufReader::new(tokio::io::stdin()), &engine, &shutdown_tx).await;
}

/// Read commands from `input` until EOF or `stop`
pub async fn run_with<R>(input: R, engine: &ResponseEngine, shutdown_tx: &mpsc::Sender<()>)
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                tracing::debug!("console input closed");
                return;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to read console input");
                return;
            }
        };

        let Some(command) = ConsoleCommand::parse(&line) else {
            continue;
        };

        println!("{}", execute(&command, engine));

        if command == ConsoleCommand::Stop {
            let _ = shutdown_tx.send(()).await;
            return;
        }
    }
}
