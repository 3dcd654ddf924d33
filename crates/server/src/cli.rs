use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Bridge between a language model and an MCP tool server.
///
/// Launches the tool server as a child process, then answers queries by
/// letting the model call its tools until it produces a final answer.
#[derive(Parser, Debug)]
#[command(name = "relay-server", version, about = "Answer queries with a model and an MCP tool server")]
pub struct CliArgs {
    /// Tool server script (.py or .js); overrides SERVER_SCRIPT_PATH
    #[arg(long, global = true)]
    pub server_script: Option<PathBuf>,

    /// Config profile; overrides RELAY_PROFILE
    #[arg(long, global = true)]
    pub profile: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Connect and serve the HTTP API until Ctrl-C (default)
    Serve,
    /// Resolve one query and print the conversation as JSON
    Ask {
        /// The query text
        query: String,
    },
    /// Connect, print the tool catalog, disconnect
    Tools,
}

impl CliArgs {
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Serve)
    }
}
