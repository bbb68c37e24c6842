//! CLI module for Puls.

pub mod commands;
mod output;
pub mod preflight;

pub(crate) use output::content_preview;
pub use output::Output;

use clap::{Parser, Subcommand};

/// Puls - Cultural events assistant
///
/// Builds a searchable index of a city's cultural agenda and answers questions about it
/// in conversation.
#[derive(Parser, Debug)]
#[command(name = "puls")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check configuration, API key and build artifacts
    Doctor,

    /// Check a raw events file before processing it
    Validate {
        /// Raw events JSON file (defaults to the configured raw path)
        input: Option<String>,
    },

    /// Clean, filter and chunk raw events into the processed corpus
    Process {
        /// Raw events JSON file (defaults to the configured raw path)
        #[arg(short, long)]
        input: Option<String>,
    },

    /// Embed the processed corpus and build the vector store
    Index,

    /// Search for events similar to a query
    Search {
        /// Search query
        query: String,

        /// Maximum number of results
        #[arg(short, long, default_value = "5")]
        limit: usize,
    },

    /// Ask a single question about upcoming events
    Ask {
        /// The question to ask
        question: String,

        /// Language model to use for response generation
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Start an interactive chat session
    Chat {
        /// Language model to use
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Run the chatbot against an evaluation dataset
    Evaluate {
        /// Dataset JSON file with a `test_cases` array
        dataset: String,
    },

    /// Start HTTP API server for integration with other systems
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_search_with_limit() {
        let cli = Cli::parse_from(["puls", "search", "concert jazz", "-l", "3"]);
        match cli.command {
            Commands::Search { query, limit } => {
                assert_eq!(query, "concert jazz");
                assert_eq!(limit, 3);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::parse_from(["puls", "-vv", "--config", "/tmp/puls.toml", "index"]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.config.as_deref(), Some("/tmp/puls.toml"));
        assert!(matches!(cli.command, Commands::Index));
    }
}
