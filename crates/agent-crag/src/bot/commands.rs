//! Command parsing for the CRAG shell

use crate::error::{CragError, Result};

/// Parsed line of user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Index evidence for a ticker and make it current
    Setup { ticker: String },
    /// Explicit question about the current ticker
    Query { text: String },
    /// Input that is not a command; a question once a ticker is loaded
    Text { text: String },
    /// Show the loaded ticker
    Status,
    /// Show help
    Help,
    /// Exit the shell
    Exit,
}

impl Command {
    /// Parse a command from user input
    ///
    /// Command words may carry a leading `/`. A keyword followed by text it
    /// does not take (for example "help me understand margins") is treated
    /// as plain text.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(CragError::CommandError("Empty input".to_string()));
        }

        let (word, rest) = match input.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (input, ""),
        };
        let slashed = word.starts_with('/');
        let word = word.trim_start_matches('/').to_lowercase();

        match (word.as_str(), rest.is_empty()) {
            ("setup" | "load", false) => Ok(Command::Setup {
                ticker: rest.to_string(),
            }),
            ("setup" | "load", true) => Err(CragError::CommandError(
                "Missing ticker. Usage: setup <TICKER>".to_string(),
            )),
            ("query" | "ask" | "q", false) => Ok(Command::Query {
                text: rest.to_string(),
            }),
            ("query" | "ask" | "q", true) => Err(CragError::CommandError(
                "Missing question. Usage: query <QUESTION>".to_string(),
            )),
            ("status", true) => Ok(Command::Status),
            ("help" | "h" | "?", true) => Ok(Command::Help),
            ("exit" | "quit", true) => Ok(Command::Exit),
            _ if slashed => Err(CragError::CommandError(format!("Unknown command: /{word}"))),
            _ => Ok(Command::Text {
                text: input.to_string(),
            }),
        }
    }

    /// Get help text for all commands
    pub fn help_text() -> &'static str {
        r"
Financial CRAG Commands
=======================

  setup <TICKER>      Fetch market data and news for a ticker
  query <QUESTION>    Ask about the loaded ticker
  status              Show the loaded ticker
  help                Show this help
  exit | quit         Leave

Once a ticker is loaded, any other text is treated as a question.

Aliases: load = setup, ask/q = query, h/? = help. A leading / also works.
"
    }
}
