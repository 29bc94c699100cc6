//! Input line parsing.

use thiserror::Error;

/// One line of user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Contacts,
    Open(String),
    Close,
    Reload,
    Status,
    Help,
    Quit,
    /// Any line that is not a command
    Send(String),
    /// Blank line
    Empty,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown command '/{0}', type /help")]
    Unknown(String),

    #[error("usage: /{command} <{argument}>")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(Self::Empty);
        }
        let Some(rest) = trimmed.strip_prefix('/') else {
            return Ok(Self::Send(line.to_string()));
        };

        let (name, argument) = match rest.split_once(char::is_whitespace) {
            Some((name, argument)) => (name, argument.trim()),
            None => (rest, ""),
        };

        match name {
            "contacts" | "list" => Ok(Self::Contacts),
            "open" => {
                if argument.is_empty() {
                    return Err(CommandError::MissingArgument {
                        command: "open",
                        argument: "user-id",
                    });
                }
                Ok(Self::Open(argument.to_string()))
            }
            "close" => Ok(Self::Close),
            "reload" => Ok(Self::Reload),
            "status" => Ok(Self::Status),
            "help" => Ok(Self::Help),
            "quit" | "exit" => Ok(Self::Quit),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}
