//! Command definitions
//!
//! Represents validated requests from clients.

use std::fmt;
use std::str::FromStr;

use crate::error::ParseError;

/// Command types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Get,
    Set,
    Delete,
}

impl Command {
    /// Wire token for this command
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Get => "get",
            Command::Set => "set",
            Command::Delete => "delete",
        }
    }

    /// Number of arguments the command takes
    pub fn arity(&self) -> usize {
        match self {
            Command::Get | Command::Delete => 1,
            Command::Set => 2,
        }
    }
}

impl FromStr for Command {
    type Err = ParseError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        match token {
            "get" => Ok(Command::Get),
            "set" => Ok(Command::Set),
            "delete" => Ok(Command::Delete),
            other => Err(ParseError::UnknownCommand(other.to_string())),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub command: Command,

    /// Positional arguments, trimmed
    pub args: Vec<String>,
}

impl Request {
    pub fn new(command: Command, args: Vec<String>) -> Self {
        Self { command, args }
    }

    /// First argument (the key for every command)
    pub fn key(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }
}
