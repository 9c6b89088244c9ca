//! Request parser
//!
//! Splits one raw line into a command and its arguments and validates them.

use crate::error::ParseError;

use super::{Command, Request};

/// Characters stripped from both ends of every token
const TRIM_CHARS: &[char] = &['\t', '\n', '\r', ' '];

/// Parses raw request lines
pub trait Parser: Send + Sync {
    fn parse_args(&self, line: &str) -> Result<Request, ParseError>;
}

/// Default stateless parser for the `get`/`set`/`delete` grammar
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestParser;

impl RequestParser {
    pub fn new() -> Self {
        Self
    }

    fn validate(command: Command, args: &[String]) -> Result<(), ParseError> {
        if args.len() != command.arity() {
            return Err(ParseError::Arity {
                expected: command.arity(),
                got: args.len(),
            });
        }

        // args[0] is intentionally left unchecked; only the value position
        // of `set` goes through the symbol check.
        if args.iter().skip(1).any(|arg| !is_valid_argument(arg)) {
            return Err(ParseError::UnknownSymbols);
        }

        Ok(())
    }
}

impl Parser for RequestParser {
    fn parse_args(&self, line: &str) -> Result<Request, ParseError> {
        // Split on single spaces: "a  b" yields an empty middle token
        let mut tokens = line.split(' ');
        let command_token = tokens.next().unwrap_or_default().trim_matches(TRIM_CHARS);
        let args: Vec<String> = tokens
            .map(|token| token.trim_matches(TRIM_CHARS).to_string())
            .collect();

        let command: Command = command_token.parse()?;
        Self::validate(command, &args)?;

        Ok(Request::new(command, args))
    }
}

fn is_valid_argument(arg: &str) -> bool {
    !arg.is_empty() && arg.chars().all(is_allowed_symbol)
}

/// Whether `c` may appear in a key or value
///
/// `'#'..='='` spans `#$%&'()*+,-./`, the digits and `:;<=`.
pub fn is_allowed_symbol(c: char) -> bool {
    matches!(
        c,
        'a'..='z'
            | 'A'..='Z'
            | 'а'..='я'
            | 'А'..='Я'
            | '#'..='='
            | '!'
            | '?'
            | '"'
            | ' '
            | '_'
            | '@'
            | '№'
            | '^'
            | '\\'
            | '|'
            | '['
            | ']'
    )
}
