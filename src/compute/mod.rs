//! Compute Module
//!
//! Turns raw request lines into storage operations and response text.
//!
//! ## Request Format
//! ```text
//! <command> <arg1> [<arg2>]
//! ```
//!
//! ### Commands
//! - `get <key>`          → `Value found: <value>` / `Value by key=<key> not found`
//! - `set <key> <value>`  → `Value <value> saved`
//! - `delete <key>`       → `Value <key> deleted`
//!
//! Arguments are restricted to letters (Latin and Cyrillic), digits and a
//! fixed punctuation set.

mod command;
mod parser;
mod handler;

pub use command::{Command, Request};
pub use parser::{is_allowed_symbol, Parser, RequestParser};
pub use handler::ComputeHandler;
