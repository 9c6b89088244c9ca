//! Compute handler
//!
//! Executes parsed requests against storage and renders the response text.

use crate::error::{KvError, Result};
use crate::network::Handler;
use crate::storage::Storage;

use super::{Command, Parser, Request, RequestParser};

/// Response sent when a request reaches execution with a malformed shape
const UNKNOWN_COMMAND: &str = "Unknown command";

/// Executes requests against a storage backend
///
/// The only component that mutates storage. Both dependencies are injected,
/// so tests can swap in their own `Storage` or `Parser`.
pub struct ComputeHandler<S, P = RequestParser> {
    storage: S,
    parser: P,
}

impl<S: Storage> ComputeHandler<S, RequestParser> {
    /// Create a handler with the default request parser
    pub fn with_storage(storage: S) -> Self {
        Self::new(storage, RequestParser::new())
    }
}

impl<S: Storage, P: Parser> ComputeHandler<S, P> {
    pub fn new(storage: S, parser: P) -> Self {
        Self { storage, parser }
    }

    /// Process one raw request line and return the response text
    ///
    /// Never fails: parse errors and missing keys become descriptive
    /// responses, and every outcome is logged.
    pub fn handle(&self, raw: &str) -> String {
        let request = match self.parser.parse_args(raw) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(request = raw.trim_end(), error = %e, outcome = "parse_error", "failed to parse request");
                return KvError::Parse(e).to_string();
            }
        };

        match self.execute(&request) {
            Ok(response) => response,
            Err(e @ KvError::KeyNotFound(_)) => {
                tracing::warn!(command = %request.command, key = request.key(), outcome = "not_found", "value not found");
                e.to_string()
            }
            Err(e) => {
                tracing::error!(command = %request.command, error = %e, outcome = "failed", "request failed");
                e.to_string()
            }
        }
    }

    /// Run a validated request against storage
    pub fn execute(&self, request: &Request) -> Result<String> {
        match (request.command, request.args.as_slice()) {
            (Command::Get, [key]) => {
                let value = self
                    .storage
                    .get(key)
                    .ok_or_else(|| KvError::KeyNotFound(key.clone()))?;
                tracing::info!(command = "get", key = %key, outcome = "found", "value found");
                Ok(format!("Value found: {}", value))
            }
            (Command::Set, [key, value]) => {
                self.storage.set(key.clone(), value.clone());
                tracing::info!(command = "set", key = %key, outcome = "saved", "value saved");
                Ok(format!("Value {} saved", value))
            }
            (Command::Delete, [key]) => {
                self.storage.delete(key);
                tracing::info!(command = "delete", key = %key, outcome = "deleted", "value deleted");
                Ok(format!("Value {} deleted", key))
            }
            (command, args) => {
                tracing::error!(command = %command, args = args.len(), outcome = "unknown_command", "unexpected request shape");
                Ok(UNKNOWN_COMMAND.to_string())
            }
        }
    }

    /// Access the underlying storage
    pub fn storage(&self) -> &S {
        &self.storage
    }
}

impl<S: Storage + 'static, P: Parser + 'static> Handler for ComputeHandler<S, P> {
    fn handle(&self, request: &str) -> Result<String> {
        Ok(ComputeHandler::handle(self, request))
    }
}
