//! Connection Handler
//!
//! Handles individual client connections.

use std::io::{ErrorKind, Read, Write};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{KvError, Result};

use super::{Handler, INTERNAL_ERROR};

/// Handles a single client connection
pub struct Connection<H> {
    stream: TcpStream,

    /// Fixed-capacity read buffer; one read is one request
    buffer: Vec<u8>,

    /// Deadline re-armed before every read
    idle_timeout: Option<Duration>,

    handler: Arc<H>,

    /// Sequential id assigned by the server, for logging
    id: u64,

    /// Peer address for logging
    peer_addr: String,
}

impl<H: Handler> Connection<H> {
    /// Create a new connection handler
    pub fn new(
        stream: TcpStream,
        id: u64,
        buffer_size: usize,
        idle_timeout: Option<Duration>,
        handler: Arc<H>,
    ) -> Self {
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        Self {
            stream,
            buffer: vec![0; buffer_size],
            idle_timeout,
            handler,
            id,
            peer_addr,
        }
    }

    /// Handle the connection (blocking until closed)
    ///
    /// Reads requests in a loop and sends responses. Returns `Ok` when the
    /// peer closes its side, `Err` on any fatal transport error.
    pub fn handle(&mut self) -> Result<()> {
        tracing::debug!(conn_id = self.id, peer = %self.peer_addr, "connection established");

        loop {
            let count = match self.read_request() {
                Ok(count) => count,
                Err(e) if e.is_timeout() => {
                    tracing::warn!(
                        conn_id = self.id,
                        peer = %self.peer_addr,
                        idle_timeout = ?self.idle_timeout,
                        "idle timeout, closing connection"
                    );
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!(conn_id = self.id, peer = %self.peer_addr, error = %e, "read failed");
                    return Err(e);
                }
            };

            if count == 0 {
                tracing::debug!(conn_id = self.id, peer = %self.peer_addr, "client disconnected");
                return Ok(());
            }

            let response = self.dispatch(count);
            if response.is_empty() {
                continue;
            }

            if let Err(e) = self.stream.write_all(response.as_bytes()) {
                tracing::warn!(conn_id = self.id, peer = %self.peer_addr, error = %e, "write failed");
                return Err(e.into());
            }
        }
    }

    /// Arm deadlines and perform exactly one read
    fn read_request(&mut self) -> Result<usize> {
        self.arm_deadlines()?;

        let capacity = self.buffer.len();
        let count = loop {
            match self.stream.read(&mut self.buffer) {
                Ok(count) => break count,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        };

        if count >= capacity {
            tracing::error!(
                conn_id = self.id,
                peer = %self.peer_addr,
                capacity,
                read = count,
                "read data error: small buffer size"
            );
            return Err(KvError::BufferTooSmall {
                capacity,
                read: count,
            });
        }

        Ok(count)
    }

    fn arm_deadlines(&self) -> Result<()> {
        let Some(timeout) = self.idle_timeout else {
            return Ok(());
        };

        self.stream
            .set_read_timeout(Some(timeout))
            .map_err(|e| KvError::deadline(timeout, e))?;
        self.stream
            .set_write_timeout(Some(timeout))
            .map_err(|e| KvError::deadline(timeout, e))?;
        Ok(())
    }

    /// Run the handler over the first `count` buffered bytes
    fn dispatch(&self, count: usize) -> String {
        let request = String::from_utf8_lossy(&self.buffer[..count]);
        tracing::trace!(conn_id = self.id, peer = %self.peer_addr, request = %request.trim_end(), "received request");

        match self.handler.handle(&request) {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(conn_id = self.id, peer = %self.peer_addr, error = %e, "handler failed");
                let message = e.to_string();
                if message.is_empty() {
                    INTERNAL_ERROR.to_string()
                } else {
                    message
                }
            }
        }
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}
