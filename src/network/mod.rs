//! Network Module
//!
//! TCP server, connection handling and client.
//!
//! ## Architecture
//! - Single acceptor loop gated by a counting semaphore
//! - One thread per accepted connection
//! - Requests routed through a `Handler`
//!
//! ## Framing
//! One request per read, one response per write. A read that fills the
//! whole buffer is rejected instead of being processed in pieces.

mod server;
mod connection;
mod semaphore;
mod shutdown;
mod client;

pub use server::Server;
pub use connection::Connection;
pub use semaphore::{Permit, Semaphore};
pub use shutdown::Shutdown;
pub use client::{Client, ClientConfig};

use crate::error::Result;

/// Response sent when a handler fails without a message
pub const INTERNAL_ERROR: &str = "Internal error";

/// Turns one request into one response
///
/// An empty `Ok` response is not written back to the peer.
pub trait Handler: Send + Sync + 'static {
    fn handle(&self, request: &str) -> Result<String>;
}
