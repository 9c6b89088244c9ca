//! # memkv
//!
//! A minimal networked key-value store with:
//! - A line-oriented text protocol (`get`, `set`, `delete`)
//! - Bounded admission control for concurrent connections
//! - Idle deadlines on every connection
//! - Thread-safe in-memory storage
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                              │
//! │        (Semaphore-gated accept, thread per connection)       │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │  raw request line
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                   Compute Handler                            │
//! │          RequestParser → (Command, args) → execute          │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!                       ▼
//!               ┌───────────────┐
//!               │    Storage    │
//!               │   (RwLock)    │
//!               └───────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;
pub mod logging;

pub mod storage;
pub mod compute;
pub mod network;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{KvError, ParseError, Result};
pub use config::Config;
pub use compute::ComputeHandler;
pub use storage::{MemoryStorage, Storage};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of memkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
