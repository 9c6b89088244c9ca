//! Logging setup for the binaries
//!
//! The library itself only emits `tracing` events; this installs the
//! subscriber once at process start.

use std::fs::OpenOptions;
use std::sync::Mutex;

use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{Config, LogFormat};
use crate::error::{KvError, Result};

/// Install the global subscriber described by `config`
///
/// `RUST_LOG` takes priority over `config.log_level`.
pub fn init(config: &Config) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| KvError::Config(format!("invalid log level {:?}: {}", config.log_level, e)))?;

    let writer = match &config.log_output {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path).map_err(|e| {
                KvError::Config(format!("failed to open log file {}: {}", path.display(), e))
            })?;
            BoxMakeWriter::new(Mutex::new(file))
        }
        None => BoxMakeWriter::new(std::io::stderr),
    };

    let builder = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(writer);

    let installed = match config.log_format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|e| KvError::Config(format!("failed to install logger: {}", e)))
}
