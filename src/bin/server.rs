//! memkv Server Binary
//!
//! Starts the TCP server for memkv.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use memkv::network::Server;
use memkv::{ComputeHandler, Config, MemoryStorage};

/// memkv Server
#[derive(Parser, Debug)]
#[command(name = "memkv-server")]
#[command(about = "Minimal networked in-memory key-value store")]
#[command(version)]
struct Args {
    /// JSON config file
    #[arg(short, long, env = "MEMKV_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address (host:port)
    #[arg(short, long)]
    listen: Option<String>,

    /// Maximum concurrent connections
    #[arg(short, long)]
    max_connections: Option<usize>,

    /// Read buffer size in bytes
    #[arg(short = 's', long)]
    max_message_size: Option<usize>,

    /// Idle timeout in milliseconds (0 disables it)
    #[arg(short, long)]
    idle_timeout_ms: Option<u64>,

    /// Log filter directive (overridden by RUST_LOG)
    #[arg(long)]
    log_level: Option<String>,
}

impl Args {
    fn into_config(self) -> memkv::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };

        if let Some(listen) = self.listen {
            config.listen_addr = listen;
        }
        if let Some(count) = self.max_connections {
            config.max_connections = count;
        }
        if let Some(size) = self.max_message_size {
            config.max_message_size = size;
        }
        if let Some(ms) = self.idle_timeout_ms {
            config.idle_timeout = Some(Duration::from_millis(ms)).filter(|t| !t.is_zero());
        }
        if let Some(level) = self.log_level {
            config.log_level = level;
        }

        config.validate()?;
        Ok(config)
    }
}

fn main() {
    let config = match Args::parse().into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = memkv::logging::init(&config) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    tracing::info!("memkv Server v{}", memkv::VERSION);

    let handler = ComputeHandler::with_storage(MemoryStorage::new());

    let server = match Server::bind(&config, handler) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to start server: {}", e);
            std::process::exit(1);
        }
    };

    // Stop accepting on Ctrl+C / SIGTERM
    let shutdown = server.shutdown_handle();
    if let Err(e) = ctrlc::set_handler(move || {
        tracing::info!("Received shutdown signal, stopping accept loop...");
        shutdown.trigger();
    }) {
        tracing::error!("Failed to install signal handler: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}
