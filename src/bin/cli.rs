//! memkv CLI Client
//!
//! Command-line interface for interacting with memkv. Runs a single command
//! when one is given, otherwise an interactive prompt.

use std::io::{self, BufRead, ErrorKind, Write};
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use memkv::compute::is_allowed_symbol;
use memkv::network::{Client, ClientConfig};
use memkv::{ComputeHandler, Config, KvError, MemoryStorage};

/// memkv CLI
#[derive(Parser, Debug)]
#[command(name = "memkv-cli")]
#[command(about = "CLI for memkv key-value store")]
struct Args {
    /// JSON config file
    #[arg(short, long, env = "MEMKV_CONFIG")]
    config: Option<PathBuf>,

    /// Server address
    #[arg(short, long)]
    address: Option<String>,

    /// Response buffer size in bytes
    #[arg(short = 's', long)]
    max_message_size: Option<usize>,

    /// Per-request timeout in milliseconds
    #[arg(short, long)]
    idle_timeout_ms: Option<u64>,

    /// Run against an in-process store instead of a server
    #[arg(long)]
    local: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key-value pair
    Set {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Delete a key
    #[command(alias = "del")]
    Delete {
        /// The key to delete
        key: String,
    },
}

impl Commands {
    fn to_request(&self) -> String {
        match self {
            Commands::Get { key } => format!("get {}", key),
            Commands::Set { key, value } => format!("set {} {}", key, value),
            Commands::Delete { key } => format!("delete {}", key),
        }
    }
}

/// Where requests go: a remote server or an in-process handler
enum Backend {
    Remote(Client),
    Local(ComputeHandler<MemoryStorage>),
}

impl Backend {
    fn send(&mut self, request: &str) -> memkv::Result<String> {
        match self {
            Backend::Remote(client) => client.send_str(request),
            Backend::Local(handler) => Ok(handler.handle(request)),
        }
    }
}

fn main() {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => match Config::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load config: {}", e);
                std::process::exit(1);
            }
        },
        None => Config::builder().log_level("warn").build(),
    };
    if let Some(address) = &args.address {
        config.listen_addr = address.clone();
    }
    if let Some(size) = args.max_message_size {
        config.max_message_size = size;
    }
    if let Some(ms) = args.idle_timeout_ms {
        config.idle_timeout = Some(Duration::from_millis(ms)).filter(|t| !t.is_zero());
    }

    if let Err(e) = memkv::logging::init(&config) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    let mut backend = if args.local {
        Backend::Local(ComputeHandler::with_storage(MemoryStorage::new()))
    } else {
        match Client::connect(ClientConfig::from_config(&config)) {
            Ok(client) => Backend::Remote(client),
            Err(e) => {
                tracing::error!("Connection create error: {}", e);
                eprintln!("Connection create error: {}", e);
                std::process::exit(1);
            }
        }
    };

    match &args.command {
        Some(command) => match backend.send(&command.to_request()) {
            Ok(response) => println!("{}", response),
            Err(e) => {
                eprintln!("Send request error: {}", e);
                std::process::exit(1);
            }
        },
        None => {
            if let Err(e) = run_prompt(&mut backend) {
                eprintln!("Arguments read error: {}", e);
                std::process::exit(1);
            }
        }
    }
}

/// Interactive prompt loop; ends on `exit`, EOF, or a closed connection
fn run_prompt(backend: &mut Backend) -> io::Result<()> {
    let allowed: String = ('!'..='~')
        .chain(std::iter::once('№'))
        .filter(|c| is_allowed_symbol(*c) && !c.is_alphanumeric())
        .collect();

    println!("\nSave/Get/Delete value by key");
    println!("key/value available symbols: letters, digits and {}", allowed);

    let stdin = io::stdin();
    let mut lines = stdin.lock();
    loop {
        println!("\nCommands: set key value || get key || delete key || exit");
        print!("Your command: ");
        io::stdout().flush()?;

        let mut line = String::new();
        if lines.read_line(&mut line)? == 0 {
            return Ok(());
        }
        if line.trim() == "exit" {
            return Ok(());
        }

        match backend.send(&line) {
            Ok(response) if response.is_empty() => {
                println!("Connection closed by server");
                return Ok(());
            }
            Ok(response) => println!("Response: {}", response),
            Err(KvError::Io(e))
                if matches!(e.kind(), ErrorKind::BrokenPipe | ErrorKind::ConnectionReset) =>
            {
                tracing::error!("Connection was closed: {}", e);
                println!("Connection was closed");
                return Ok(());
            }
            Err(e) => {
                tracing::error!("Send client request error: {}", e);
                println!("Send client request error: {}", e);
            }
        }
    }
}
