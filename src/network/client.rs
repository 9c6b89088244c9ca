//! TCP Client
//!
//! Sends one request per write and reads one response per read.

use std::io::{ErrorKind, Read, Write};
use std::net::TcpStream;
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::error::{KvError, Result};

/// Client connection settings
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server address (host:port)
    pub address: String,

    /// Size of the response buffer; a response filling it is rejected
    pub max_message_size: usize,

    /// Relative deadline armed before each request
    pub idle_timeout: Option<Duration>,

    /// Absolute deadline; takes priority over `idle_timeout`
    pub deadline: Option<Instant>,
}

impl ClientConfig {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            max_message_size: Config::default().max_message_size,
            idle_timeout: None,
            deadline: None,
        }
    }

    /// Derive client settings from a server config
    pub fn from_config(config: &Config) -> Self {
        Self {
            address: config.listen_addr.clone(),
            max_message_size: config.max_message_size,
            idle_timeout: config.idle_timeout,
            deadline: None,
        }
    }

    pub fn max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = Some(timeout);
        self
    }

    pub fn deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// A connected memkv client
pub struct Client {
    stream: TcpStream,
    config: ClientConfig,
}

impl Client {
    /// Open a connection to the configured address
    pub fn connect(config: ClientConfig) -> Result<Self> {
        if config.max_message_size == 0 {
            return Err(KvError::Config(
                "max_message_size must be greater than zero".to_string(),
            ));
        }

        let stream = TcpStream::connect(&config.address).map_err(|e| {
            KvError::Network(format!("failed to connect to {}: {}", config.address, e))
        })?;
        stream.set_nodelay(true)?;

        Ok(Self { stream, config })
    }

    /// Send a request and read the single response
    ///
    /// An empty response means the server closed the connection.
    pub fn send(&mut self, request: &[u8]) -> Result<Vec<u8>> {
        self.arm_deadline()?;

        if let Err(e) = self.stream.write_all(request) {
            tracing::error!(addr = %self.config.address, error = %e, "failed to send request");
            return Err(e.into());
        }

        let capacity = self.config.max_message_size;
        let mut response = vec![0; capacity];
        let count = loop {
            match self.stream.read(&mut response) {
                Ok(count) => break count,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::error!(addr = %self.config.address, error = %e, "failed to read response");
                    return Err(e.into());
                }
            }
        };

        if count >= capacity {
            tracing::error!(capacity, read = count, "response does not fit: small buffer size");
            return Err(KvError::BufferTooSmall {
                capacity,
                read: count,
            });
        }

        response.truncate(count);
        Ok(response)
    }

    /// Send a text request and decode the response as UTF-8
    pub fn send_str(&mut self, request: &str) -> Result<String> {
        let response = self.send(request.as_bytes())?;
        Ok(String::from_utf8_lossy(&response).into_owned())
    }

    fn arm_deadline(&self) -> Result<()> {
        let timeout = match (self.config.deadline, self.config.idle_timeout) {
            (Some(deadline), _) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    return Err(KvError::Deadline("connection deadline exceeded".to_string()));
                }
                Some(remaining)
            }
            (None, timeout) => timeout,
        };

        let timeout = timeout.filter(|t| !t.is_zero());
        self.stream
            .set_read_timeout(timeout)
            .map_err(|e| KvError::Deadline(format!("failed to set read timeout: {}", e)))?;
        self.stream
            .set_write_timeout(timeout)
            .map_err(|e| KvError::Deadline(format!("failed to set write timeout: {}", e)))?;
        Ok(())
    }
}
