//! Configuration for memkv
//!
//! Centralized configuration with sensible defaults. The library never reads
//! the environment; binaries build a `Config` (optionally from a JSON file)
//! and pass it down explicitly.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{KvError, Result};

/// Main configuration for a memkv instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Max concurrent client connections (0 is treated as 1)
    pub max_connections: usize,

    /// Size of the per-connection read buffer; a read filling it is rejected
    pub max_message_size: usize,

    /// Read/write deadline re-armed before every read (`None` blocks forever)
    pub idle_timeout: Option<Duration>,

    // -------------------------------------------------------------------------
    // Logging Configuration
    // -------------------------------------------------------------------------
    /// Default filter directive, overridden by `RUST_LOG`
    pub log_level: String,

    /// Log file; stderr when unset
    pub log_output: Option<PathBuf>,

    pub log_format: LogFormat,
}

/// Log line format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:22222".to_string(),
            max_connections: 1,
            max_message_size: 4096,
            idle_timeout: None,
            log_level: "info".to_string(),
            log_output: None,
            log_format: LogFormat::Text,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Load a config from a JSON file
    ///
    /// ```json
    /// {
    ///   "engine": { "engine_type": "in_memory" },
    ///   "network": { "address": "127.0.0.1:22222", "max_connections": 4,
    ///                "max_message_size": 1024, "idle_timeout": "30s" },
    ///   "logging": { "level": "debug", "output": "memkv.log", "format": "json" }
    /// }
    /// ```
    ///
    /// The idle timeout is either a duration string (`"1m30s"`, `"250ms"`)
    /// in `idle_timeout` or a millisecond count in `idle_timeout_ms`, not
    /// both. The `engine` section is accepted for compatibility with older
    /// config files and has no effect: storage is always in memory.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path).map_err(|e| {
            KvError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&data)
    }

    /// Parse a config from JSON text; missing keys keep their defaults
    pub fn from_json(data: &str) -> Result<Self> {
        let file: FileConfig = serde_json::from_str(data)
            .map_err(|e| KvError::Config(format!("invalid config: {}", e)))?;

        let mut config = Config::default();
        let network = file.network;
        if let Some(address) = network.address {
            config.listen_addr = address;
        }
        if let Some(max_connections) = network.max_connections {
            config.max_connections = max_connections;
        }
        if let Some(size) = network.max_message_size {
            config.max_message_size = size;
        }
        match (network.idle_timeout, network.idle_timeout_ms) {
            (Some(_), Some(_)) => {
                return Err(KvError::Config(
                    "set only one of idle_timeout and idle_timeout_ms".to_string(),
                ));
            }
            (Some(text), None) => config.idle_timeout = non_zero(parse_duration(&text)?),
            (None, Some(ms)) => config.idle_timeout = non_zero(Duration::from_millis(ms)),
            (None, None) => {}
        }

        let logging = file.logging;
        if let Some(level) = logging.level {
            config.log_level = level;
        }
        config.log_output = logging.output;
        if let Some(format) = logging.format {
            config.log_format = format;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check values the server cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.listen_addr.trim().is_empty() {
            return Err(KvError::Config("listen address is empty".to_string()));
        }
        if self.max_message_size == 0 {
            return Err(KvError::Config(
                "max_message_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Admission capacity actually used by the server
    pub fn effective_max_connections(&self) -> usize {
        self.max_connections.max(1)
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the read buffer size (in bytes)
    pub fn max_message_size(mut self, size: usize) -> Self {
        self.config.max_message_size = size;
        self
    }

    /// Set the idle timeout; a zero duration disables it
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.idle_timeout = non_zero(timeout);
        self
    }

    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.log_level = level.into();
        self
    }

    pub fn log_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.log_output = Some(path.into());
        self
    }

    pub fn log_format(mut self, format: LogFormat) -> Self {
        self.config.log_format = format;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

fn non_zero(timeout: Duration) -> Option<Duration> {
    if timeout.is_zero() {
        None
    } else {
        Some(timeout)
    }
}

/// Parse a duration string such as `"300ms"`, `"1.5s"` or `"1h2m3s"`
///
/// Units are `ns`, `us` (or `µs`), `ms`, `s`, `m` and `h`. A bare `"0"` is
/// accepted; every other number needs a unit. Negative values are rejected.
pub fn parse_duration(text: &str) -> Result<Duration> {
    let invalid = || KvError::Config(format!("invalid duration: {:?}", text));

    let mut rest = text.trim();
    if rest == "0" {
        return Ok(Duration::ZERO);
    }
    if rest.is_empty() || rest.starts_with('-') {
        return Err(invalid());
    }
    rest = rest.strip_prefix('+').unwrap_or(rest);

    let mut total = 0f64;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(invalid)?;
        let value: f64 = rest[..number_len].parse().map_err(|_| invalid())?;
        rest = &rest[number_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let nanos_per_unit = match &rest[..unit_len] {
            "ns" => 1.0,
            "us" | "µs" | "μs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            _ => return Err(invalid()),
        };
        rest = &rest[unit_len..];

        total += value * nanos_per_unit;
    }

    if !total.is_finite() || total > u64::MAX as f64 {
        return Err(invalid());
    }
    Ok(Duration::from_nanos(total.round() as u64))
}

// =============================================================================
// File Format
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    engine: EngineSection,
    network: NetworkSection,
    logging: LoggingSection,
}

/// Accepted and ignored; there is only the in-memory engine
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct EngineSection {
    #[allow(dead_code)]
    engine_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct NetworkSection {
    address: Option<String>,
    max_connections: Option<usize>,
    max_message_size: Option<usize>,
    idle_timeout: Option<String>,
    idle_timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct LoggingSection {
    level: Option<String>,
    output: Option<PathBuf>,
    format: Option<LogFormat>,
}
