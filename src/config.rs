//! Configuration for the relay server and client.
//!
//! The server supports both command-line arguments and a TOML configuration
//! file; CLI arguments take precedence over config file values. The client
//! takes its target address as a single positional argument.

use crate::workload::Workload;
use clap::Parser;
use serde::Deserialize;
use std::net::Ipv4Addr;
use std::path::PathBuf;

/// TCP port the server binds and the client targets by default.
pub const DEFAULT_PORT: u16 = 1027;

/// Line buffer capacity in bytes, terminator included. Also the default
/// per-read chunk cap for the client.
pub const DEFAULT_MAX_LINE: usize = 256;

const DEFAULT_BACKLOG: u32 = 5;
const DEFAULT_MAX_CONNECTIONS: usize = 10000;

/// Command-line arguments for the relay server
#[derive(Parser, Debug)]
#[command(name = "relay-server")]
#[command(version = "0.1.0")]
#[command(about = "A concurrent TCP relay server", long_about = None)]
pub struct ServerCli {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Address to bind to (e.g., 0.0.0.0:1027)
    #[arg(short = 'l', long)]
    pub listen: Option<String>,

    /// Accept queue length for pending connections
    #[arg(short = 'b', long)]
    pub backlog: Option<u32>,

    /// Maximum number of concurrent connections
    #[arg(long)]
    pub max_connections: Option<usize>,

    /// Line buffer capacity in bytes, terminator included
    #[arg(long)]
    pub max_line: Option<usize>,

    /// Per-connection unit of work
    #[arg(short = 'w', long, value_enum)]
    pub workload: Option<Workload>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// Command-line arguments for the relay client
#[derive(Parser, Debug)]
#[command(name = "relay-client")]
#[command(version = "0.1.0")]
#[command(about = "An interactive duplex relay client", long_about = None)]
pub struct ClientArgs {
    /// Server IPv4 address in dotted-decimal form
    pub address: Ipv4Addr,

    /// Server TCP port
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Maximum bytes forwarded per read
    #[arg(long, default_value_t = DEFAULT_MAX_LINE)]
    pub max_chunk: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// TOML configuration file structure
#[derive(Debug, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub relay: RelaySection,
    #[serde(default)]
    pub logging: LoggingSection,
}

/// Listener-related configuration
#[derive(Debug, Deserialize)]
pub struct ServerSection {
    /// Address to bind to
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Accept queue length
    #[serde(default = "default_backlog")]
    pub backlog: u32,
    /// Maximum concurrent connections
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            backlog: default_backlog(),
            max_connections: default_max_connections(),
        }
    }
}

/// Stream-discipline configuration
#[derive(Debug, Deserialize)]
pub struct RelaySection {
    /// Line buffer capacity in bytes
    #[serde(default = "default_max_line")]
    pub max_line: usize,
    /// Per-connection unit of work
    #[serde(default = "default_workload")]
    pub workload: Workload,
}

impl Default for RelaySection {
    fn default() -> Self {
        Self {
            max_line: default_max_line(),
            workload: default_workload(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingSection {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_listen() -> String {
    format!("0.0.0.0:{DEFAULT_PORT}")
}

fn default_backlog() -> u32 {
    DEFAULT_BACKLOG
}

fn default_max_connections() -> usize {
    DEFAULT_MAX_CONNECTIONS
}

fn default_max_line() -> usize {
    DEFAULT_MAX_LINE
}

fn default_workload() -> Workload {
    Workload::Greeting
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Final resolved server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen: String,
    pub backlog: u32,
    pub max_connections: usize,
    pub max_line: usize,
    pub workload: Workload,
    pub log_level: String,
}

impl ServerConfig {
    /// Load configuration from CLI args and optional TOML file.
    /// CLI arguments take precedence over TOML file values.
    pub fn load() -> Result<Self, ConfigError> {
        Self::resolve(ServerCli::parse())
    }

    fn resolve(cli: ServerCli) -> Result<Self, ConfigError> {
        let toml_config = if let Some(ref config_path) = cli.config {
            let contents = std::fs::read_to_string(config_path)
                .map_err(|e| ConfigError::FileRead(config_path.clone(), e))?;
            toml::from_str(&contents)
                .map_err(|e| ConfigError::TomlParse(config_path.clone(), e))?
        } else {
            TomlConfig::default()
        };

        Ok(ServerConfig {
            listen: cli.listen.unwrap_or(toml_config.server.listen),
            backlog: cli.backlog.unwrap_or(toml_config.server.backlog),
            max_connections: cli
                .max_connections
                .unwrap_or(toml_config.server.max_connections),
            max_line: cli.max_line.unwrap_or(toml_config.relay.max_line),
            workload: cli.workload.unwrap_or(toml_config.relay.workload),
            log_level: if cli.log_level != "info" {
                cli.log_level
            } else {
                toml_config.logging.level
            },
        })
    }
}

/// Configuration loading errors
#[derive(Debug)]
pub enum ConfigError {
    FileRead(PathBuf, std::io::Error),
    TomlParse(PathBuf, toml::de::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::FileRead(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::TomlParse(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
