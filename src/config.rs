#![cfg(feature = "web")]

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Runtime configuration of the dashboard server
///
/// Every option can also be given through the environment variable shown
/// in `--help`.
#[derive(Clone, Debug, Parser)]
#[command(name = "website", about = "RPA workflow dashboard")]
pub struct Config {
    /// Address to listen on
    #[arg(long, env = "RPA_HOST", default_value = "127.0.0.1")]
    pub host: String,

    #[arg(long, env = "RPA_PORT", default_value_t = 3000)]
    pub port: u16,

    /// Base URL of the RPA status service
    #[arg(long, env = "RPA_BACKEND_URL", default_value = "http://localhost:8080")]
    pub backend_url: String,

    /// File the session token is persisted to
    #[arg(long, env = "RPA_TOKEN_FILE", default_value = "database/token.json")]
    pub token_file: PathBuf,

    /// Timeout of one status-update call, in seconds; unset waits indefinitely
    #[arg(long, env = "RPA_REQUEST_TIMEOUT_SECS")]
    pub request_timeout_secs: Option<u64>,

    /// Concurrent status-update calls; 1 processes rows strictly one at a time
    #[arg(long, env = "RPA_WORKERS", default_value_t = 1)]
    pub workers: usize,
}

impl Config {
    pub fn bind_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}
