//! Command line and environment configuration

use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;

pub const DEFAULT_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_MATCH_INTERVAL_MS: u64 = 1000;

#[derive(Debug, Clone, Parser)]
#[command(name = "strangers-signaling")]
#[command(about = "Matchmaking and WebRTC signaling relay for one-on-one video calls")]
pub struct ServerConfig {
    /// WebSocket listen address
    #[arg(long, env = "STRANGERS_ADDR", default_value = DEFAULT_ADDR)]
    pub addr: SocketAddr,

    /// Milliseconds between matchmaker passes over the waiting queue
    #[arg(long, env = "STRANGERS_MATCH_INTERVAL_MS", default_value_t = DEFAULT_MATCH_INTERVAL_MS)]
    pub match_interval_ms: u64,
}

impl ServerConfig {
    pub fn match_interval(&self) -> Duration {
        Duration::from_millis(self.match_interval_ms.max(1))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            match_interval_ms: DEFAULT_MATCH_INTERVAL_MS,
        }
    }
}
