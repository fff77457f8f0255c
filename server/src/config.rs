use std::time::Duration;

use clap::Parser;

pub const DEFAULT_BIND: &str = "127.0.0.1:8000";

#[derive(Debug, Clone, Parser)]
#[command(
    name = "canvas-server",
    about = "Shared canvas server with WebSocket and long-poll transports",
    version
)]
pub struct Config {
    /// Address to listen on
    #[arg(long, env = "CANVAS_BIND", default_value = DEFAULT_BIND)]
    pub bind: String,

    /// Seconds a `GET /poll` may stay suspended before answering 204
    #[arg(long, env = "CANVAS_POLL_TIMEOUT_SECS", default_value_t = 30)]
    pub poll_timeout_secs: u64,

    /// Capacity of the queue in front of the server task
    #[arg(long, env = "CANVAS_COMMAND_BUFFER", default_value_t = 64)]
    pub command_buffer: usize,

    /// Outbound frames buffered per WebSocket peer before frames are dropped
    #[arg(long, env = "CANVAS_PEER_BUFFER", default_value_t = 256)]
    pub peer_buffer: usize,
}

impl Config {
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.into(),
            poll_timeout_secs: 30,
            command_buffer: 64,
            peer_buffer: 256,
        }
    }
}
