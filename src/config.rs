use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use clap::Parser;

pub const DEFAULT_PORT: u16 = 7890;
pub const DEFAULT_SERVER_NAME: &str = "ChatServ";
pub const MAX_OUTBOUND_CAPACITY: u64 = 65_536;

/// Startup options for the chat server.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Address to listen on.
    #[arg(long, default_value = "0.0.0.0")]
    pub host: IpAddr,

    /// Port to listen on. Use 0 for an ephemeral port.
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Sender name for join, leave and roster announcements.
    /// Clients can never claim it.
    #[arg(long, default_value = DEFAULT_SERVER_NAME)]
    pub server_name: String,

    /// Lines queued per client before further broadcasts to it are dropped.
    #[arg(long, default_value_t = 64, value_parser = clap::value_parser!(u64).range(1..=MAX_OUTBOUND_CAPACITY))]
    pub outbound_capacity: u64,

    /// Give up on a client whose socket accepts no data for this long.
    #[arg(long, default_value_t = 5000)]
    pub write_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            server_name: DEFAULT_SERVER_NAME.to_string(),
            outbound_capacity: 64,
            write_timeout_ms: 5000,
        }
    }
}

impl Config {
    pub fn with_host(mut self, host: IpAddr) -> Self {
        self.host = host;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_server_name(mut self, name: impl Into<String>) -> Self {
        self.server_name = name.into();
        self
    }

    pub fn with_outbound_capacity(mut self, capacity: u64) -> Self {
        self.outbound_capacity = capacity.clamp(1, MAX_OUTBOUND_CAPACITY);
        self
    }

    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn outbound_capacity(&self) -> usize {
        self.outbound_capacity.clamp(1, MAX_OUTBOUND_CAPACITY) as usize
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }
}
