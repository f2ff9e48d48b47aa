use log::LevelFilter;
use std::time::Duration;

pub const DEFAULT_TTL: u8 = 64;
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);
/// Anything faster is flood pinging.
pub const MIN_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, PartialEq)]
pub struct PingOptions {
    /// Destination as given on the command line.
    pub target: String,
    pub ttl: u8,
    pub interval: Duration,
    /// How long to wait for the reply to each request.
    pub timeout: Duration,
    /// Stop after this many requests; `None` runs until interrupted.
    pub count: Option<u64>,
    pub interface: Option<String>,
    pub log_level: Option<LevelFilter>,
}

impl Default for PingOptions {
    fn default() -> Self {
        PingOptions {
            target: String::new(),
            ttl: DEFAULT_TTL,
            interval: DEFAULT_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
            count: None,
            interface: None,
            log_level: None,
        }
    }
}
