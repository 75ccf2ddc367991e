use std::time::Duration;

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub max_file_size: usize,
    pub poll_interval: Duration,
    pub ready_timeout: Duration,
    pub disable_clahe: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8787,
            max_file_size: 20 * 1024 * 1024,
            poll_interval: crate::runtime::DEFAULT_POLL_INTERVAL,
            ready_timeout: crate::runtime::DEFAULT_READY_TIMEOUT,
            disable_clahe: false,
        }
    }
}
