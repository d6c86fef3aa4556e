//! Client configuration.

use std::time::Duration;

/// Fixed delay before every reconnect attempt.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Connection configuration.
///
/// The retry delay is constant: there is no growth between attempts, no
/// jitter and no attempt cap. The client retries until it is closed.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Delay between a failure and the next resolve attempt.
    pub retry_delay: Duration,
    /// Upper bound on a single connect attempt. `None` waits for the OS.
    pub connect_timeout: Option<Duration>,
    /// Set `TCP_NODELAY` on every new socket.
    pub nodelay: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            retry_delay: DEFAULT_RETRY_DELAY,
            connect_timeout: None,
            nodelay: true,
        }
    }
}

impl ClientConfig {
    /// Set the retry delay.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Set the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Remove the connect timeout.
    pub fn without_connect_timeout(mut self) -> Self {
        self.connect_timeout = None;
        self
    }

    /// Enable or disable `TCP_NODELAY`.
    pub fn with_nodelay(mut self, enabled: bool) -> Self {
        self.nodelay = enabled;
        self
    }
}
