//! Exchanger configuration.

use std::time::Duration;

/// Default attempt budget for one logical send.
pub const DEFAULT_MAX_SEND_ATTEMPTS: u32 = 5;

/// Default budget of consecutive failed opens.
pub const DEFAULT_MAX_CONNECT_ATTEMPTS: u32 = 5;

/// Default delay before a background reconnect.
pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_secs(5);

/// Default socket read timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5_000);

/// Configuration for a [`TcpExchanger`](crate::TcpExchanger).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangerConfig {
    /// Attempts spent on one logical send before giving up.
    pub max_send_attempts: u32,
    /// Consecutive failed opens tolerated before opens short-circuit.
    pub max_connect_attempts: u32,
    /// Delay between close and re-open during a background reconnect.
    pub reconnect_interval: Duration,
    /// Socket read timeout.
    pub timeout: Duration,
    /// Bound on a single connect. `None` leaves it to the OS.
    pub connect_timeout: Option<Duration>,
}

impl Default for ExchangerConfig {
    fn default() -> Self {
        Self {
            max_send_attempts: DEFAULT_MAX_SEND_ATTEMPTS,
            max_connect_attempts: DEFAULT_MAX_CONNECT_ATTEMPTS,
            reconnect_interval: DEFAULT_RECONNECT_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: None,
        }
    }
}

impl ExchangerConfig {
    /// Set the send attempt budget.
    pub fn with_max_send_attempts(mut self, count: u32) -> Self {
        self.max_send_attempts = count;
        self
    }

    /// Set the connect attempt budget.
    pub fn with_max_connect_attempts(mut self, count: u32) -> Self {
        self.max_connect_attempts = count;
        self
    }

    /// Set the reconnect delay.
    pub fn with_reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval = interval;
        self
    }

    /// Set the read timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Check if another send attempt fits the budget (`attempt` is 1-based).
    pub fn should_retry_send(&self, attempt: u32) -> bool {
        attempt < self.max_send_attempts
    }
}
