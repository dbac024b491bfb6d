//! Connection state and statistics.

use std::time::{Duration, Instant};

/// Usability of one caller's connection, as last observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// Never opened, or closed since.
    #[default]
    Disconnected,
    /// Last open succeeded.
    Connected,
    /// Last open failed.
    Failed,
    /// Last open failed and a background reconnect is pending.
    Reconnecting,
}

impl ConnectionState {
    /// Check if the connection may be used for a request.
    pub fn is_connected(&self) -> bool {
        *self == ConnectionState::Connected
    }
}

/// Exchanger statistics, aggregated across caller threads.
#[derive(Debug, Clone, Default)]
pub struct ConnectionStats {
    /// Number of successful opens.
    pub connect_count: u64,
    /// Number of failed opens.
    pub failure_count: u64,
    /// Number of background reconnects scheduled.
    pub reconnect_count: u64,
    /// Number of requests written.
    pub requests_sent: u64,
    /// Number of responses read.
    pub responses_received: u64,
    /// Total request bytes written.
    pub bytes_sent: u64,
    /// Total response bytes read.
    pub bytes_received: u64,
    /// Time of last successful open.
    pub last_connected: Option<Instant>,
    /// Time of last close.
    pub last_disconnected: Option<Instant>,
    /// Time of last failed open.
    pub last_error: Option<Instant>,
}

impl ConnectionStats {
    /// Record a successful open.
    pub fn record_connect(&mut self) {
        self.connect_count += 1;
        self.last_connected = Some(Instant::now());
    }

    /// Record a close.
    pub fn record_disconnect(&mut self) {
        self.last_disconnected = Some(Instant::now());
    }

    /// Record a failed open.
    pub fn record_failure(&mut self) {
        self.failure_count += 1;
        self.last_error = Some(Instant::now());
    }

    /// Record a scheduled reconnect.
    pub fn record_reconnect(&mut self) {
        self.reconnect_count += 1;
    }

    /// Record a request write.
    pub fn record_send(&mut self, bytes: usize) {
        self.requests_sent += 1;
        self.bytes_sent += bytes as u64;
    }

    /// Record a response read.
    pub fn record_receive(&mut self, bytes: usize) {
        self.responses_received += 1;
        self.bytes_received += bytes as u64;
    }

    /// Time since the last successful open.
    pub fn uptime(&self) -> Option<Duration> {
        self.last_connected.map(|t| t.elapsed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_state() {
        assert_eq!(ConnectionState::default(), ConnectionState::Disconnected);
        assert!(ConnectionState::Connected.is_connected());
        assert!(!ConnectionState::Disconnected.is_connected());
        assert!(!ConnectionState::Failed.is_connected());
        assert!(!ConnectionState::Reconnecting.is_connected());
    }

    #[test]
    fn test_connection_stats() {
        let mut stats = ConnectionStats::default();
        assert!(stats.uptime().is_none());

        stats.record_connect();
        assert_eq!(stats.connect_count, 1);
        assert!(stats.uptime().is_some());

        stats.record_send(4);
        stats.record_receive(7);
        assert_eq!(stats.requests_sent, 1);
        assert_eq!(stats.bytes_sent, 4);
        assert_eq!(stats.responses_received, 1);
        assert_eq!(stats.bytes_received, 7);

        stats.record_failure();
        stats.record_reconnect();
        assert_eq!(stats.failure_count, 1);
        assert_eq!(stats.reconnect_count, 1);
        assert!(stats.last_error.is_some());
    }
}
