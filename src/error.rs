//! Error types for request/response exchanges.

use std::io;
use thiserror::Error;

/// Errors that can occur while exchanging frames with the peer.
///
/// These never escape [`TcpExchanger::send`](crate::TcpExchanger::send), which
/// reports failure as an empty response. They drive its retry decisions.
#[derive(Error, Debug)]
pub enum ExchangeError {
    /// I/O error during network operations, including read timeouts.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Peer closed the connection before a complete frame arrived.
    #[error("Connection closed after {received} bytes")]
    ConnectionClosed { received: usize },

    /// No usable connection is held for the calling thread.
    #[error("Not connected")]
    NotConnected,

    /// Announced frame does not fit the response buffer.
    #[error("Frame too large: {size} bytes exceeds maximum of {max} bytes")]
    FrameTooLarge { size: usize, max: usize },
}

/// Result type alias for exchange operations.
pub type Result<T> = std::result::Result<T, ExchangeError>;

impl ExchangeError {
    /// Check if retrying on a fresh connection may succeed.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::FrameTooLarge { .. })
    }

    /// Check if this error is a socket read/write timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::Io(e) if e.kind() == io::ErrorKind::WouldBlock
                || e.kind() == io::ErrorKind::TimedOut
        )
    }
}
