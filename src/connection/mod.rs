//! Connection management for the exchanger.
//!
//! This module provides:
//! - Per-caller-thread connection slots with a bounded connect budget
//! - Delayed background reconnects after a failed open
//! - Configuration for retries, timeouts, and reconnect delay
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tcp_exchanger::connection::{ConnectionHolder, ExchangerConfig, PeerAddr, TcpConnector};
//!
//! let config = ExchangerConfig::default()
//!     .with_max_connect_attempts(3)
//!     .with_reconnect_interval(Duration::from_secs(1));
//!
//! let holder = Arc::new(ConnectionHolder::new(
//!     PeerAddr::new("127.0.0.1", 7000),
//!     config,
//!     TcpConnector,
//! ));
//!
//! // Opens a connection for this thread if it has none.
//! if holder.check_socket() {
//!     let (_reader, _writer) = holder.streams().unwrap();
//! }
//! ```

mod config;
mod connector;
mod holder;
mod reconnect;
mod state;

pub use config::{
    DEFAULT_MAX_CONNECT_ATTEMPTS, DEFAULT_MAX_SEND_ATTEMPTS, DEFAULT_RECONNECT_INTERVAL,
    DEFAULT_TIMEOUT, ExchangerConfig,
};
pub use connector::{Channel, Connector, PeerAddr, TcpChannel, TcpConnector};
pub use holder::ConnectionHolder;
pub use reconnect::Reconnector;
pub use state::{ConnectionState, ConnectionStats};
