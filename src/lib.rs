//! Reconnecting request/response TCP client built on std::net.
//!
//! This crate sends opaque binary requests to a fixed peer over a persistent
//! TCP connection and reads back length-prefixed responses.
//!
//! # Features
//!
//! - One connection per caller thread, opened on demand
//! - Bounded send retries on a fresh connection after I/O failures
//! - Bounded connect attempts with delayed background reconnects
//! - Request/response dumps as text and hex through `tracing`
//! - Optional non-blocking entry point on Tokio (`tokio` feature)
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use tcp_exchanger::TcpExchanger;
//!
//! let exchanger = TcpExchanger::builder(("127.0.0.1", 7000))
//!     .max_send_attempts(3)
//!     .timeout(Duration::from_secs(2))
//!     .build();
//!
//! // The request carries its own 2-byte length prefix.
//! let response = exchanger.send(b"\x00\x04ping");
//! if response.is_empty() {
//!     eprintln!("peer unavailable");
//! }
//! ```
//!
//! # Wire Format
//!
//! Responses are framed by a 2-byte big-endian length:
//!
//! ```text
//! +--------+--------+--------+-----
//! | len hi | len lo |  body (len bytes) ...
//! +--------+--------+--------+-----
//! ```
//!
//! The whole frame, prefix included, is returned to the caller.

pub mod codec;
pub mod connection;
pub mod error;
pub mod hex;
pub mod transport;

// Async modules (require tokio feature)
#[cfg(feature = "tokio")]
pub mod transport_async;

#[cfg(test)]
pub(crate) mod test_util;

// Re-export commonly used types at the crate root
pub use codec::{MAX_FRAME_SIZE, encode_frame, frame_length};
pub use connection::{ConnectionState, ConnectionStats, ExchangerConfig, PeerAddr};
pub use error::{ExchangeError, Result};
pub use transport::{ExchangerBuilder, TcpExchanger};

#[cfg(feature = "tokio")]
pub use transport_async::SendFuture;
