//! Non-blocking entry point for the exchanger, using Tokio.
//!
//! The exchange itself stays blocking; it runs on Tokio's blocking pool so
//! the calling task is never stalled.
//!
//! # Example
//!
//! ```no_run
//! use tcp_exchanger::TcpExchanger;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let exchanger = TcpExchanger::new(("127.0.0.1", 7000));
//!
//!     let response = exchanger.send_future(&b"\x00\x02hi"[..]).await;
//!     println!("Response: {:?}", response);
//! }
//! ```

mod tcp;

pub use tcp::SendFuture;
