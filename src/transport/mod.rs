//! Transport layer: the blocking request/response exchanger.

pub mod tcp;

pub use tcp::{ExchangerBuilder, TcpExchanger};
