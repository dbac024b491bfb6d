//! Request/response exchange over TCP.

use std::fmt;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tracing::{info, warn};

use crate::codec::{MAX_FRAME_SIZE, read_frame};
use crate::connection::{
    ConnectionHolder, ConnectionState, ConnectionStats, Connector, ExchangerConfig, PeerAddr,
    TcpConnector,
};
use crate::error::Result;
use crate::hex;

/// A reconnecting request/response client for one peer.
///
/// Each caller thread gets its own connection, opened on first use. The
/// constructing thread's connection is opened right away. Cloning is cheap
/// and clones share connections, counters and statistics.
///
/// [`send`](TcpExchanger::send) never fails loudly: an empty response means
/// the exchanger gave up.
pub struct TcpExchanger<C: Connector = TcpConnector> {
    holder: Arc<ConnectionHolder<C>>,
}

impl TcpExchanger {
    /// Create an exchanger with the default configuration.
    ///
    /// An unreachable peer is not an error; the exchanger starts out failed
    /// and reconnects in the background.
    pub fn new(peer: impl Into<PeerAddr>) -> Self {
        Self::with_config(peer, ExchangerConfig::default())
    }

    pub fn with_config(peer: impl Into<PeerAddr>, config: ExchangerConfig) -> Self {
        Self::with_connector(peer, config, TcpConnector)
    }

    pub fn builder(peer: impl Into<PeerAddr>) -> ExchangerBuilder {
        ExchangerBuilder::new(peer)
    }
}

impl<C: Connector> TcpExchanger<C> {
    /// Create an exchanger that opens connections through `connector`.
    pub fn with_connector(peer: impl Into<PeerAddr>, config: ExchangerConfig, connector: C) -> Self {
        let holder = Arc::new(ConnectionHolder::new(peer.into(), config, connector));
        holder.open();
        Self { holder }
    }

    /// Write `request` and return the framed response.
    ///
    /// The request must already carry its length prefix. Failed exchanges are
    /// retried on a fresh connection up to `max_send_attempts` times in total.
    /// Returns empty bytes if no connection can be made or the attempts run out.
    pub fn send(&self, request: &[u8]) -> Bytes {
        if request.is_empty() {
            warn!(peer = %self.peer(), "Refusing to send an empty request");
            return Bytes::new();
        }

        let mut attempt = 1;
        loop {
            if !self.holder.check_socket() {
                return Bytes::new();
            }

            let err = match self.exchange(request) {
                Ok(response) => return response,
                Err(e) => e,
            };
            self.holder.close();

            if !err.is_recoverable() {
                warn!(peer = %self.peer(), error = %err, "Giving up on request: [{}]", err);
                return Bytes::new();
            }

            warn!(
                peer = %self.peer(),
                attempt,
                timeout = err.is_timeout(),
                error = %err,
                "ATTEMPT: {} ({}). Error sending request to/processing response from: [{}]",
                attempt,
                self.peer(),
                err
            );
            if !self.config().should_retry_send(attempt) {
                return Bytes::new();
            }
            attempt += 1;
        }
    }

    /// One write-then-read on the calling thread's connection.
    ///
    /// The read and write handles are released when this returns.
    fn exchange(&self, request: &[u8]) -> Result<Bytes> {
        let (mut reader, mut writer) = self.holder.streams()?;

        info!("Request[String]: {}", String::from_utf8_lossy(request));
        info!("Request[HEX]: {}", hex::encode(request));
        writer.write_all(request)?;
        writer.flush()?;
        self.holder.record_send(request.len());

        let mut buffer = [0u8; MAX_FRAME_SIZE];
        let position = read_frame(&mut reader, &mut buffer)?;
        let answer = Bytes::copy_from_slice(&buffer[..position]);
        self.holder.record_receive(answer.len());

        info!("Response[String]: {}", String::from_utf8_lossy(&answer));
        info!("Response[HEX]: {}", hex::encode(&answer));
        Ok(answer)
    }

    /// Open a connection for the calling thread if none is held, then report
    /// whether it is usable.
    pub fn check_socket(&self) -> bool {
        self.holder.check_socket()
    }

    /// Check if the calling thread's last open succeeded.
    pub fn is_enabled(&self) -> bool {
        self.holder.is_enabled()
    }

    /// Check if the calling thread holds no open connection.
    pub fn is_closed(&self) -> bool {
        self.holder.is_closed()
    }

    /// State of the calling thread's connection.
    pub fn state(&self) -> ConnectionState {
        self.holder.state()
    }

    /// Close the calling thread's connection. The next send reopens it.
    pub fn close(&self) {
        self.holder.close();
    }

    pub fn peer(&self) -> &PeerAddr {
        self.holder.peer()
    }

    pub fn config(&self) -> &ExchangerConfig {
        self.holder.config()
    }

    pub fn stats(&self) -> ConnectionStats {
        self.holder.stats()
    }

    pub fn connect_attempts(&self) -> u32 {
        self.holder.connect_attempts()
    }

    pub fn reset_connect_attempts(&self) {
        self.holder.reset_connect_attempts();
    }

    /// Stop connecting: further opens short-circuit, pending reconnects are
    /// aborted and all connections are closed.
    pub fn shutdown(&self) {
        self.holder.shutdown();
    }
}

impl<C: Connector> Clone for TcpExchanger<C> {
    fn clone(&self) -> Self {
        Self {
            holder: self.holder.clone(),
        }
    }
}

impl<C: Connector> fmt::Display for TcpExchanger<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TcpExchanger{{host='{}', port={}}}",
            self.peer().host(),
            self.peer().port()
        )
    }
}

impl<C: Connector> fmt::Debug for TcpExchanger<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TcpExchanger")
            .field("peer", self.peer())
            .field("state", &self.state())
            .field("connect_attempts", &self.connect_attempts())
            .finish()
    }
}

/// Collects configuration, then connects on [`build`](ExchangerBuilder::build).
#[derive(Debug, Clone)]
pub struct ExchangerBuilder {
    peer: PeerAddr,
    config: ExchangerConfig,
}

impl ExchangerBuilder {
    pub fn new(peer: impl Into<PeerAddr>) -> Self {
        Self {
            peer: peer.into(),
            config: ExchangerConfig::default(),
        }
    }

    pub fn max_send_attempts(mut self, count: u32) -> Self {
        self.config.max_send_attempts = count;
        self
    }

    pub fn max_connect_attempts(mut self, count: u32) -> Self {
        self.config.max_connect_attempts = count;
        self
    }

    pub fn reconnect_interval(mut self, interval: Duration) -> Self {
        self.config.reconnect_interval = interval;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = Some(timeout);
        self
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: ExchangerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> TcpExchanger {
        TcpExchanger::with_config(self.peer, self.config)
    }

    pub fn build_with_connector<C: Connector>(self, connector: C) -> TcpExchanger<C> {
        TcpExchanger::with_connector(self.peer, self.config, connector)
    }
}
