//! Opening connections to the peer.
//!
//! [`Connector`] and [`Channel`] are the seam between connection management
//! and the socket. [`TcpConnector`] is the real implementation.

use std::fmt;
use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};

use socket2::{Domain, Protocol, SockAddr, Socket, Type};

use super::config::ExchangerConfig;

/// Host and port of the peer, fixed for the lifetime of an exchanger.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PeerAddr {
    host: String,
    port: u16,
}

impl PeerAddr {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Resolve the host to socket addresses.
    pub fn resolve(&self) -> io::Result<Vec<SocketAddr>> {
        Ok((self.host.as_str(), self.port).to_socket_addrs()?.collect())
    }
}

impl From<SocketAddr> for PeerAddr {
    fn from(addr: SocketAddr) -> Self {
        Self::new(addr.ip().to_string(), addr.port())
    }
}

impl<H: Into<String>> From<(H, u16)> for PeerAddr {
    fn from((host, port): (H, u16)) -> Self {
        Self::new(host, port)
    }
}

impl fmt::Display for PeerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// An open connection to the peer.
pub trait Channel: Send + 'static {
    type Reader: Read;
    type Writer: Write;

    /// Acquire fresh read and write handles. Dropping them releases them.
    fn streams(&self) -> io::Result<(Self::Reader, Self::Writer)>;

    /// Check if [`close`](Channel::close) has been called.
    fn is_closed(&self) -> bool;

    /// Shut the connection down in both directions.
    fn close(&mut self) -> io::Result<()>;
}

/// Opens [`Channel`]s to a peer.
pub trait Connector: Send + Sync + 'static {
    type Channel: Channel;

    fn connect(&self, peer: &PeerAddr, config: &ExchangerConfig) -> io::Result<Self::Channel>;
}

/// Connects over TCP with keep-alive off, address reuse on, and the configured
/// read timeout.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

impl TcpConnector {
    fn connect_addr(addr: SocketAddr, config: &ExchangerConfig) -> io::Result<TcpStream> {
        let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
        socket.set_keepalive(false)?;
        socket.set_reuse_address(true)?;

        let target = SockAddr::from(addr);
        match config.connect_timeout {
            Some(timeout) => socket.connect_timeout(&target, timeout)?,
            None => socket.connect(&target)?,
        }

        // A zero timeout means "block forever" here, as it does for SO_RCVTIMEO.
        let read_timeout = Some(config.timeout).filter(|t| !t.is_zero());
        socket.set_read_timeout(read_timeout)?;

        Ok(socket.into())
    }
}

impl Connector for TcpConnector {
    type Channel = TcpChannel;

    fn connect(&self, peer: &PeerAddr, config: &ExchangerConfig) -> io::Result<TcpChannel> {
        let mut last_err = None;
        for addr in peer.resolve()? {
            match Self::connect_addr(addr, config) {
                Ok(stream) => return Ok(TcpChannel::new(stream)),
                Err(e) => last_err = Some(e),
            }
        }

        Err(last_err.unwrap_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("could not resolve {peer}"),
            )
        }))
    }
}

/// A TCP connection held by the exchanger.
#[derive(Debug)]
pub struct TcpChannel {
    stream: TcpStream,
    closed: bool,
}

impl TcpChannel {
    pub fn new(stream: TcpStream) -> Self {
        Self {
            stream,
            closed: false,
        }
    }
}

impl Channel for TcpChannel {
    type Reader = TcpStream;
    type Writer = TcpStream;

    fn streams(&self) -> io::Result<(TcpStream, TcpStream)> {
        Ok((self.stream.try_clone()?, self.stream.try_clone()?))
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    fn close(&mut self) -> io::Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.stream.shutdown(Shutdown::Both)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::time::Duration;

    #[test]
    fn test_peer_addr() {
        let peer = PeerAddr::new("localhost", 4000);
        assert_eq!(peer.host(), "localhost");
        assert_eq!(peer.port(), 4000);
        assert_eq!(peer.to_string(), "localhost:4000");

        let addr: SocketAddr = "127.0.0.1:30490".parse().unwrap();
        assert_eq!(PeerAddr::from(addr), PeerAddr::new("127.0.0.1", 30490));
        assert_eq!(PeerAddr::from(("10.0.0.1", 1)), PeerAddr::new("10.0.0.1", 1));
    }

    #[test]
    fn test_tcp_connector_applies_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let peer = PeerAddr::from(listener.local_addr().unwrap());
        // Whole seconds survive the kernel's rounding of SO_RCVTIMEO to ticks.
        let config = ExchangerConfig::default().with_timeout(Duration::from_secs(1));

        let mut channel = TcpConnector.connect(&peer, &config).unwrap();
        assert_eq!(channel.stream.read_timeout().unwrap(), Some(Duration::from_secs(1)));
        assert_eq!(channel.stream.peer_addr().unwrap(), listener.local_addr().unwrap());

        assert!(!channel.is_closed());
        channel.close().unwrap();
        assert!(channel.is_closed());
        // Second close is a no-op.
        channel.close().unwrap();
    }

    #[test]
    fn test_tcp_connector_refused() {
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };
        let result = TcpConnector.connect(&PeerAddr::from(addr), &ExchangerConfig::default());
        assert!(result.is_err());
    }
}
