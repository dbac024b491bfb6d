//! In-memory peer for exercising connection management without sockets.

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tracing::Level;

use crate::connection::{Channel, Connector, ExchangerConfig, PeerAddr};

/// Route log output to the test harness. Safe to call from every test.
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(Level::DEBUG)
        .try_init()
        .ok();
}

/// Scripted peer shared by every channel a [`MockConnector`] opens.
///
/// Reads pop one queued chunk each; an empty queue reads as end of stream.
#[derive(Debug, Default)]
pub struct MockPeer {
    refuse: AtomicBool,
    fail_writes: AtomicBool,
    chunks: Mutex<VecDeque<Vec<u8>>>,
    written: Mutex<Vec<u8>>,
    connects: Mutex<Vec<Instant>>,
    writes: AtomicUsize,
    open_streams: AtomicUsize,
    closed_channels: AtomicUsize,
}

impl MockPeer {
    pub fn new() -> Arc<Self> {
        init_logging();
        Arc::new(Self::default())
    }

    pub fn connector(self: &Arc<Self>) -> MockConnector {
        MockConnector(self.clone())
    }

    pub fn refuse(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn push_chunk(&self, chunk: impl Into<Vec<u8>>) {
        self.chunks.lock().unwrap().push_back(chunk.into());
    }

    pub fn written(&self) -> Vec<u8> {
        self.written.lock().unwrap().clone()
    }

    pub fn connect_count(&self) -> usize {
        self.connects.lock().unwrap().len()
    }

    pub fn connect_times(&self) -> Vec<Instant> {
        self.connects.lock().unwrap().clone()
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn open_streams(&self) -> usize {
        self.open_streams.load(Ordering::SeqCst)
    }

    pub fn closed_channels(&self) -> usize {
        self.closed_channels.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct MockConnector(Arc<MockPeer>);

impl Connector for MockConnector {
    type Channel = MockChannel;

    fn connect(&self, _peer: &PeerAddr, _config: &ExchangerConfig) -> io::Result<MockChannel> {
        self.0.connects.lock().unwrap().push(Instant::now());
        if self.0.refuse.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::ConnectionRefused, "refused"));
        }
        Ok(MockChannel {
            peer: self.0.clone(),
            closed: false,
        })
    }
}

#[derive(Debug)]
pub struct MockChannel {
    peer: Arc<MockPeer>,
    closed: bool,
}

impl Channel for MockChannel {
    type Reader = MockStream;
    type Writer = MockStream;

    fn streams(&self) -> io::Result<(MockStream, MockStream)> {
        Ok((MockStream::open(&self.peer), MockStream::open(&self.peer)))
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    fn close(&mut self) -> io::Result<()> {
        self.closed = true;
        self.peer.closed_channels.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// One read or write handle; counted as open until dropped.
#[derive(Debug)]
pub struct MockStream {
    peer: Arc<MockPeer>,
}

impl MockStream {
    fn open(peer: &Arc<MockPeer>) -> Self {
        peer.open_streams.fetch_add(1, Ordering::SeqCst);
        Self { peer: peer.clone() }
    }
}

impl Read for MockStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut chunks = self.peer.chunks.lock().unwrap();
        let Some(mut chunk) = chunks.pop_front() else {
            return Ok(0);
        };
        let n = chunk.len().min(buf.len());
        buf[..n].copy_from_slice(&chunk[..n]);
        if n < chunk.len() {
            chunks.push_front(chunk.split_off(n));
        }
        Ok(n)
    }
}

impl Write for MockStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.peer.writes.fetch_add(1, Ordering::SeqCst);
        if self.peer.fail_writes.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "broken pipe"));
        }
        self.peer.written.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for MockStream {
    fn drop(&mut self) {
        self.peer.open_streams.fetch_sub(1, Ordering::SeqCst);
    }
}
