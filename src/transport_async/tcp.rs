//! Background execution of [`TcpExchanger::send`].

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use tokio::task::JoinHandle;
use tracing::error;

use crate::connection::Connector;
use crate::transport::TcpExchanger;

/// Resolves to the response of a [`send`](TcpExchanger::send) running on the
/// blocking pool.
///
/// Dropping the future does not stop the exchange already in flight.
#[derive(Debug)]
pub struct SendFuture {
    handle: JoinHandle<Bytes>,
}

impl Future for SendFuture {
    type Output = Bytes;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Bytes> {
        match Pin::new(&mut self.handle).poll(cx) {
            Poll::Ready(Ok(response)) => Poll::Ready(response),
            Poll::Ready(Err(e)) => {
                error!(error = %e, "Send task failed");
                Poll::Ready(Bytes::new())
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<C: Connector> TcpExchanger<C> {
    /// Run [`send`](TcpExchanger::send) on Tokio's blocking pool.
    ///
    /// Must be called from within a Tokio runtime. The exchange uses the
    /// connection of the pool thread it lands on.
    pub fn send_future(&self, request: impl Into<Bytes>) -> SendFuture {
        let exchanger = self.clone();
        let request = request.into();
        SendFuture {
            handle: tokio::task::spawn_blocking(move || exchanger.send(&request)),
        }
    }
}
