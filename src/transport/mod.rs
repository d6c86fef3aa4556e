//! Transport layer for the TSDB client.
//!
//! The event loop only needs three asynchronous operations from a transport:
//! address lookup, connecting to the first reachable address, and writing one
//! whole message. [`TcpTransport`] implements them on top of `tokio::net`;
//! other implementations (TLS, in-memory test doubles) plug in through
//! [`Transport`].

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;

use bytes::Bytes;

use crate::types::Endpoint;

pub mod tcp;

pub use tcp::TcpTransport;

/// Boxed future returned by [`Transport`] operations.
pub type TransportFuture<T> = Pin<Box<dyn Future<Output = io::Result<T>> + Send>>;

/// Asynchronous byte transport driven by the event loop.
///
/// Futures are `'static` so the event loop can hold them across iterations
/// without borrowing the transport. Sockets are moved into [`write`] and
/// handed back on success; a failed write consumes the socket.
///
/// [`write`]: Transport::write
pub trait Transport: Send + 'static {
    /// Connected socket type.
    type Stream: Send + 'static;

    /// Resolve the endpoint to a list of candidate addresses.
    fn resolve(&self, endpoint: &Endpoint) -> TransportFuture<Vec<SocketAddr>>;

    /// Connect to the addresses in order, returning the first that accepts
    /// together with its address.
    fn connect(&self, addrs: Vec<SocketAddr>) -> TransportFuture<(Self::Stream, SocketAddr)>;

    /// Write all of `data` to the socket.
    fn write(&self, stream: Self::Stream, data: Bytes) -> TransportFuture<Self::Stream>;
}
