//! TCP transport on top of `tokio::net`.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpStream, lookup_host};
use tokio::time::timeout;
use tracing::debug;

use crate::connection::ClientConfig;
use crate::types::Endpoint;

use super::{Transport, TransportFuture};

/// Plain TCP transport.
#[derive(Debug, Clone)]
pub struct TcpTransport {
    connect_timeout: Option<Duration>,
    nodelay: bool,
}

impl TcpTransport {
    /// Create a transport using the socket options from `config`.
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            connect_timeout: config.connect_timeout,
            nodelay: config.nodelay,
        }
    }
}

impl Default for TcpTransport {
    fn default() -> Self {
        Self::new(&ClientConfig::default())
    }
}

impl Transport for TcpTransport {
    type Stream = TcpStream;

    fn resolve(&self, endpoint: &Endpoint) -> TransportFuture<Vec<SocketAddr>> {
        let target = (endpoint.host().to_string(), endpoint.port());
        Box::pin(async move { Ok(lookup_host(target).await?.collect()) })
    }

    fn connect(&self, addrs: Vec<SocketAddr>) -> TransportFuture<(TcpStream, SocketAddr)> {
        let connect_timeout = self.connect_timeout;
        let nodelay = self.nodelay;
        Box::pin(async move {
            let mut last_error = None;
            for addr in addrs {
                match connect_one(addr, connect_timeout).await {
                    Ok(stream) => {
                        if nodelay {
                            stream.set_nodelay(true)?;
                        }
                        return Ok((stream, addr));
                    }
                    Err(e) => {
                        debug!(%addr, error = %e, "connect attempt failed");
                        last_error = Some(e);
                    }
                }
            }
            Err(last_error.unwrap_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidInput, "No address provided")
            }))
        })
    }

    fn write(&self, mut stream: TcpStream, data: Bytes) -> TransportFuture<TcpStream> {
        Box::pin(async move {
            stream.write_all(&data).await?;
            Ok(stream)
        })
    }
}

async fn connect_one(addr: SocketAddr, limit: Option<Duration>) -> io::Result<TcpStream> {
    match limit {
        Some(limit) => timeout(limit, TcpStream::connect(addr))
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "Connection timeout"))?,
        None => TcpStream::connect(addr).await,
    }
}
