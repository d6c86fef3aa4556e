//! Thread-safe TSDB client handle.

use std::fmt::{self, Display};
use std::sync::{Mutex, PoisonError};

use bytes::Bytes;
use tokio::runtime::{self, Runtime};
use tracing::debug;

use crate::codec::encode_point;
use crate::connection::{
    ClientConfig, Command, CommandSender, ConnectionStats, EventLoop, command_channel,
};
use crate::error::{Result, TsdbError};
use crate::point::DataPoint;
use crate::transport::{TcpTransport, Transport};
use crate::types::{Endpoint, Tags};

/// A resilient `put` protocol client.
///
/// The client keeps one TCP connection to a fixed endpoint, reconnects after
/// a fixed delay whenever resolution, connect or a write fails, and buffers
/// points submitted while disconnected. Points are written one at a time in
/// submission order.
///
/// All methods except [`run`](Self::run) only post work to the event loop and
/// return immediately, so the client can be shared across threads behind an
/// `Arc`. `run` drives the event loop on the calling thread.
///
/// # Example
///
/// ```no_run
/// use simpletsdb::{Tags, TsdbClient};
/// use std::sync::Arc;
/// use std::thread;
///
/// let client = Arc::new(TsdbClient::new("localhost", 4242)?);
/// let worker = {
///     let client = Arc::clone(&client);
///     thread::spawn(move || client.run())
/// };
///
/// let mut tags = Tags::new();
/// tags.insert("host".to_string(), "web01".to_string());
/// client.add_point("sys.cpu.user", 1_700_000_000.0, 42.5, Some(&tags));
///
/// client.close();
/// let stats = worker.join().unwrap()?;
/// println!("sent {} points", stats.messages_sent);
/// # Ok::<(), simpletsdb::TsdbError>(())
/// ```
///
/// # Delivery
///
/// There is no acknowledgment from the server. A point counts as sent once
/// the socket accepted all of its bytes. [`close`](Self::close) does not flush:
/// points still queued when it is processed are discarded.
pub struct TsdbClient<T: Transport = TcpTransport> {
    endpoint: Endpoint,
    commands: CommandSender,
    event_loop: Mutex<Option<EventLoop<T>>>,
    runtime: Runtime,
}

impl TsdbClient {
    /// Create a client for `host:port` with the default configuration.
    ///
    /// The first connection attempt starts as soon as [`run`](Self::run) is
    /// entered; points may be added before that.
    pub fn new(host: impl Into<String>, port: u16) -> Result<Self> {
        Self::with_config(host, port, ClientConfig::default())
    }

    /// Create a client for `host:port` with the given configuration.
    pub fn with_config(host: impl Into<String>, port: u16, config: ClientConfig) -> Result<Self> {
        let transport = TcpTransport::new(&config);
        Self::with_transport(Endpoint::new(host, port), config, transport)
    }
}

impl<T: Transport> TsdbClient<T> {
    /// Create a client that talks to `endpoint` through a custom transport.
    pub fn with_transport(endpoint: Endpoint, config: ClientConfig, transport: T) -> Result<Self> {
        let runtime = runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let (commands, receiver) = command_channel();
        let event_loop = EventLoop::new(endpoint.clone(), transport, config.retry_delay, receiver);

        Ok(Self {
            endpoint,
            commands,
            event_loop: Mutex::new(Some(event_loop)),
            runtime,
        })
    }

    /// Get the endpoint this client writes to.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Run the event loop on the calling thread.
    ///
    /// Blocks until [`close`](Self::close) has been processed and any write
    /// in flight at that moment has completed, then returns the connection
    /// statistics. Must not be called from inside a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`TsdbError::AlreadyRunning`] if the loop was already taken by
    /// an earlier call.
    pub fn run(&self) -> Result<ConnectionStats> {
        let event_loop = self
            .event_loop
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(TsdbError::AlreadyRunning)?;

        Ok(self.runtime.block_on(event_loop.run()))
    }

    /// Queue a data point for delivery.
    ///
    /// Never blocks and never reports connectivity errors. The timestamp is
    /// truncated to whole seconds.
    pub fn add_point<V: Display>(
        &self,
        metric: &str,
        timestamp: f64,
        value: V,
        tags: Option<&Tags>,
    ) {
        self.write(encode_point(metric, timestamp, value, tags));
    }

    /// Queue an owned [`DataPoint`] for delivery.
    pub fn send_point(&self, point: &DataPoint) {
        self.write(point.to_bytes());
    }

    /// Request shutdown.
    ///
    /// Returns immediately. The event loop closes the socket, cancels any
    /// pending retry and discards queued points, after which `run` returns.
    pub fn close(&self) {
        if self.commands.send(Command::Close).is_err() {
            debug!(endpoint = %self.endpoint, "close requested after event loop exited");
        }
    }

    fn write(&self, data: Bytes) {
        if self.commands.send(Command::Write(data)).is_err() {
            debug!(endpoint = %self.endpoint, "dropping point: event loop has exited");
        }
    }
}

impl<T: Transport> fmt::Debug for TsdbClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TsdbClient")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}
