//! Resilient client for the OpenTSDB-style `put` line protocol.
//!
//! This crate streams time-series data points to a remote database over one
//! long-lived TCP connection. It survives connection loss: points submitted
//! while disconnected are buffered and written, in order, once the connection
//! is re-established.
//!
//! # Features
//!
//! - `put` line formatting with deterministic tag order
//! - Automatic reconnect with a fixed retry delay and no attempt limit
//! - Unbounded in-order buffering while disconnected
//! - Non-blocking, thread-safe `add_point` / `close`
//! - Pluggable [`Transport`] for custom sockets and tests
//!
//! # Example
//!
//! ```no_run
//! use simpletsdb::{Tags, TsdbClient};
//! use std::sync::Arc;
//! use std::thread;
//!
//! let client = Arc::new(TsdbClient::new("127.0.0.1", 4242)?);
//! let worker = {
//!     let client = Arc::clone(&client);
//!     thread::spawn(move || client.run())
//! };
//!
//! let mut tags = Tags::new();
//! tags.insert("foo".to_string(), "bar".to_string());
//! client.add_point("testmetric", 5.0, 555, Some(&tags));
//!
//! client.close();
//! worker.join().unwrap()?;
//! # Ok::<(), simpletsdb::TsdbError>(())
//! ```
//!
//! # Protocol Overview
//!
//! Each point is one newline-terminated text line:
//!
//! ```text
//! put <metric> <unix-seconds> <value> [<key>=<value> ]*\n
//! ```
//!
//! The timestamp is truncated to whole seconds. Nothing is escaped, and the
//! server sends no acknowledgment.
//!
//! # Connection Lifecycle
//!
//! ```text
//!   Disconnected ──► Resolving ──► Connecting ──► Connected
//!        ▲               │              │             │
//!        └── retry timer ◄──────────────┴─────────────┘
//!                         (any failure)
//! ```
//!
//! All transitions run on the single event loop thread that called
//! [`TsdbClient::run`]. Other threads only post commands to it.

pub mod client;
pub mod codec;
pub mod connection;
pub mod error;
pub mod point;
pub mod transport;
pub mod types;

// Re-export commonly used types at the crate root
pub use client::TsdbClient;
pub use codec::format_point;
pub use connection::{ClientConfig, ConnectionState, ConnectionStats, DEFAULT_RETRY_DELAY};
pub use error::{Result, TsdbError};
pub use point::{DataPoint, PointBuilder};
pub use transport::{TcpTransport, Transport};
pub use types::{DEFAULT_PORT, Endpoint, Tags};
