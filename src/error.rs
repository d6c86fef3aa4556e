//! Error types for TSDB client operations.

use std::io;
use thiserror::Error;

/// Errors that can occur while talking to a TSDB endpoint.
///
/// Connectivity errors never reach callers of
/// [`TsdbClient::add_point`](crate::TsdbClient::add_point); they are logged and
/// recovered by the reconnect loop. They are still typed so the state machine
/// and transports can report what went wrong.
#[derive(Error, Debug)]
pub enum TsdbError {
    /// I/O error outside the connect/write cycle (e.g. runtime construction).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Address lookup for the endpoint failed.
    #[error("Failed to resolve {endpoint}: {source}")]
    Resolve {
        endpoint: String,
        #[source]
        source: io::Error,
    },

    /// Address lookup succeeded but produced no addresses.
    #[error("No addresses found for {endpoint}")]
    NoAddresses { endpoint: String },

    /// Every resolved address refused the connection.
    #[error("Failed to connect to {endpoint}: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: io::Error,
    },

    /// Writing a message to the socket failed.
    #[error("Write failed: {0}")]
    Write(#[source] io::Error),

    /// `run()` was invoked while the event loop was already taken.
    #[error("Event loop is already running or has finished")]
    AlreadyRunning,
}

/// Result type alias for TSDB client operations.
pub type Result<T> = std::result::Result<T, TsdbError>;

impl TsdbError {
    /// Create a resolution failure for the given endpoint.
    pub fn resolve(endpoint: impl ToString, source: io::Error) -> Self {
        Self::Resolve {
            endpoint: endpoint.to_string(),
            source,
        }
    }

    /// Create a connect failure for the given endpoint.
    pub fn connect(endpoint: impl ToString, source: io::Error) -> Self {
        Self::Connect {
            endpoint: endpoint.to_string(),
            source,
        }
    }
}
