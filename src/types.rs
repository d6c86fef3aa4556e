//! Core TSDB client types and constants.

use std::collections::BTreeMap;
use std::fmt;

/// Default telnet-style listener port of OpenTSDB.
pub const DEFAULT_PORT: u16 = 4242;

/// Tag set attached to a data point.
///
/// A `BTreeMap` keeps keys unique and iterates them in ascending order, so the
/// rendered line is deterministic.
pub type Tags = BTreeMap<String, String>;

/// The fixed remote host/port a client connects to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    host: String,
    port: u16,
}

impl Endpoint {
    /// Create a new endpoint.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Get the host name or address literal.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Get the port.
    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}
