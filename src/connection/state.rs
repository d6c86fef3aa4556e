//! Connection state management.

use std::time::Instant;

/// Connection state.
///
/// Exactly one value holds at any instant and it only changes on the event
/// loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No socket. Either waiting for the retry timer or closed.
    #[default]
    Disconnected,
    /// Looking up the endpoint's addresses.
    Resolving,
    /// Trying the resolved addresses in order.
    Connecting,
    /// Socket is open and the queue may be drained.
    Connected,
}

impl ConnectionState {
    /// Check if the connection is usable.
    pub fn is_connected(&self) -> bool {
        *self == ConnectionState::Connected
    }

    /// Check if a connection attempt is in progress.
    pub fn is_connecting(&self) -> bool {
        matches!(self, ConnectionState::Resolving | ConnectionState::Connecting)
    }
}

/// Connection statistics.
#[derive(Debug, Clone, Default)]
pub struct ConnectionStats {
    /// Number of successful connections.
    pub connect_count: u64,
    /// Number of failed resolve, connect or write operations.
    pub failure_count: u64,
    /// Number of reconnection attempts started by the retry timer.
    pub reconnect_count: u64,
    /// Number of messages fully handed to the transport.
    pub messages_sent: u64,
    /// Total bytes sent.
    pub bytes_sent: u64,
    /// Number of queued messages discarded by `close()`.
    pub messages_dropped: u64,
    /// Time of last successful connection.
    pub last_connected: Option<Instant>,
    /// Time of last disconnect.
    pub last_disconnected: Option<Instant>,
    /// Time of last error.
    pub last_error: Option<Instant>,
}

impl ConnectionStats {
    /// Record a successful connection.
    pub fn record_connect(&mut self) {
        self.connect_count += 1;
        self.last_connected = Some(Instant::now());
    }

    /// Record a disconnection.
    pub fn record_disconnect(&mut self) {
        self.last_disconnected = Some(Instant::now());
    }

    /// Record a failure.
    pub fn record_failure(&mut self) {
        self.failure_count += 1;
        self.last_error = Some(Instant::now());
    }

    /// Record a reconnection attempt.
    pub fn record_reconnect(&mut self) {
        self.reconnect_count += 1;
    }

    /// Record a sent message.
    pub fn record_send(&mut self, bytes: usize) {
        self.messages_sent += 1;
        self.bytes_sent += bytes as u64;
    }

    /// Record messages discarded on close.
    pub fn record_dropped(&mut self, count: usize) {
        self.messages_dropped += count as u64;
    }

    /// Get uptime since the last connect.
    pub fn uptime(&self) -> Option<std::time::Duration> {
        self.last_connected.map(|t| t.elapsed())
    }
}
