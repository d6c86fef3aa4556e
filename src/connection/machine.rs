//! I/O-free connection state machine.
//!
//! [`Machine::handle`] takes one [`Event`] (an I/O completion, a timer expiry
//! or a producer command) and returns the [`Action`]s the event loop must
//! perform. Nothing in here touches a socket or a clock, so every transition
//! can be exercised directly in tests.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, info, trace, warn};

use crate::error::TsdbError;
use crate::types::Endpoint;

use super::queue::PendingQueue;
use super::state::{ConnectionState, ConnectionStats};

/// Input to the state machine.
#[derive(Debug)]
pub enum Event {
    /// Begin the first connection cycle.
    Start,
    /// Address lookup finished.
    Resolved(io::Result<Vec<SocketAddr>>),
    /// Connect attempt finished. Carries the peer address on success.
    Connected(io::Result<SocketAddr>),
    /// The in-flight write finished.
    WriteDone(io::Result<()>),
    /// The retry timer expired without being cancelled.
    TimerExpired,
    /// A producer submitted a serialized message.
    Enqueue(Bytes),
    /// A producer requested shutdown.
    Close,
}

/// Side effect requested by the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Look up the endpoint's addresses.
    Resolve,
    /// Connect to the first address that accepts.
    Connect(Vec<SocketAddr>),
    /// Hand this message to the socket.
    Write(Bytes),
    /// Arm the retry timer.
    ArmTimer(Duration),
    /// Cancel the armed retry timer.
    CancelTimer,
    /// Abandon the outstanding resolve or connect.
    AbortPending,
    /// Discard the socket.
    CloseSocket,
}

/// Connect/reconnect state machine owning the pending queue.
#[derive(Debug)]
pub struct Machine {
    endpoint: Endpoint,
    retry_delay: Duration,
    state: ConnectionState,
    queue: PendingQueue,
    write_in_flight: bool,
    timer_armed: bool,
    closed: bool,
    stats: ConnectionStats,
}

impl Machine {
    /// Create a disconnected machine for `endpoint`.
    pub fn new(endpoint: Endpoint, retry_delay: Duration) -> Self {
        Self {
            endpoint,
            retry_delay,
            state: ConnectionState::Disconnected,
            queue: PendingQueue::new(),
            write_in_flight: false,
            timer_armed: false,
            closed: false,
            stats: ConnectionStats::default(),
        }
    }

    /// Feed one event and collect the resulting actions.
    pub fn handle(&mut self, event: Event) -> Vec<Action> {
        match event {
            Event::Start => self.on_start(),
            Event::Resolved(result) => self.on_resolved(result),
            Event::Connected(result) => self.on_connected(result),
            Event::WriteDone(result) => self.on_write_done(result),
            Event::TimerExpired => self.on_timer_expired(),
            Event::Enqueue(message) => self.on_enqueue(message),
            Event::Close => self.on_close(),
        }
    }

    /// Get the current connection state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Get the endpoint this machine connects to.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Get the connection statistics.
    pub fn stats(&self) -> &ConnectionStats {
        &self.stats
    }

    /// Get the number of queued messages, including one in flight.
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Check if a write is currently outstanding.
    pub fn is_write_in_flight(&self) -> bool {
        self.write_in_flight
    }

    /// Check if the retry timer is armed.
    pub fn is_timer_armed(&self) -> bool {
        self.timer_armed
    }

    /// Check if close has been processed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// True once close has been processed and no write remains in flight.
    pub fn is_finished(&self) -> bool {
        self.closed && !self.write_in_flight
    }

    fn on_start(&mut self) -> Vec<Action> {
        if self.closed || self.timer_armed || self.state != ConnectionState::Disconnected {
            return Vec::new();
        }
        self.begin_resolve()
    }

    fn begin_resolve(&mut self) -> Vec<Action> {
        debug!(endpoint = %self.endpoint, "resolving");
        self.state = ConnectionState::Resolving;
        vec![Action::Resolve]
    }

    fn on_resolved(&mut self, result: io::Result<Vec<SocketAddr>>) -> Vec<Action> {
        if self.state != ConnectionState::Resolving {
            trace!(state = ?self.state, "ignoring stale resolve completion");
            return Vec::new();
        }
        match result {
            Ok(addrs) if !addrs.is_empty() => {
                trace!(endpoint = %self.endpoint, ?addrs, "resolved");
                self.state = ConnectionState::Connecting;
                vec![Action::Connect(addrs)]
            }
            Ok(_) => self.fail(TsdbError::NoAddresses {
                endpoint: self.endpoint.to_string(),
            }),
            Err(e) => self.fail(TsdbError::resolve(&self.endpoint, e)),
        }
    }

    fn on_connected(&mut self, result: io::Result<SocketAddr>) -> Vec<Action> {
        if self.state != ConnectionState::Connecting {
            trace!(state = ?self.state, "ignoring stale connect completion");
            return match result {
                Ok(_) => vec![Action::CloseSocket],
                Err(_) => Vec::new(),
            };
        }
        match result {
            Ok(peer) => {
                info!(endpoint = %self.endpoint, %peer, pending = self.queue.len(), "connected");
                self.state = ConnectionState::Connected;
                self.stats.record_connect();
                self.drain()
            }
            Err(e) => self.fail(TsdbError::connect(&self.endpoint, e)),
        }
    }

    fn on_write_done(&mut self, result: io::Result<()>) -> Vec<Action> {
        if !self.write_in_flight {
            trace!("ignoring write completion with no write in flight");
            return Vec::new();
        }
        self.write_in_flight = false;

        if let Err(e) = result {
            if self.closed {
                self.stats.record_dropped(self.queue.truncate_to_in_flight(false));
            }
            return self.fail(TsdbError::Write(e));
        }

        if let Some(sent) = self.queue.pop_front() {
            trace!(bytes = sent.len(), "message written");
            self.stats.record_send(sent.len());
        }

        if self.closed {
            self.state = ConnectionState::Disconnected;
            self.stats.record_disconnect();
            return vec![Action::CloseSocket];
        }
        self.drain()
    }

    fn on_timer_expired(&mut self) -> Vec<Action> {
        if !self.timer_armed {
            return Vec::new();
        }
        self.timer_armed = false;
        if self.closed {
            return Vec::new();
        }
        self.stats.record_reconnect();
        self.begin_resolve()
    }

    fn on_enqueue(&mut self, message: Bytes) -> Vec<Action> {
        if self.closed {
            debug!("dropping message submitted after close");
            self.stats.record_dropped(1);
            return Vec::new();
        }
        trace!(bytes = message.len(), pending = self.queue.len(), "enqueue");
        self.queue.push_back(message);
        self.drain()
    }

    fn on_close(&mut self) -> Vec<Action> {
        if self.closed {
            return Vec::new();
        }
        self.closed = true;

        let dropped = self.queue.truncate_to_in_flight(self.write_in_flight);
        self.stats.record_dropped(dropped);
        debug!(
            endpoint = %self.endpoint,
            state = ?self.state,
            dropped,
            write_in_flight = self.write_in_flight,
            "closing"
        );

        let mut actions = Vec::new();
        if self.timer_armed {
            self.timer_armed = false;
            actions.push(Action::CancelTimer);
        }
        match self.state {
            ConnectionState::Resolving | ConnectionState::Connecting => {
                self.state = ConnectionState::Disconnected;
                actions.push(Action::AbortPending);
            }
            ConnectionState::Connected if !self.write_in_flight => {
                self.state = ConnectionState::Disconnected;
                self.stats.record_disconnect();
                actions.push(Action::CloseSocket);
            }
            // The in-flight write finishes on its own; the socket is
            // closed from on_write_done.
            ConnectionState::Connected | ConnectionState::Disconnected => {}
        }
        actions
    }

    /// Start writing the head message if the socket is idle.
    fn drain(&mut self) -> Vec<Action> {
        if self.state != ConnectionState::Connected || self.write_in_flight {
            return Vec::new();
        }
        match self.queue.front() {
            Some(head) => {
                self.write_in_flight = true;
                vec![Action::Write(head.clone())]
            }
            None => Vec::new(),
        }
    }

    /// Abandon the current cycle and, unless closed, arm the retry timer.
    fn fail(&mut self, error: TsdbError) -> Vec<Action> {
        self.stats.record_failure();

        let mut actions = Vec::new();
        if self.state == ConnectionState::Connected {
            self.stats.record_disconnect();
            actions.push(Action::CloseSocket);
        }
        self.state = ConnectionState::Disconnected;

        if self.closed {
            debug!(endpoint = %self.endpoint, %error, "failure after close");
            return actions;
        }

        warn!(
            endpoint = %self.endpoint,
            %error,
            retry_in = ?self.retry_delay,
            pending = self.queue.len(),
            "connection cycle failed"
        );
        debug_assert!(!self.timer_armed, "retry timer already armed");
        self.timer_armed = true;
        actions.push(Action::ArmTimer(self.retry_delay));
        actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_secs(2);

    fn machine() -> Machine {
        Machine::new(Endpoint::new("tsdb.local", 4242), DELAY)
    }

    fn addr() -> SocketAddr {
        "127.0.0.1:4242".parse().unwrap()
    }

    fn msg(s: &'static str) -> Bytes {
        Bytes::from_static(s.as_bytes())
    }

    fn refused() -> io::Error {
        io::Error::new(io::ErrorKind::ConnectionRefused, "refused")
    }

    /// Drive a fresh machine to Connected with an empty queue.
    fn connected() -> Machine {
        let mut m = machine();
        m.handle(Event::Start);
        m.handle(Event::Resolved(Ok(vec![addr()])));
        assert!(m.handle(Event::Connected(Ok(addr()))).is_empty());
        m
    }

    #[test]
    fn test_start_resolves() {
        let mut m = machine();
        assert_eq!(m.state(), ConnectionState::Disconnected);
        assert_eq!(m.handle(Event::Start), vec![Action::Resolve]);
        assert_eq!(m.state(), ConnectionState::Resolving);

        // A second start is a no-op.
        assert!(m.handle(Event::Start).is_empty());
    }

    #[test]
    fn test_resolve_then_connect() {
        let mut m = machine();
        m.handle(Event::Start);
        let addrs = vec![addr(), "127.0.0.2:4242".parse().unwrap()];
        assert_eq!(
            m.handle(Event::Resolved(Ok(addrs.clone()))),
            vec![Action::Connect(addrs)]
        );
        assert_eq!(m.state(), ConnectionState::Connecting);
        assert!(m.handle(Event::Connected(Ok(addr()))).is_empty());
        assert_eq!(m.state(), ConnectionState::Connected);
        assert_eq!(m.stats().connect_count, 1);
    }

    #[test]
    fn test_resolve_failure_arms_timer() {
        let mut m = machine();
        m.handle(Event::Start);
        let actions = m.handle(Event::Resolved(Err(io::Error::other("dns"))));
        assert_eq!(actions, vec![Action::ArmTimer(DELAY)]);
        assert_eq!(m.state(), ConnectionState::Disconnected);
        assert!(m.is_timer_armed());
        assert_eq!(m.stats().failure_count, 1);

        assert_eq!(m.handle(Event::TimerExpired), vec![Action::Resolve]);
        assert!(!m.is_timer_armed());
        assert_eq!(m.stats().reconnect_count, 1);
    }

    #[test]
    fn test_empty_resolution_is_failure() {
        let mut m = machine();
        m.handle(Event::Start);
        assert_eq!(
            m.handle(Event::Resolved(Ok(Vec::new()))),
            vec![Action::ArmTimer(DELAY)]
        );
    }

    #[test]
    fn test_connect_failure_arms_timer() {
        let mut m = machine();
        m.handle(Event::Start);
        m.handle(Event::Resolved(Ok(vec![addr()])));
        assert_eq!(
            m.handle(Event::Connected(Err(refused()))),
            vec![Action::ArmTimer(DELAY)]
        );
        assert_eq!(m.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_queued_while_disconnected_drains_in_order() {
        let mut m = machine();
        m.handle(Event::Start);
        for s in ["a\n", "b\n", "c\n"] {
            assert!(m.handle(Event::Enqueue(msg(s))).is_empty());
        }
        assert_eq!(m.queue_len(), 3);

        m.handle(Event::Resolved(Ok(vec![addr()])));
        assert_eq!(
            m.handle(Event::Connected(Ok(addr()))),
            vec![Action::Write(msg("a\n"))]
        );
        assert!(m.is_write_in_flight());

        assert_eq!(
            m.handle(Event::WriteDone(Ok(()))),
            vec![Action::Write(msg("b\n"))]
        );
        assert_eq!(
            m.handle(Event::WriteDone(Ok(()))),
            vec![Action::Write(msg("c\n"))]
        );
        assert!(m.handle(Event::WriteDone(Ok(()))).is_empty());
        assert!(!m.is_write_in_flight());
        assert_eq!(m.queue_len(), 0);
        assert_eq!(m.stats().messages_sent, 3);
        assert_eq!(m.stats().bytes_sent, 6);
    }

    #[test]
    fn test_single_write_in_flight() {
        let mut m = connected();
        assert_eq!(
            m.handle(Event::Enqueue(msg("a\n"))),
            vec![Action::Write(msg("a\n"))]
        );
        // Further messages wait for the completion.
        assert!(m.handle(Event::Enqueue(msg("b\n"))).is_empty());
        assert!(m.handle(Event::Enqueue(msg("c\n"))).is_empty());
        assert_eq!(m.queue_len(), 3);

        assert_eq!(
            m.handle(Event::WriteDone(Ok(()))),
            vec![Action::Write(msg("b\n"))]
        );
    }

    #[test]
    fn test_write_failure_keeps_head_and_reconnects() {
        let mut m = connected();
        m.handle(Event::Enqueue(msg("a\n")));
        m.handle(Event::Enqueue(msg("b\n")));

        let reset = io::Error::new(io::ErrorKind::ConnectionReset, "reset");
        assert_eq!(
            m.handle(Event::WriteDone(Err(reset))),
            vec![Action::CloseSocket, Action::ArmTimer(DELAY)]
        );
        assert_eq!(m.state(), ConnectionState::Disconnected);
        assert_eq!(m.queue_len(), 2);

        // Messages submitted while waiting are appended behind the survivors.
        m.handle(Event::Enqueue(msg("c\n")));

        assert_eq!(m.handle(Event::TimerExpired), vec![Action::Resolve]);
        m.handle(Event::Resolved(Ok(vec![addr()])));
        assert_eq!(
            m.handle(Event::Connected(Ok(addr()))),
            vec![Action::Write(msg("a\n"))]
        );
        assert_eq!(
            m.handle(Event::WriteDone(Ok(()))),
            vec![Action::Write(msg("b\n"))]
        );
        assert_eq!(
            m.handle(Event::WriteDone(Ok(()))),
            vec![Action::Write(msg("c\n"))]
        );
        assert_eq!(m.stats().connect_count, 2);
    }

    #[test]
    fn test_reconnect_converges_after_k_failures() {
        const K: usize = 5;
        let mut m = machine();
        m.handle(Event::Start);
        m.handle(Event::Enqueue(msg("x\n")));

        let mut timers = 0;
        for _ in 0..K {
            m.handle(Event::Resolved(Ok(vec![addr()])));
            let actions = m.handle(Event::Connected(Err(refused())));
            assert_eq!(actions, vec![Action::ArmTimer(DELAY)]);
            timers += 1;
            // Never more than one timer.
            assert!(m.handle(Event::Start).is_empty());
            assert_eq!(m.handle(Event::TimerExpired), vec![Action::Resolve]);
        }

        m.handle(Event::Resolved(Ok(vec![addr()])));
        assert_eq!(
            m.handle(Event::Connected(Ok(addr()))),
            vec![Action::Write(msg("x\n"))]
        );
        assert_eq!(timers, K);
        assert_eq!(m.stats().failure_count, K as u64);
        assert_eq!(m.stats().reconnect_count, K as u64);
    }

    #[test]
    fn test_close_while_waiting_drops_pending_and_cancels_timer() {
        let mut m = machine();
        m.handle(Event::Start);
        m.handle(Event::Resolved(Err(io::Error::other("dns"))));
        m.handle(Event::Enqueue(msg("a\n")));
        m.handle(Event::Enqueue(msg("b\n")));

        assert_eq!(m.handle(Event::Close), vec![Action::CancelTimer]);
        assert!(m.is_finished());
        assert_eq!(m.queue_len(), 0);
        assert_eq!(m.stats().messages_dropped, 2);

        // A late expiry does not reconnect.
        assert!(m.handle(Event::TimerExpired).is_empty());
        assert!(m.handle(Event::Start).is_empty());
        assert_eq!(m.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_close_while_connecting_aborts() {
        let mut m = machine();
        m.handle(Event::Start);
        m.handle(Event::Enqueue(msg("a\n")));
        m.handle(Event::Resolved(Ok(vec![addr()])));

        assert_eq!(m.handle(Event::Close), vec![Action::AbortPending]);
        assert!(m.is_finished());
        // A connect that slips through is discarded, not used.
        assert_eq!(
            m.handle(Event::Connected(Ok(addr()))),
            vec![Action::CloseSocket]
        );
        assert_eq!(m.stats().messages_sent, 0);
    }

    #[test]
    fn test_close_while_connected_idle() {
        let mut m = connected();
        assert_eq!(m.handle(Event::Close), vec![Action::CloseSocket]);
        assert!(m.is_finished());
        assert_eq!(m.state(), ConnectionState::Disconnected);
        assert!(m.handle(Event::Close).is_empty());
    }

    #[test]
    fn test_close_lets_in_flight_write_finish() {
        let mut m = connected();
        m.handle(Event::Enqueue(msg("a\n")));
        m.handle(Event::Enqueue(msg("b\n")));
        m.handle(Event::Enqueue(msg("c\n")));

        assert!(m.handle(Event::Close).is_empty());
        assert!(!m.is_finished());
        assert_eq!(m.queue_len(), 1);
        assert_eq!(m.stats().messages_dropped, 2);

        assert_eq!(m.handle(Event::WriteDone(Ok(()))), vec![Action::CloseSocket]);
        assert!(m.is_finished());
        assert_eq!(m.stats().messages_sent, 1);
    }

    #[test]
    fn test_failed_write_after_close_does_not_rearm() {
        let mut m = connected();
        m.handle(Event::Enqueue(msg("a\n")));
        m.handle(Event::Close);

        let reset = io::Error::new(io::ErrorKind::BrokenPipe, "pipe");
        assert_eq!(
            m.handle(Event::WriteDone(Err(reset))),
            vec![Action::CloseSocket]
        );
        assert!(m.is_finished());
        assert!(!m.is_timer_armed());
        assert_eq!(m.queue_len(), 0);
        assert_eq!(m.stats().messages_dropped, 1);
    }

    #[test]
    fn test_enqueue_after_close_is_dropped() {
        let mut m = machine();
        m.handle(Event::Close);
        assert!(m.handle(Event::Enqueue(msg("late\n"))).is_empty());
        assert_eq!(m.queue_len(), 0);
        assert_eq!(m.stats().messages_dropped, 1);
    }

    #[test]
    fn test_stale_completions_ignored() {
        let mut m = connected();
        assert!(m.handle(Event::Resolved(Ok(vec![addr()]))).is_empty());
        assert!(m.handle(Event::WriteDone(Ok(()))).is_empty());
        assert!(m.handle(Event::TimerExpired).is_empty());
        assert_eq!(m.state(), ConnectionState::Connected);
    }
}
