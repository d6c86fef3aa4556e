//! FIFO buffer of serialized messages awaiting delivery.

use std::collections::VecDeque;

use bytes::Bytes;

/// Ordered, unbounded buffer of not-yet-sent messages.
///
/// Messages enter at the tail and leave from the head, and the head is only
/// removed once the transport has accepted all of its bytes. There is no
/// capacity limit and no back-pressure: producers may outrun the connection
/// for as long as memory allows.
#[derive(Debug, Default)]
pub struct PendingQueue {
    messages: VecDeque<Bytes>,
    bytes: usize,
}

impl PendingQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message at the tail.
    pub fn push_back(&mut self, message: Bytes) {
        self.bytes += message.len();
        self.messages.push_back(message);
    }

    /// Get the head message.
    pub fn front(&self) -> Option<&Bytes> {
        self.messages.front()
    }

    /// Remove the head message after it has been fully written.
    pub fn pop_front(&mut self) -> Option<Bytes> {
        let message = self.messages.pop_front()?;
        self.bytes -= message.len();
        Some(message)
    }

    /// Drop every message except an in-flight head.
    ///
    /// Returns the number of messages discarded.
    pub fn truncate_to_in_flight(&mut self, in_flight: bool) -> usize {
        let keep = usize::from(in_flight).min(self.messages.len());
        let dropped = self.messages.len() - keep;
        self.messages.truncate(keep);
        self.bytes = self.messages.iter().map(Bytes::len).sum();
        dropped
    }

    /// Number of queued messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Check if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Total bytes across all queued messages.
    pub fn byte_len(&self) -> usize {
        self.bytes
    }
}
