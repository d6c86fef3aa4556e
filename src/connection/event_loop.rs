//! Single-threaded event loop driving the connection state machine.
//!
//! Producers never touch the machine directly. They post [`Command`]s on an
//! unbounded channel, and the loop turns those, I/O completions and timer
//! expiries into [`Event`]s one at a time. At most one resolve, connect or
//! write is outstanding and at most one retry timer is armed.

use std::future::{Future, pending};
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::time::{Sleep, sleep};
use tracing::debug;

use crate::transport::Transport;
use crate::types::Endpoint;

use super::machine::{Action, Event, Machine};
use super::state::ConnectionStats;

/// Work posted to the event loop from producer threads.
#[derive(Debug)]
pub enum Command {
    /// Append a serialized message to the pending queue.
    Write(Bytes),
    /// Shut the client down.
    Close,
}

/// Sending half used by producers.
pub type CommandSender = mpsc::UnboundedSender<Command>;

/// Create the channel connecting producers to an [`EventLoop`].
pub fn command_channel() -> (CommandSender, mpsc::UnboundedReceiver<Command>) {
    mpsc::unbounded_channel()
}

type PendingOp<S> = Pin<Box<dyn Future<Output = Completion<S>>>>;

/// Result of the single outstanding I/O operation.
enum Completion<S> {
    Resolved(io::Result<Vec<SocketAddr>>),
    Connected(io::Result<(S, SocketAddr)>),
    Written(io::Result<S>),
}

enum Wake<S> {
    Op(Completion<S>),
    TimerExpired,
    Command(Option<Command>),
}

/// Resources that only exist while the loop is running.
struct Slots<S> {
    socket: Option<S>,
    op: Option<PendingOp<S>>,
    timer: Option<Pin<Box<Sleep>>>,
}

/// The event loop. Consumed by [`EventLoop::run`].
pub struct EventLoop<T: Transport> {
    endpoint: Endpoint,
    transport: T,
    machine: Machine,
    commands: mpsc::UnboundedReceiver<Command>,
}

impl<T: Transport> EventLoop<T> {
    /// Create an event loop for `endpoint`.
    pub fn new(
        endpoint: Endpoint,
        transport: T,
        retry_delay: Duration,
        commands: mpsc::UnboundedReceiver<Command>,
    ) -> Self {
        Self {
            machine: Machine::new(endpoint.clone(), retry_delay),
            endpoint,
            transport,
            commands,
        }
    }

    /// Run until close has been processed and no write is in flight.
    ///
    /// A dropped command channel counts as a close request.
    pub async fn run(mut self) -> ConnectionStats {
        debug!(endpoint = %self.endpoint, "event loop started");
        let mut slots = Slots {
            socket: None,
            op: None,
            timer: None,
        };
        let mut commands_open = true;

        self.dispatch(&mut slots, Event::Start);

        while !self.machine.is_finished() {
            let wake = tokio::select! {
                completion = next_completion(&mut slots.op) => Wake::Op(completion),
                () = next_expiry(&mut slots.timer) => Wake::TimerExpired,
                command = self.commands.recv(), if commands_open => Wake::Command(command),
            };

            let event = match wake {
                Wake::Op(completion) => {
                    slots.op = None;
                    complete(&mut slots, completion)
                }
                Wake::TimerExpired => {
                    slots.timer = None;
                    Event::TimerExpired
                }
                Wake::Command(Some(Command::Write(data))) => Event::Enqueue(data),
                Wake::Command(Some(Command::Close)) => Event::Close,
                Wake::Command(None) => {
                    commands_open = false;
                    Event::Close
                }
            };
            self.dispatch(&mut slots, event);
        }

        debug!(endpoint = %self.endpoint, stats = ?self.machine.stats(), "event loop finished");
        self.machine.stats().clone()
    }

    fn dispatch(&mut self, slots: &mut Slots<T::Stream>, event: Event) {
        for action in self.machine.handle(event) {
            self.execute(slots, action);
        }
    }

    fn execute(&mut self, slots: &mut Slots<T::Stream>, action: Action) {
        match action {
            Action::Resolve => {
                let resolve = self.transport.resolve(&self.endpoint);
                start(slots, async move { Completion::Resolved(resolve.await) });
            }
            Action::Connect(addrs) => {
                let connect = self.transport.connect(addrs);
                start(slots, async move { Completion::Connected(connect.await) });
            }
            Action::Write(data) => match slots.socket.take() {
                Some(stream) => {
                    let write = self.transport.write(stream, data);
                    start(slots, async move { Completion::Written(write.await) });
                }
                None => start(slots, async {
                    Completion::Written(Err(io::ErrorKind::NotConnected.into()))
                }),
            },
            Action::ArmTimer(delay) => {
                debug_assert!(slots.timer.is_none(), "retry timer already armed");
                slots.timer = Some(Box::pin(sleep(delay)));
            }
            Action::CancelTimer => {
                if slots.timer.take().is_some() {
                    debug!("retry wait interrupted; no reconnect will be attempted");
                }
            }
            Action::AbortPending => {
                slots.op = None;
            }
            Action::CloseSocket => {
                slots.socket = None;
            }
        }
    }
}

fn start<S>(slots: &mut Slots<S>, op: impl Future<Output = Completion<S>> + 'static) {
    debug_assert!(slots.op.is_none(), "operation already in flight");
    slots.op = Some(Box::pin(op));
}

/// Store any socket carried by the completion and translate it for the machine.
fn complete<S>(slots: &mut Slots<S>, completion: Completion<S>) -> Event {
    match completion {
        Completion::Resolved(result) => Event::Resolved(result),
        Completion::Connected(result) => Event::Connected(result.map(|(stream, peer)| {
            slots.socket = Some(stream);
            peer
        })),
        Completion::Written(result) => Event::WriteDone(result.map(|stream| {
            slots.socket = Some(stream);
        })),
    }
}

async fn next_completion<S>(op: &mut Option<PendingOp<S>>) -> Completion<S> {
    match op.as_mut() {
        Some(op) => op.await,
        None => pending().await,
    }
}

async fn next_expiry(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer.as_mut() {
        Some(timer) => timer.await,
        None => pending().await,
    }
}
