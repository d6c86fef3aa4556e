//! Connection management for the TSDB client.
//!
//! This module provides:
//! - The connect/reconnect state machine ([`Machine`])
//! - The ordered pending queue it drains ([`PendingQueue`])
//! - The event loop that executes the machine's actions ([`EventLoop`])
//! - Configuration for the retry delay and socket options
//!
//! # Example
//!
//! ```
//! use simpletsdb::connection::{Action, Event, Machine};
//! use simpletsdb::Endpoint;
//! use std::time::Duration;
//!
//! let mut machine = Machine::new(Endpoint::new("localhost", 4242), Duration::from_secs(2));
//! assert_eq!(machine.handle(Event::Start), vec![Action::Resolve]);
//!
//! // A failed lookup arms the retry timer instead of giving up.
//! let actions = machine.handle(Event::Resolved(Err(std::io::Error::other("dns"))));
//! assert_eq!(actions, vec![Action::ArmTimer(Duration::from_secs(2))]);
//! ```

mod config;
mod event_loop;
mod machine;
mod queue;
mod state;

pub use config::{ClientConfig, DEFAULT_RETRY_DELAY};
pub use event_loop::{Command, CommandSender, EventLoop, command_channel};
pub use machine::{Action, Event, Machine};
pub use queue::PendingQueue;
pub use state::{ConnectionState, ConnectionStats};
