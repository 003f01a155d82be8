//! Durable state for bigip-ipam: a SlateDB key/value store, the watch event
//! log fed by every write, and typed registry access with optimistic
//! concurrency on top.

pub mod client;
pub mod registry;
pub mod watch;

pub use client::StateStore;
pub use registry::{Registry, RegistryError};
pub use watch::{EventLog, EventType, WatchEvent};
