//! bayeux-engine: in-memory storage and dispatch backend for Bayeux servers
//!
//! The engine keeps track of which clients exist, which channels they are
//! subscribed to, and which messages are waiting for them. Publishing a
//! message fans it out to every matching subscriber and hands it to the
//! subscriber's connection when one is attached.
//!
//! # Architecture
//!
//! - One `Engine` per server, all state behind a single lock
//! - Wildcard matching by channel expansion (`/foo/*`, `/foo/**`)
//! - Set-semantics pending queues with at-most-once hand-off
//! - Liveness timers on a dedicated background thread

/// Channel names, patterns and expansion
pub mod channel;

/// Configuration management for the engine
pub mod config;

/// Interactive console front end
pub mod console;

/// Connection hand-off and lookup
pub mod connection;

/// Core engine implementation
pub mod engine;

/// Error types and result aliases
pub mod error;

/// Routed message type
pub mod message;

/// Client id generation
pub mod namespace;

pub use config::Config;
pub use connection::{Connection, ConnectionLookup, ConnectionRegistry};
pub use engine::{ClientId, Engine, EngineStats};
pub use error::{Error, Result};
pub use message::Message;
pub use namespace::{NamespaceGenerator, RandomNamespace};
