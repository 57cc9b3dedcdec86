//! In-memory engine: client liveness, subscriptions, pending queues and
//! publish fan-out.
//!
//! All mutable state sits behind a single lock so the two directions of the
//! subscription index, the pending queues and each client's armed timer
//! always change together. Connection lookups and deliveries happen outside
//! the lock.

mod dispatch;
mod index;
mod queue;
mod registry;
mod timeout;

pub use index::SubscriptionIndex;
pub use queue::MessageQueue;
pub use timeout::{TimeoutScheduler, TimerId};

use crate::connection::ConnectionLookup;
use crate::namespace::{NamespaceGenerator, RandomNamespace};
use crate::{Config, Message, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::debug;

/// Opaque client identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(Arc<str>);

impl ClientId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ClientId {
    fn from(id: String) -> Self {
        Self(id.into())
    }
}

impl From<&str> for ClientId {
    fn from(id: &str) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub struct EngineStats {
    pub clients_created: AtomicUsize,
    pub clients_destroyed: AtomicUsize,
    pub clients_expired: AtomicUsize,
    pub messages_published: AtomicUsize,
    pub messages_queued: AtomicUsize,
    pub messages_delivered: AtomicUsize,
}

impl EngineStats {
    pub fn new() -> Self {
        Self {
            clients_created: AtomicUsize::new(0),
            clients_destroyed: AtomicUsize::new(0),
            clients_expired: AtomicUsize::new(0),
            messages_published: AtomicUsize::new(0),
            messages_queued: AtomicUsize::new(0),
            messages_delivered: AtomicUsize::new(0),
        }
    }

    fn incr(counter: &AtomicUsize, n: usize) {
        counter.fetch_add(n, Ordering::Relaxed);
    }
}

impl Default for EngineStats {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Default)]
struct ClientEntry {
    /// Currently armed liveness timer, if any
    timer: Option<TimerId>,
}

#[derive(Default)]
struct State {
    clients: HashMap<ClientId, ClientEntry>,
    index: SubscriptionIndex,
    queue: MessageQueue,
}

struct Inner {
    config: Config,
    liveness: Option<Duration>,
    state: Mutex<State>,
    namespace: Box<dyn NamespaceGenerator>,
    connections: Arc<dyn ConnectionLookup>,
    scheduler: Option<TimeoutScheduler>,
    stats: EngineStats,
}

/// The memory engine
///
/// Cheap to clone; clones share the same state. Dropping the last clone
/// stops the timeout thread.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<Inner>,
}

impl Engine {
    /// Create an engine delivering through `connections`
    pub fn new(config: Config, connections: Arc<dyn ConnectionLookup>) -> Result<Self> {
        Self::with_namespace(config, connections, Box::new(RandomNamespace::new()))
    }

    /// Create an engine drawing client ids from `namespace`
    pub fn with_namespace(
        config: Config,
        connections: Arc<dyn ConnectionLookup>,
        namespace: Box<dyn NamespaceGenerator>,
    ) -> Result<Self> {
        config.validate()?;
        let liveness = config.liveness_interval();

        let inner = Arc::new_cyclic(|weak: &Weak<Inner>| {
            let scheduler = liveness.map(|_| {
                let weak = weak.clone();
                TimeoutScheduler::start(move |client_id, timer| {
                    if let Some(inner) = weak.upgrade() {
                        Engine { inner }.expire(&client_id, timer);
                    }
                })
            });

            Inner {
                config,
                liveness,
                state: Mutex::new(State::default()),
                namespace,
                connections,
                scheduler,
                stats: EngineStats::new(),
            }
        });

        debug!("Engine created (timeout: {:?})", inner.config.timeout);

        Ok(Self { inner })
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn stats(&self) -> &EngineStats {
        &self.inner.stats
    }

    /// Subscribe a client to a channel or pattern
    ///
    /// Always accepted. An id that was never created still gets an index
    /// entry but does not become a registered client.
    pub fn subscribe(&self, client_id: &ClientId, channel: &str) -> bool {
        let mut state = self.inner.state.lock();
        if !state.clients.contains_key(client_id) && !state.index.has_client(client_id) {
            debug!("Subscribing unregistered client {}", client_id);
        }
        state.index.subscribe(client_id, channel);
        debug!("Subscribed client {} to channel {}", client_id, channel);
        true
    }

    /// Unsubscribe a client from a channel or pattern; always accepted
    pub fn unsubscribe(&self, client_id: &ClientId, channel: &str) -> bool {
        self.inner.state.lock().index.unsubscribe(client_id, channel);
        debug!("Unsubscribed client {} from channel {}", client_id, channel);
        true
    }

    /// Number of registered clients
    pub fn client_count(&self) -> usize {
        self.inner.state.lock().clients.len()
    }

    /// Channels and patterns the client is subscribed to
    pub fn subscriptions(&self, client_id: &ClientId) -> Vec<String> {
        self.inner.state.lock().index.subscriptions(client_id)
    }

    /// Clients subscribed to exactly this channel or pattern
    pub fn subscribers(&self, channel: &str) -> Vec<ClientId> {
        self.inner.state.lock().index.subscribers(channel)
    }

    /// Number of channels and patterns with at least one subscriber
    pub fn channel_count(&self) -> usize {
        self.inner.state.lock().index.channel_count()
    }

    /// Messages pending across all clients
    pub fn pending_count(&self) -> usize {
        self.inner.state.lock().queue.total()
    }

    /// Messages waiting for the client's next connection
    pub fn pending(&self, client_id: &ClientId) -> Vec<Message> {
        self.inner.state.lock().queue.snapshot(client_id)
    }
}
