use super::{ClientEntry, ClientId, Engine, EngineStats, State, TimerId};
use tracing::debug;

impl Engine {
    /// Register a new client and arm its liveness timer
    pub fn create_client(&self) -> ClientId {
        let mut state = self.inner.state.lock();

        let client_id = loop {
            let id = ClientId::from(self.inner.namespace.generate());
            if !state.clients.contains_key(&id) {
                break id;
            }
        };

        state.clients.insert(client_id.clone(), ClientEntry::default());
        state.index.register(&client_id);
        self.ping_locked(&mut state, &client_id);

        EngineStats::incr(&self.inner.stats.clients_created, 1);
        debug!("Created new client {}", client_id);
        client_id
    }

    /// Destroy a client, dropping its subscriptions, timer and queue
    ///
    /// Returns false if the client was not registered.
    pub fn destroy_client(&self, client_id: &ClientId) -> bool {
        let mut state = self.inner.state.lock();
        self.destroy_locked(&mut state, client_id)
    }

    pub fn client_exists(&self, client_id: &ClientId) -> bool {
        self.inner.state.lock().clients.contains_key(client_id)
    }

    /// Renew the client's liveness timer
    ///
    /// A no-op when no timeout is configured or the client is unknown.
    pub fn ping(&self, client_id: &ClientId) {
        if self.inner.scheduler.is_none() {
            return;
        }
        let mut state = self.inner.state.lock();
        self.ping_locked(&mut state, client_id);
    }

    fn ping_locked(&self, state: &mut State, client_id: &ClientId) {
        let (Some(scheduler), Some(interval)) = (&self.inner.scheduler, self.inner.liveness)
        else {
            return;
        };
        let Some(entry) = state.clients.get_mut(client_id) else {
            return;
        };

        if let Some(previous) = entry.timer.take() {
            scheduler.cancel(previous);
        }
        entry.timer = Some(scheduler.arm(client_id.clone(), interval));
        debug!("Ping {}, {:?}", client_id, interval);
    }

    fn destroy_locked(&self, state: &mut State, client_id: &ClientId) -> bool {
        let entry = state.clients.remove(client_id);
        let channels = state.index.remove_client(client_id);
        let discarded = state.queue.discard(client_id);

        let Some(entry) = entry else {
            if !channels.is_empty() || discarded > 0 {
                debug!(
                    "Cleared {} subscriptions and {} messages of unregistered client {}",
                    channels.len(),
                    discarded,
                    client_id
                );
            }
            return false;
        };

        if let (Some(timer), Some(scheduler)) = (entry.timer, &self.inner.scheduler) {
            scheduler.cancel(timer);
        }
        self.inner.namespace.release(client_id.as_str());

        EngineStats::incr(&self.inner.stats.clients_destroyed, 1);
        debug!(
            "Destroyed client {} ({} subscriptions, {} pending messages)",
            client_id,
            channels.len(),
            discarded
        );
        true
    }

    /// Timer callback; only the client's current timer may destroy it
    pub(super) fn expire(&self, client_id: &ClientId, timer: TimerId) {
        let mut state = self.inner.state.lock();
        let current = state.clients.get(client_id).and_then(|e| e.timer);
        if current != Some(timer) {
            debug!("Ignoring stale timer {} for client {}", timer, client_id);
            return;
        }

        if let Some(entry) = state.clients.get_mut(client_id) {
            entry.timer = None;
        }
        if self.destroy_locked(&mut state, client_id) {
            EngineStats::incr(&self.inner.stats.clients_expired, 1);
            debug!("Client {} expired", client_id);
        }
    }
}
