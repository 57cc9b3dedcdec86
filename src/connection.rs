use crate::engine::ClientId;
use crate::Message;
use dashmap::DashMap;
use std::sync::Arc;

/// A live delivery channel to one client
///
/// Delivery is a hand-off: the engine never observes the outcome.
pub trait Connection: Send + Sync {
    fn deliver(&self, message: Message);
}

/// Resolves a client id to its current connection, if any
pub trait ConnectionLookup: Send + Sync {
    fn connection(&self, client_id: &ClientId, create_if_missing: bool)
        -> Option<Arc<dyn Connection>>;
}

/// Global registry for attached client connections
///
/// Transports attach a connection when a client reconnects and then ask the
/// engine to flush that client's pending messages.
pub struct ConnectionRegistry {
    connections: DashMap<ClientId, Arc<dyn Connection>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
        }
    }

    /// Attach a connection, replacing any previous one for the client
    pub fn attach(&self, client_id: ClientId, conn: Arc<dyn Connection>) {
        self.connections.insert(client_id, conn);
    }

    /// Detach the client's connection
    pub fn detach(&self, client_id: &ClientId) -> Option<Arc<dyn Connection>> {
        self.connections.remove(client_id).map(|(_, conn)| conn)
    }

    pub fn is_attached(&self, client_id: &ClientId) -> bool {
        self.connections.contains_key(client_id)
    }

    /// Count attached connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionLookup for ConnectionRegistry {
    // Connections are only ever created by the transport, so
    // `create_if_missing` has nothing to create here.
    fn connection(
        &self,
        client_id: &ClientId,
        _create_if_missing: bool,
    ) -> Option<Arc<dyn Connection>> {
        self.connections.get(client_id).map(|e| Arc::clone(e.value()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<Message>>);

    impl Connection for Recorder {
        fn deliver(&self, message: Message) {
            self.0.lock().push(message);
        }
    }

    #[test]
    fn test_attach_lookup_detach() {
        let registry = ConnectionRegistry::new();
        let id = ClientId::from("abc");
        assert!(registry.connection(&id, false).is_none());

        let recorder = Arc::new(Recorder::default());
        registry.attach(id.clone(), recorder.clone());
        assert!(registry.is_attached(&id));
        assert_eq!(registry.connection_count(), 1);

        let conn = registry.connection(&id, false).unwrap();
        conn.deliver(Message::new("/foo", serde_json::json!("x")));
        assert_eq!(recorder.0.lock().len(), 1);

        assert!(registry.detach(&id).is_some());
        assert!(registry.connection(&id, true).is_none());
        assert!(registry.detach(&id).is_none());
    }
}
