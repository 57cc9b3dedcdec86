use super::{ClientId, Engine, EngineStats};
use crate::Message;
use tracing::debug;

impl Engine {
    /// Fan a message out to every client whose subscriptions match its
    /// channel, then try to deliver to each of them
    ///
    /// Returns the number of distinct recipients.
    pub fn publish(&self, message: Message) -> usize {
        debug!("Publishing message on {}", message.channel);
        EngineStats::incr(&self.inner.stats.messages_published, 1);

        let recipients = {
            let mut state = self.inner.state.lock();
            let recipients = state.index.matching_clients(&message.channel);
            for client_id in &recipients {
                if state.queue.enqueue(client_id, &message) {
                    EngineStats::incr(&self.inner.stats.messages_queued, 1);
                    debug!("Queueing for client {}: {:?}", client_id, message);
                }
            }
            recipients
        };

        for client_id in &recipients {
            self.flush(client_id);
        }

        recipients.len()
    }

    /// Hand the client's pending messages to its connection, if it has one
    ///
    /// The queue is detached before delivery starts, so a message is handed
    /// off at most once. Returns the number of messages handed off.
    pub fn flush(&self, client_id: &ClientId) -> usize {
        if !self.inner.state.lock().queue.has_pending(client_id) {
            return 0;
        }
        let Some(conn) = self.inner.connections.connection(client_id, false) else {
            return 0;
        };

        let Some(messages) = self.inner.state.lock().queue.take(client_id) else {
            return 0;
        };

        let count = messages.len();
        debug!("Delivering {} messages to client {}", count, client_id);
        for message in messages {
            conn.deliver(message);
        }

        EngineStats::incr(&self.inner.stats.messages_delivered, count);
        count
    }
}

#[cfg(test)]
mod tests {
    use crate::connection::{Connection, ConnectionRegistry};
    use crate::{Config, Engine, Message};
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::Arc;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<Message>>);

    impl Connection for Recorder {
        fn deliver(&self, message: Message) {
            self.0.lock().push(message);
        }
    }

    fn setup() -> (Engine, Arc<ConnectionRegistry>) {
        let connections = Arc::new(ConnectionRegistry::new());
        let engine = Engine::new(Config::default(), connections.clone()).unwrap();
        (engine, connections)
    }

    #[test]
    fn test_publish_without_connection_keeps_queue() {
        let (engine, _) = setup();
        let id = engine.create_client();
        engine.subscribe(&id, "/foo");

        assert_eq!(engine.publish(Message::new("/foo", json!("x"))), 1);
        assert_eq!(engine.pending(&id).len(), 1);
        assert_eq!(engine.flush(&id), 0);
        assert_eq!(engine.pending(&id).len(), 1);
    }

    #[test]
    fn test_publish_with_connection_delivers_immediately() {
        let (engine, connections) = setup();
        let id = engine.create_client();
        let recorder = Arc::new(Recorder::default());
        connections.attach(id.clone(), recorder.clone());
        engine.subscribe(&id, "/foo/**");

        engine.publish(Message::new("/foo/bar/baz", json!(1)));

        assert_eq!(recorder.0.lock().len(), 1);
        assert!(engine.pending(&id).is_empty());
    }

    #[test]
    fn test_identical_pending_messages_collapse() {
        let (engine, _) = setup();
        let id = engine.create_client();
        engine.subscribe(&id, "/foo");

        engine.publish(Message::new("/foo", json!("same")));
        engine.publish(Message::new("/foo", json!("same")));
        engine.publish(Message::new("/foo", json!("other")));

        assert_eq!(engine.pending(&id).len(), 2);
    }

    #[test]
    fn test_publish_to_unmatched_channel() {
        let (engine, _) = setup();
        let id = engine.create_client();
        engine.subscribe(&id, "/foo");

        assert_eq!(engine.publish(Message::new("/bar", json!("x"))), 0);
        assert!(engine.pending(&id).is_empty());
    }
}
