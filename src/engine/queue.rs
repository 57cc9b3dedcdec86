use super::ClientId;
use crate::Message;
use std::collections::{HashMap, HashSet};

/// Per-client sets of undelivered messages
///
/// A client's set is created on first enqueue and removed whole when it is
/// handed to a connection or discarded.
#[derive(Debug, Default)]
pub struct MessageQueue {
    pending: HashMap<ClientId, HashSet<Message>>,
}

impl MessageQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a message, returning false if an identical one is already pending
    pub fn enqueue(&mut self, client_id: &ClientId, message: &Message) -> bool {
        let queue = self.pending.entry(client_id.clone()).or_default();
        if queue.contains(message) {
            return false;
        }
        queue.insert(message.clone())
    }

    /// Detach the client's whole queue
    pub fn take(&mut self, client_id: &ClientId) -> Option<HashSet<Message>> {
        self.pending.remove(client_id).filter(|q| !q.is_empty())
    }

    /// Drop the client's queue, returning how many messages were discarded
    pub fn discard(&mut self, client_id: &ClientId) -> usize {
        self.pending.remove(client_id).map(|q| q.len()).unwrap_or(0)
    }

    pub fn len(&self, client_id: &ClientId) -> usize {
        self.pending.get(client_id).map(|q| q.len()).unwrap_or(0)
    }

    pub fn has_pending(&self, client_id: &ClientId) -> bool {
        self.len(client_id) > 0
    }

    pub fn snapshot(&self, client_id: &ClientId) -> Vec<Message> {
        self.pending
            .get(client_id)
            .map(|q| q.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Total messages pending across all clients
    pub fn total(&self) -> usize {
        self.pending.values().map(|q| q.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_enqueue_has_set_semantics() {
        let mut queue = MessageQueue::new();
        let a = ClientId::from("a");
        let msg = Message::new("/foo", json!("x"));

        assert!(queue.enqueue(&a, &msg));
        assert!(!queue.enqueue(&a, &msg.clone()));
        assert!(queue.enqueue(&a, &Message::new("/foo", json!("y"))));
        assert_eq!(queue.len(&a), 2);
        assert_eq!(queue.total(), 2);
    }

    #[test]
    fn test_take_detaches_queue() {
        let mut queue = MessageQueue::new();
        let a = ClientId::from("a");
        queue.enqueue(&a, &Message::new("/foo", json!(1)));

        let taken = queue.take(&a).unwrap();
        assert_eq!(taken.len(), 1);
        assert!(!queue.has_pending(&a));
        assert!(queue.take(&a).is_none());
    }

    #[test]
    fn test_discard_counts_messages() {
        let mut queue = MessageQueue::new();
        let a = ClientId::from("a");
        let b = ClientId::from("b");
        queue.enqueue(&a, &Message::new("/foo", json!(1)));
        queue.enqueue(&a, &Message::new("/foo", json!(2)));
        queue.enqueue(&b, &Message::new("/foo", json!(1)));

        assert_eq!(queue.discard(&a), 2);
        assert_eq!(queue.discard(&a), 0);
        assert_eq!(queue.snapshot(&b).len(), 1);
    }
}
