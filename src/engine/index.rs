use super::ClientId;
use crate::channel;
use std::collections::{HashMap, HashSet};

/// Bidirectional client <-> channel subscription index
///
/// Both directions are always updated together; a channel is in
/// `client_channels[c]` exactly when `c` is in `channel_clients[channel]`.
#[derive(Debug, Default)]
pub struct SubscriptionIndex {
    client_channels: HashMap<ClientId, HashSet<String>>,
    channel_clients: HashMap<String, HashSet<ClientId>>,
}

impl SubscriptionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensure the client has a (possibly empty) subscription set
    pub fn register(&mut self, client_id: &ClientId) {
        self.client_channels.entry(client_id.clone()).or_default();
    }

    /// Add the pair to both directions, returning whether it was new
    pub fn subscribe(&mut self, client_id: &ClientId, channel: &str) -> bool {
        let added = self
            .client_channels
            .entry(client_id.clone())
            .or_default()
            .insert(channel.to_string());

        self.channel_clients
            .entry(channel.to_string())
            .or_default()
            .insert(client_id.clone());

        added
    }

    /// Remove the pair from both directions, returning whether it existed
    pub fn unsubscribe(&mut self, client_id: &ClientId, channel: &str) -> bool {
        let removed = self
            .client_channels
            .get_mut(client_id)
            .map(|channels| channels.remove(channel))
            .unwrap_or(false);

        if let Some(clients) = self.channel_clients.get_mut(channel) {
            clients.remove(client_id);
            if clients.is_empty() {
                self.channel_clients.remove(channel);
            }
        }

        removed
    }

    /// Unsubscribe the client from every channel and forget it
    ///
    /// Returns the channels it was subscribed to.
    pub fn remove_client(&mut self, client_id: &ClientId) -> Vec<String> {
        let channels: Vec<String> = self
            .client_channels
            .get(client_id)
            .map(|c| c.iter().cloned().collect())
            .unwrap_or_default();

        for channel in &channels {
            self.unsubscribe(client_id, channel);
        }
        self.client_channels.remove(client_id);

        channels
    }

    pub fn has_client(&self, client_id: &ClientId) -> bool {
        self.client_channels.contains_key(client_id)
    }

    /// Distinct clients whose subscriptions match a message on `published`
    pub fn matching_clients(&self, published: &str) -> HashSet<ClientId> {
        let mut clients = HashSet::new();
        for pattern in channel::expand(published) {
            if let Some(subs) = self.channel_clients.get(&pattern) {
                clients.extend(subs.iter().cloned());
            }
        }
        clients
    }

    pub fn subscriptions(&self, client_id: &ClientId) -> Vec<String> {
        self.client_channels
            .get(client_id)
            .map(|c| c.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn subscribers(&self, channel: &str) -> Vec<ClientId> {
        self.channel_clients
            .get(channel)
            .map(|c| c.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn channel_count(&self) -> usize {
        self.channel_clients.len()
    }

    #[cfg(test)]
    fn is_consistent(&self) -> bool {
        let forward = self.client_channels.iter().all(|(client, channels)| {
            channels.iter().all(|ch| {
                self.channel_clients
                    .get(ch)
                    .is_some_and(|clients| clients.contains(client))
            })
        });
        let backward = self.channel_clients.iter().all(|(ch, clients)| {
            clients.iter().all(|client| {
                self.client_channels
                    .get(client)
                    .is_some_and(|channels| channels.contains(ch))
            })
        });
        forward && backward
    }
}
