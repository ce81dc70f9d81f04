//! Connection registry: the authoritative map of live connections.
//!
//! Presence in the registry is what "connected" means to the relay.
//! Handles are `Arc`'d so fan-out can send to a connection from any
//! task while the owning task sits in `recv`.

use std::collections::HashMap;
use std::sync::Arc;

use lanchat_protocol::ClientId;

/// Live connections keyed by [`ClientId`]. Generic so tests can use a
/// stub connection type.
#[derive(Debug)]
pub struct ConnectionRegistry<C> {
    conns: HashMap<ClientId, Arc<C>>,
}

impl<C> Default for ConnectionRegistry<C> {
    fn default() -> Self {
        Self {
            conns: HashMap::new(),
        }
    }
}

impl<C> ConnectionRegistry<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a newly accepted connection.
    pub fn register(&mut self, id: ClientId, conn: Arc<C>) {
        self.conns.insert(id, conn);
        tracing::debug!(%id, total = self.conns.len(), "connection registered");
    }

    /// Removes a connection. Idempotent; returns the handle if it was
    /// still present, which tells the caller whether the disconnect
    /// cascade has already run.
    pub fn unregister(&mut self, id: ClientId) -> Option<Arc<C>> {
        let removed = self.conns.remove(&id);
        if removed.is_some() {
            tracing::debug!(%id, total = self.conns.len(), "connection unregistered");
        }
        removed
    }

    /// Handle for a single connection.
    pub fn get(&self, id: ClientId) -> Option<&Arc<C>> {
        self.conns.get(&id)
    }

    /// Iterates all live connections.
    pub fn iter(&self) -> impl Iterator<Item = (ClientId, &Arc<C>)> {
        self.conns.iter().map(|(id, conn)| (*id, conn))
    }

    pub fn len(&self) -> usize {
        self.conns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conns.is_empty()
    }
}
