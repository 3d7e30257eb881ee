//! Broadcast channel for invalidation notices.
//!
//! [`InvalidationBus`] wraps a [`tokio::sync::broadcast`] channel. Every
//! successful mutation publishes one [`Invalidation`] per affected
//! [`ResourceKey`], and every live resource watcher subscribes to pick out
//! the keys it cares about.

use tokio::sync::broadcast;

use super::{Invalidation, ResourceKey};

/// Broadcast bus for [`Invalidation`]s.
///
/// Backed by a `tokio::broadcast` channel with a configurable capacity.
/// When the ring buffer is full, the oldest notices are dropped for
/// lagging receivers, which then refetch unconditionally.
#[derive(Debug, Clone)]
pub struct InvalidationBus {
    sender: broadcast::Sender<Invalidation>,
}

impl InvalidationBus {
    /// Creates a new `InvalidationBus` with the given channel capacity.
    ///
    /// A capacity of zero is raised to one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes a notice for `key` to all subscribers.
    ///
    /// Returns the number of receivers that got the notice. With no active
    /// receivers the notice is dropped.
    pub fn publish(&self, key: ResourceKey) -> usize {
        tracing::trace!(resource = key.kind_str(), ?key, "invalidate");
        self.sender.send(Invalidation::now(key)).unwrap_or(0)
    }

    /// Publishes a notice for each key in order.
    pub fn publish_all(&self, keys: impl IntoIterator<Item = ResourceKey>) {
        for key in keys {
            let _ = self.publish(key);
        }
    }

    /// Creates a new receiver that will receive all future notices.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Invalidation> {
        self.sender.subscribe()
    }

    /// Returns the current number of active receivers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for InvalidationBus {
    fn default() -> Self {
        Self::new(1024)
    }
}
