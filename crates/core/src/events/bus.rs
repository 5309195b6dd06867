use std::sync::Arc;
use tokio::sync::broadcast;

use super::types::CacheEvent;

/// In-process broadcast of cache events.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: Arc<broadcast::Sender<CacheEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Publish to all current subscribers. Returns how many received it;
    /// having no subscribers is not an error.
    pub fn publish(&self, event: CacheEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
