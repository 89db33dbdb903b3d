use crate::domain::VersionEvent;

type Subscriber = Box<dyn FnMut(&VersionEvent) + Send>;

/// Synchronous, in-order event delivery to registered subscribers
#[derive(Default)]
pub struct EventBus {
    subscribers: Vec<Subscriber>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber; subscribers are called in registration order.
    pub fn subscribe<F>(&mut self, subscriber: F)
    where
        F: FnMut(&VersionEvent) + Send + 'static,
    {
        self.subscribers.push(Box::new(subscriber));
    }

    pub fn publish(&mut self, event: &VersionEvent) {
        for subscriber in self.subscribers.iter_mut() {
            subscriber(event);
        }
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}
