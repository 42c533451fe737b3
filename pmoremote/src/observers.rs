use std::collections::HashMap;

use tokio::sync::mpsc;

/// Handle returned by `subscribe`, used to unsubscribe later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverToken(u64);

/// Unordered set of event subscribers. Subscribers whose receiver has been
/// dropped are pruned on the next broadcast.
#[derive(Debug)]
pub struct ObserverSet<E> {
    next_token: u64,
    subscribers: HashMap<ObserverToken, mpsc::UnboundedSender<E>>,
}

impl<E> Default for ObserverSet<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> ObserverSet<E> {
    pub fn new() -> Self {
        Self {
            next_token: 0,
            subscribers: HashMap::new(),
        }
    }

    pub fn subscribe(&mut self) -> (ObserverToken, mpsc::UnboundedReceiver<E>) {
        let (tx, rx) = mpsc::unbounded_channel::<E>();
        self.next_token += 1;
        let token = ObserverToken(self.next_token);
        self.subscribers.insert(token, tx);
        (token, rx)
    }

    /// Returns false when the token was not registered.
    pub fn unsubscribe(&mut self, token: ObserverToken) -> bool {
        self.subscribers.remove(&token).is_some()
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    pub fn clear(&mut self) {
        self.subscribers.clear();
    }
}

impl<E: Clone> ObserverSet<E> {
    pub fn broadcast(&mut self, event: E) {
        self.subscribers
            .retain(|_, tx| tx.send(event.clone()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broadcast_reaches_every_subscriber() {
        let mut observers = ObserverSet::<u32>::new();
        let (_, mut a) = observers.subscribe();
        let (_, mut b) = observers.subscribe();

        observers.broadcast(5);

        assert_eq!(a.try_recv().ok(), Some(5));
        assert_eq!(b.try_recv().ok(), Some(5));
    }

    #[test]
    fn test_unsubscribe_and_prune() {
        let mut observers = ObserverSet::<u32>::new();
        let (first, _first_rx) = observers.subscribe();
        let (second, dropped_rx) = observers.subscribe();
        assert_ne!(first, second);
        assert_eq!(observers.len(), 2);

        assert!(observers.unsubscribe(first));
        assert!(!observers.unsubscribe(first));

        drop(dropped_rx);
        observers.broadcast(1);
        assert!(observers.is_empty());
    }
}
