//! Injectable pub/sub for user-visible notifications.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use trafficops_core::notification::{Notification, Notifier};

/// Callback type for notification listeners.
pub type NotificationListener = Arc<dyn Fn(&Notification) + Send + Sync>;

/// Handle returned by [`NotificationHub::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Fan-out of notifications to subscribed listeners.
///
/// Each hub is an ordinary value: the owner decides its lifetime and who
/// may subscribe. Listeners are called in subscription order, outside the
/// lock, so a listener may subscribe or unsubscribe while being called.
#[derive(Default)]
pub struct NotificationHub {
    next_id: AtomicU64,
    listeners: RwLock<Vec<(SubscriptionId, NotificationListener)>>,
}

impl NotificationHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: NotificationListener) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((id, listener));
        id
    }

    /// Removes a listener. Returns false if it was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self
            .listeners
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

impl Notifier for NotificationHub {
    fn notify(&self, notification: Notification) {
        let snapshot: Vec<NotificationListener> = self
            .listeners
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        tracing::debug!(
            "[NotificationHub] {} -> {} listener(s): {}",
            notification.level,
            snapshot.len(),
            notification.message
        );

        for listener in snapshot {
            listener(&notification);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn recorder() -> (Arc<Mutex<Vec<String>>>, NotificationListener) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let listener: NotificationListener = Arc::new(move |n: &Notification| {
            sink.lock().unwrap().push(n.message.clone());
        });
        (seen, listener)
    }

    #[test]
    fn test_subscribe_and_unsubscribe() {
        let hub = NotificationHub::new();
        let (first, first_listener) = recorder();
        let (second, second_listener) = recorder();

        let first_id = hub.subscribe(first_listener);
        hub.subscribe(second_listener);
        hub.notify(Notification::info("one"));

        assert!(hub.unsubscribe(first_id));
        assert!(!hub.unsubscribe(first_id));
        hub.notify(Notification::success("two"));

        assert_eq!(*first.lock().unwrap(), vec!["one"]);
        assert_eq!(*second.lock().unwrap(), vec!["one", "two"]);
        assert_eq!(hub.listener_count(), 1);
    }

    #[test]
    fn test_hubs_are_independent() {
        let a = NotificationHub::new();
        let b = NotificationHub::new();
        let (seen, listener) = recorder();
        a.subscribe(listener);

        b.notify(Notification::error("elsewhere"));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_listener_may_unsubscribe_itself() {
        let hub = Arc::new(NotificationHub::new());
        let id_slot: Arc<Mutex<Option<SubscriptionId>>> = Arc::new(Mutex::new(None));

        let hub_ref = Arc::clone(&hub);
        let slot = Arc::clone(&id_slot);
        let id = hub.subscribe(Arc::new(move |_: &Notification| {
            if let Some(id) = *slot.lock().unwrap() {
                hub_ref.unsubscribe(id);
            }
        }));
        *id_slot.lock().unwrap() = Some(id);

        hub.notify(Notification::warning("once"));
        assert_eq!(hub.listener_count(), 0);
    }
}
