use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::models::frame::Frame;
use crate::traits::capture_observer::CaptureObserver;

/// A single-subscriber slot. The most recent registration wins.
pub struct ListenerSlot<T: ?Sized> {
    current: Mutex<Option<(u64, Arc<T>)>>,
    next_id: AtomicU64,
}

impl<T: ?Sized + Send + Sync + 'static> ListenerSlot<T> {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            current: Mutex::new(None),
            next_id: AtomicU64::new(1),
        })
    }

    /// Install `listener`, replacing any previous one.
    pub fn register(self: &Arc<Self>, listener: Arc<T>) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        *self.current.lock() = Some((id, listener));

        let slot: Arc<dyn Cancel> = self.clone();
        Subscription {
            slot: Arc::downgrade(&slot),
            id,
        }
    }

    /// Snapshot of the current listener. The lock is released before the
    /// caller invokes it, so registration changes never block delivery.
    pub fn get(&self) -> Option<Arc<T>> {
        self.current.lock().as_ref().map(|(_, l)| Arc::clone(l))
    }

    pub fn clear(&self) {
        self.current.lock().take();
    }

    pub fn is_registered(&self) -> bool {
        self.current.lock().is_some()
    }
}

trait Cancel: Send + Sync {
    fn cancel(&self, id: u64) -> bool;
}

impl<T: ?Sized + Send + Sync> Cancel for ListenerSlot<T> {
    fn cancel(&self, id: u64) -> bool {
        let mut current = self.current.lock();
        match current.as_ref() {
            Some((active, _)) if *active == id => {
                current.take();
                true
            }
            _ => false,
        }
    }
}

/// Handle returned by a listener registration.
///
/// Dropping the handle leaves the listener installed; call [`cancel`] to
/// remove it. Cancelling after a newer registration replaced this one does
/// nothing.
///
/// [`cancel`]: Subscription::cancel
#[must_use = "keep the subscription to be able to cancel it"]
pub struct Subscription {
    slot: Weak<dyn Cancel>,
    id: u64,
}

impl Subscription {
    /// Remove the listener if it is still the active one.
    pub fn cancel(self) -> bool {
        match self.slot.upgrade() {
            Some(slot) => slot.cancel(self.id),
            None => false,
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

/// Frame consumer and observer slots for one session.
#[derive(Clone)]
pub(crate) struct Listeners {
    pub frames: Arc<ListenerSlot<dyn Fn(Frame) + Send + Sync>>,
    pub observer: Arc<ListenerSlot<dyn CaptureObserver>>,
}

impl Listeners {
    pub fn new() -> Self {
        Self {
            frames: ListenerSlot::new(),
            observer: ListenerSlot::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Callback = dyn Fn() -> u32 + Send + Sync;

    #[test]
    fn last_registration_wins() {
        let slot: Arc<ListenerSlot<Callback>> = ListenerSlot::new();
        let _first = slot.register(Arc::new(|| 1u32));
        let _second = slot.register(Arc::new(|| 2u32));

        assert_eq!(slot.get().map(|f| f()), Some(2));
    }

    #[test]
    fn cancel_removes_active_listener() {
        let slot: Arc<ListenerSlot<Callback>> = ListenerSlot::new();
        let sub = slot.register(Arc::new(|| 1u32));

        assert!(sub.cancel());
        assert!(!slot.is_registered());
    }

    #[test]
    fn stale_cancel_keeps_newer_listener() {
        let slot: Arc<ListenerSlot<Callback>> = ListenerSlot::new();
        let stale = slot.register(Arc::new(|| 1u32));
        let _fresh = slot.register(Arc::new(|| 2u32));

        assert!(!stale.cancel());
        assert_eq!(slot.get().map(|f| f()), Some(2));
    }

    #[test]
    fn cancel_after_slot_dropped() {
        let slot: Arc<ListenerSlot<Callback>> = ListenerSlot::new();
        let sub = slot.register(Arc::new(|| 1u32));
        drop(slot);

        assert!(!sub.cancel());
    }

    #[test]
    fn snapshot_survives_concurrent_clear() {
        let slot: Arc<ListenerSlot<Callback>> = ListenerSlot::new();
        let _sub = slot.register(Arc::new(|| 7u32));

        let snapshot = slot.get();
        slot.clear();

        assert_eq!(snapshot.map(|f| f()), Some(7));
        assert!(slot.get().is_none());
    }
}
