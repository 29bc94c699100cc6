//! Single-slot listener registration.
//!
//! Registering a listener replaces the previous one instead of stacking
//! handlers, so each inbound event is delivered at most once: the last
//! subscriber wins.

use std::sync::{
    Mutex, PoisonError,
    atomic::{AtomicU64, Ordering},
};

use tokio::sync::mpsc;

use crate::domain::ListenerId;

/// Holds at most one listener channel for one event kind
#[derive(Debug)]
pub struct ListenerSlot<T> {
    next_id: AtomicU64,
    current: Mutex<Option<(ListenerId, mpsc::UnboundedSender<T>)>>,
}

impl<T> Default for ListenerSlot<T> {
    fn default() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            current: Mutex::new(None),
        }
    }
}

impl<T> ListenerSlot<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `listener`, dropping the previous one (its receiver sees the
    /// channel close).
    pub fn replace(&self, listener: mpsc::UnboundedSender<T>) -> ListenerId {
        let id = ListenerId::new(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if current.replace((id, listener)).is_some() {
            tracing::debug!("Replaced existing listener with {:?}", id);
        }
        id
    }

    /// Remove the listener if `id` still owns the slot.
    ///
    /// Returns whether a listener was removed.
    pub fn clear(&self, id: ListenerId) -> bool {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        match current.as_ref() {
            Some((owner, _)) if *owner == id => {
                current.take();
                true
            }
            _ => false,
        }
    }

    /// Deliver `value` to the current listener.
    ///
    /// Returns whether a listener received it. A listener whose receiver has
    /// been dropped is removed.
    pub fn emit(&self, value: T) -> bool {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        let Some((id, sender)) = current.as_ref() else {
            return false;
        };
        if sender.send(value).is_err() {
            tracing::debug!("Listener {:?} is gone, clearing slot", id);
            current.take();
            return false;
        }
        true
    }

    pub fn is_registered(&self) -> bool {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}
