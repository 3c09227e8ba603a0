//! Synchronous change notifications for port observers.
//!
//! Listeners run on the thread that performed the change, after the change is
//! complete and before the mutating call returns. No port lock is held while
//! they run, so a listener may query the port.

use crate::mode::Direction;
use parking_lot::Mutex;
use smallvec::SmallVec;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortNotification {
    ReadablePortsChanged,
    WritablePortsChanged,
    ModeChanged,
}

impl PortNotification {
    pub fn ports_changed(direction: Direction) -> Self {
        match direction {
            Direction::Input => PortNotification::ReadablePortsChanged,
            Direction::Output => PortNotification::WritablePortsChanged,
        }
    }
}

pub type ListenerId = u64;

type Listener = Arc<dyn Fn(PortNotification) + Send + Sync>;

pub(crate) struct Notifier {
    listeners: Mutex<Vec<(ListenerId, Listener)>>,
    next_id: AtomicU64,
}

impl Notifier {
    pub(crate) fn new() -> Self {
        Self {
            listeners: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub(crate) fn add(&self, listener: Listener) -> ListenerId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.lock().push((id, listener));
        id
    }

    pub(crate) fn remove(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != before
    }

    pub(crate) fn emit(&self, notification: PortNotification) {
        let listeners: SmallVec<[Listener; 4]> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(notification);
        }
    }
}
