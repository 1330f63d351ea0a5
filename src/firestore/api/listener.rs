use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};

use crate::firestore::error::FirestoreResult;

use super::query::QuerySnapshot;

/// Callback receiving every snapshot (or error) of a watched query.
pub type SnapshotListener = Arc<dyn Fn(FirestoreResult<QuerySnapshot>) + Send + Sync + 'static>;

/// Handle returned when registering a snapshot listener.
///
/// The listener stays attached while the handle is alive; call [`remove`](Self::remove)
/// or drop the handle to detach it. Once detaching returns, no callback is
/// running and none will start, except that a callback which detaches its own
/// registration finishes the call it is in.
#[must_use = "dropping the registration detaches the listener"]
pub struct ListenerRegistration {
    detach: Option<Box<dyn FnOnce() + Send + Sync + 'static>>,
}

impl ListenerRegistration {
    pub fn new<F>(detach: F) -> Self
    where
        F: FnOnce() + Send + Sync + 'static,
    {
        Self {
            detach: Some(Box::new(detach)),
        }
    }

    pub fn remove(mut self) {
        self.detach_now();
    }

    pub fn is_active(&self) -> bool {
        self.detach.is_some()
    }

    fn detach_now(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl Drop for ListenerRegistration {
    fn drop(&mut self) {
        self.detach_now();
    }
}

impl fmt::Debug for ListenerRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistration")
            .field("active", &self.is_active())
            .finish()
    }
}

/// Serializes callback delivery against detaching.
///
/// [`close`](Self::close) waits for an in-flight callback on another thread;
/// called from inside the callback it only marks the gate closed.
#[derive(Default)]
pub(crate) struct DeliveryGate {
    closed: AtomicBool,
    delivery: Mutex<()>,
    delivering_on: Mutex<Option<ThreadId>>,
}

impl DeliveryGate {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn is_open(&self) -> bool {
        !self.closed.load(Ordering::SeqCst)
    }

    /// Runs `callback` unless the gate is closed; returns whether it ran.
    pub(crate) fn deliver<F: FnOnce()>(&self, callback: F) -> bool {
        let _delivering = self.delivery.lock().unwrap();
        if !self.is_open() {
            return false;
        }
        *self.delivering_on.lock().unwrap() = Some(thread::current().id());
        callback();
        *self.delivering_on.lock().unwrap() = None;
        true
    }

    pub(crate) fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        let inside_callback = *self.delivering_on.lock().unwrap() == Some(thread::current().id());
        if !inside_callback {
            drop(self.delivery.lock().unwrap());
        }
    }
}
