//! Single-slot cooperative timer
//!
//! Each gesture timer (long-press, auto-repeat, reshow, reconnect) owns one
//! of these. Arming cancels any prior instance, firing clears the slot
//! before the action runs, and cancelling an already-fired timer is a no-op.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// One outstanding deferred action.
///
/// Must be armed from within a `tokio::task::LocalSet`.
#[derive(Clone, Default)]
pub struct Timer {
    slot: Rc<RefCell<Option<JoinHandle<()>>>>,
}

impl Timer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the timer, replacing any pending instance.
    pub fn arm(&self, delay: Duration, action: impl FnOnce() + 'static) {
        self.cancel();
        let slot = self.slot.clone();
        let handle = tokio::task::spawn_local(async move {
            tokio::time::sleep(delay).await;
            // Clear the slot first: the action must observe a fired timer,
            // and may immediately re-arm.
            slot.borrow_mut().take();
            action();
        });
        *self.slot.borrow_mut() = Some(handle);
    }

    /// Cancel a pending instance. Returns `true` when an unfired timer was
    /// actually cancelled, `false` when the slot was empty (never armed, or
    /// already fired).
    pub fn cancel(&self) -> bool {
        match self.slot.borrow_mut().take() {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Whether an unfired instance is outstanding.
    pub fn pending(&self) -> bool {
        self.slot.borrow().is_some()
    }
}
