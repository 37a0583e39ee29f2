//! Single-slot frame gate
//!
//! Bounds recognition work per connection: one frame in flight (owned by the
//! worker) plus at most one waiting. A frame offered while another is waiting
//! replaces it; the replaced frame is dropped and counted.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::Notify;

pub struct FrameGate<T> {
    slot: Mutex<Option<T>>,
    notify: Notify,
    coalesced: AtomicU64,
}

impl<T> FrameGate<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            notify: Notify::new(),
            coalesced: AtomicU64::new(0),
        }
    }

    fn lock_slot(&self) -> MutexGuard<'_, Option<T>> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Park a frame for the worker
    ///
    /// Returns `true` when it displaced a frame that was still waiting.
    pub fn offer(&self, frame: T) -> bool {
        let replaced = self.lock_slot().replace(frame).is_some();
        if replaced {
            self.coalesced.fetch_add(1, Ordering::Relaxed);
        }
        self.notify.notify_one();
        replaced
    }

    /// Wait for the next frame
    pub async fn next(&self) -> T {
        loop {
            let waiting = self.lock_slot().take();
            if let Some(frame) = waiting {
                return frame;
            }
            // notify_one stores a permit when nobody is waiting, so an offer
            // racing between the take above and this await is not lost
            self.notify.notified().await;
        }
    }

    /// Frames dropped because a newer one replaced them
    pub fn coalesced(&self) -> u64 {
        self.coalesced.load(Ordering::Relaxed)
    }

    #[cfg(test)]
    fn is_waiting(&self) -> bool {
        self.lock_slot().is_some()
    }
}

impl<T> Default for FrameGate<T> {
    fn default() -> Self {
        Self::new()
    }
}
