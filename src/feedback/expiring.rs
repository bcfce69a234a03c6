use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

struct Slot<T> {
    generation: u64,
    value: Option<T>,
}

/// A value that optionally clears itself after a delay.
///
/// Setting or clearing the value aborts the pending expiry, and so does dropping it.
/// Scheduling needs a tokio runtime.
pub struct Expiring<T> {
    slot: Arc<Mutex<Slot<T>>>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl<T: Clone + Send + 'static> Expiring<T> {
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Mutex::new(Slot {
                generation: 0,
                value: None,
            })),
            timer: Mutex::new(None),
        }
    }

    pub fn get(&self) -> Option<T> {
        self.slot.lock().value.clone()
    }

    /// Store `value`. With `ttl`, it is cleared once the delay elapses.
    pub fn set(&self, value: T, ttl: Option<Duration>) {
        self.cancel_timer();

        let generation = {
            let mut slot = self.slot.lock();
            slot.generation += 1;
            slot.value = Some(value);
            slot.generation
        };

        if let Some(ttl) = ttl {
            let slot = self.slot.clone();
            let handle = tokio::spawn(async move {
                tokio::time::sleep(ttl).await;
                let mut slot = slot.lock();
                // A newer value may have raced in after the abort was issued
                if slot.generation == generation {
                    slot.value = None;
                    tracing::trace!("Expiring value cleared after {:?}", ttl);
                }
            });
            *self.timer.lock() = Some(handle);
        }
    }

    pub fn clear(&self) {
        self.cancel_timer();
        let mut slot = self.slot.lock();
        slot.generation += 1;
        slot.value = None;
    }

    /// Whether an expiry is pending.
    pub fn is_scheduled(&self) -> bool {
        self.timer
            .lock()
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    fn cancel_timer(&self) {
        if let Some(handle) = self.timer.lock().take() {
            handle.abort();
        }
    }
}

impl<T: Clone + Send + 'static> Default for Expiring<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for Expiring<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.timer.get_mut().take() {
            handle.abort();
        }
    }
}
