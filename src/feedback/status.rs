use std::time::Duration;

use super::expiring::Expiring;

/// Transient status message that clears itself.
pub struct StatusLine {
    message: Expiring<String>,
    clear_after: Duration,
}

impl StatusLine {
    pub fn new(clear_after: Duration) -> Self {
        Self {
            message: Expiring::new(),
            clear_after,
        }
    }

    pub fn set(&self, message: impl Into<String>) {
        self.message.set(message.into(), Some(self.clear_after));
    }

    pub fn get(&self) -> Option<String> {
        self.message.get()
    }

    pub fn clear(&self) {
        self.message.clear();
    }
}
