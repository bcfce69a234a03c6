//! Play/stop state on top of an execution adapter.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::{EngineError, ExecutionAdapter};

/// Tracks whether the engine is playing.
///
/// The status only flips to playing after `run` succeeded, and stop failures are logged
/// and swallowed.
pub struct Playback {
    adapter: Arc<dyn ExecutionAdapter>,
    playing: AtomicBool,
}

impl Playback {
    pub fn new(adapter: Arc<dyn ExecutionAdapter>) -> Self {
        Self {
            adapter,
            playing: AtomicBool::new(false),
        }
    }

    pub fn adapter(&self) -> &Arc<dyn ExecutionAdapter> {
        &self.adapter
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    /// Run the loaded code. A failed run replaces whatever was playing, so the status
    /// becomes stopped.
    pub async fn play(&self) -> Result<(), EngineError> {
        match self.adapter.run().await {
            Ok(()) => {
                self.playing.store(true, Ordering::SeqCst);
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Engine run failed: {}", e);
                self.playing.store(false, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    /// Stop playback. Never fails.
    pub async fn stop(&self) {
        if let Err(e) = self.adapter.stop().await {
            tracing::warn!("Engine stop failed (ignored): {}", e);
        }
        self.playing.store(false, Ordering::SeqCst);
    }

    /// Flip between playing and stopped; returns the new playing status.
    pub async fn toggle(&self) -> Result<bool, EngineError> {
        if self.is_playing() {
            self.stop().await;
            Ok(false)
        } else {
            self.play().await?;
            Ok(true)
        }
    }
}
