//! One generation turn, end to end.
//!
//! ```text
//! Idle -> Submitting -> Streaming -> Extracting -> Applying -> Executing -> Idle
//! ```
//!
//! Any stage may fail. Failures before the code is committed rewrite the placeholder
//! assistant message to `✗ <message>`; an engine failure after commit leaves the turn
//! recorded and is reported on its own. Every failure is returned to the caller and
//! emitted as a [`GenerationEvent::Error`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use futures::StreamExt;
use livegen_client::{GenerationRequest, Mode, StreamChunk, CHAT_CONTEXT_LIMIT, PLACEHOLDER_STATUS};
use parking_lot::RwLock;
use tokio::sync::mpsc;

use super::backend::GenerationBackend;
use super::events::{code_diff, GenerationEvent};
use crate::engine::Playback;
use crate::error::{Result, TurnError};
use crate::extract::{Extraction, OutputExtractor};
use crate::session::SessionStore;

pub const DONE_MESSAGE: &str = "✓ done";
pub const UNCHANGED_MESSAGE: &str = "✓ no changes needed";

/// Model and credential sent with every request.
#[derive(Debug, Clone, Default)]
pub struct GenerationConfig {
    pub model: Option<String>,
    pub api_key: Option<String>,
}

/// How a call to [`GenerationOrchestrator::generate`] ended, when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Another turn was in flight; nothing happened
    Busy,
    /// The prompt was blank; nothing happened
    BlankPrompt,
    /// Code was loaded and is playing
    Applied { changed: bool },
}

/// Holds the in-flight flag for the lifetime of a turn.
struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Drives generation turns against a backend, an extractor, the engine and the store.
pub struct GenerationOrchestrator {
    store: Arc<SessionStore>,
    playback: Arc<Playback>,
    extractor: Arc<dyn OutputExtractor>,
    backend: Arc<dyn GenerationBackend>,
    config: RwLock<GenerationConfig>,
    event_tx: mpsc::UnboundedSender<GenerationEvent>,
    in_flight: AtomicBool,
}

impl GenerationOrchestrator {
    pub fn new(
        store: Arc<SessionStore>,
        playback: Arc<Playback>,
        extractor: Arc<dyn OutputExtractor>,
        backend: Arc<dyn GenerationBackend>,
        event_tx: mpsc::UnboundedSender<GenerationEvent>,
    ) -> Self {
        Self {
            store,
            playback,
            extractor,
            backend,
            config: RwLock::new(GenerationConfig::default()),
            event_tx,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn with_config(self, config: GenerationConfig) -> Self {
        *self.config.write() = config;
        self
    }

    pub fn set_config(&self, config: GenerationConfig) {
        *self.config.write() = config;
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn playback(&self) -> &Arc<Playback> {
        &self.playback
    }

    /// Whether a turn is in flight.
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Run one turn for `prompt`.
    ///
    /// Returns `Ok(TurnOutcome::Busy)` without touching any state when a turn is already
    /// in flight.
    pub async fn generate(&self, prompt: &str) -> Result<TurnOutcome> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Ok(TurnOutcome::BlankPrompt);
        }
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            tracing::info!("generate: turn already in flight, dropping prompt");
            return Ok(TurnOutcome::Busy);
        };

        let turn_id = uuid::Uuid::new_v4().to_string();
        let started_at = Instant::now();

        // Turn capture: everything the request depends on is read before any mutation
        let prior_code = self.playback.adapter().get_code();
        let mode = Mode::derive(&prior_code, self.store.default_code());
        let session = self.store.get_state();
        let config = self.config.read().clone();
        let request = GenerationRequest::new(
            prompt,
            mode,
            Some(prior_code.clone()),
            session.history_context(CHAT_CONTEXT_LIMIT),
            session.session_id.to_string(),
        )
        .with_model(config.model)
        .with_api_key(config.api_key);

        self.store.append_user_message(prompt);
        self.store.append_assistant_message(PLACEHOLDER_STATUS);

        tracing::info!(
            "generate: turn {} started (mode={}, history={})",
            turn_id,
            mode.as_str(),
            request.chat_history.len()
        );
        self.emit(GenerationEvent::Started {
            turn_id: turn_id.clone(),
            mode: mode.as_str().to_string(),
        });

        let code = match self.produce_code(&request).await {
            Ok(code) => code,
            Err(e) => {
                tracing::warn!("generate: turn {} failed: {}", turn_id, e);
                self.store
                    .update_last_assistant_message(&format!("✗ {}", e), None);
                self.emit_error(&e);
                return Err(e);
            }
        };

        let changed = self.apply(&prior_code, &code, prompt);

        if let Err(engine_error) = self.playback.play().await {
            let e = TurnError::Runtime(engine_error);
            tracing::warn!("generate: turn {} committed but failed to run: {}", turn_id, e);
            self.emit_error(&e);
            return Err(e);
        }

        let duration_ms = started_at.elapsed().as_millis() as u64;
        tracing::info!(
            "generate: turn {} completed in {}ms (changed={})",
            turn_id,
            duration_ms,
            changed
        );
        self.emit(GenerationEvent::Completed {
            turn_id,
            changed,
            duration_ms,
        });

        Ok(TurnOutcome::Applied { changed })
    }

    /// Submitting, Streaming and Extracting.
    async fn produce_code(&self, request: &GenerationRequest) -> Result<String> {
        let mut stream = self.backend.open(request).await?;

        while let Some(chunk) = stream.next().await {
            match chunk? {
                StreamChunk::TextDelta { text, accumulated } => {
                    self.emit(GenerationEvent::TextDelta {
                        delta: text,
                        accumulated,
                    });
                }
                StreamChunk::Status { message } => {
                    self.emit(GenerationEvent::Status { message });
                }
                StreamChunk::Cleared => self.emit(GenerationEvent::Cleared),
            }
        }

        let text = stream.into_text();
        if text.trim().is_empty() {
            return Err(TurnError::EmptyResponse);
        }
        tracing::debug!("produce_code: received {} chars", text.len());

        match self.extractor.parse(&text) {
            Extraction::Success { code } => Ok(code),
            Extraction::Failure {
                error,
                raw_response,
            } => Err(TurnError::Extraction {
                message: error,
                raw_response,
            }),
        }
    }

    /// Load the code into the engine and record the turn. Returns whether it changed.
    fn apply(&self, prior_code: &str, code: &str, prompt: &str) -> bool {
        let changed = !self.extractor.is_unchanged(prior_code, code);
        self.playback.adapter().set_code(code);

        if changed {
            self.store.apply_new_code(code, prompt);
            self.store
                .update_last_assistant_message(DONE_MESSAGE, Some(code));
        } else {
            self.store.set_current_code(code);
            self.store
                .update_last_assistant_message(UNCHANGED_MESSAGE, None);
        }

        self.emit(GenerationEvent::CodeApplied {
            code: code.to_string(),
            changed,
            diff: if changed {
                code_diff(prior_code, code)
            } else {
                String::new()
            },
        });
        changed
    }

    fn emit(&self, event: GenerationEvent) {
        let _ = self.event_tx.send(event);
    }

    fn emit_error(&self, error: &TurnError) {
        self.emit(GenerationEvent::Error {
            message: error.to_string(),
            error_type: error.kind().to_string(),
            raw_response: error.raw_response().map(str::to_string),
        });
    }
}
