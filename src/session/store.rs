//! Observable session store.
//!
//! Holds the single active [`Session`]. Every command mutates the state under a lock,
//! releases it, then runs one notification cycle. Listeners are invoked in subscription
//! order with a snapshot of the session. A command issued by a listener while a cycle is
//! running does not start a nested cycle; it is delivered by the running cycle once the
//! current pass is over.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use super::models::{ChatMessage, CodeRevision, Session};

type Listener = Arc<dyn Fn(&Session) + Send + Sync>;

#[derive(Default)]
struct NotifyState {
    running: bool,
    pending: usize,
}

pub struct SessionStore {
    state: Mutex<Option<Session>>,
    listeners: Mutex<Vec<(u64, Listener)>>,
    next_listener_id: AtomicU64,
    notify_state: Mutex<NotifyState>,
    default_code: String,
}

/// Handle returned by [`SessionStore::subscribe`]. Dropping it removes the listener.
pub struct Subscription {
    id: Option<u64>,
    store: Weak<SessionStore>,
}

impl Subscription {
    /// Remove the listener. Returns false if it was already gone.
    pub fn unsubscribe(mut self) -> bool {
        self.detach()
    }

    fn detach(&mut self) -> bool {
        match (self.id.take(), self.store.upgrade()) {
            (Some(id), Some(store)) => store.remove_listener(id),
            _ => false,
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.detach();
    }
}

/// Resets the notification state if a listener panics mid-cycle.
struct CycleGuard<'a> {
    state: &'a Mutex<NotifyState>,
    finished: bool,
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            let mut state = self.state.lock();
            state.running = false;
            state.pending = 0;
        }
    }
}

impl SessionStore {
    /// Create an empty store; the session is created lazily.
    pub fn new(default_code: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(None),
            listeners: Mutex::new(Vec::new()),
            next_listener_id: AtomicU64::new(1),
            notify_state: Mutex::new(NotifyState::default()),
            default_code: default_code.into(),
        }
    }

    /// Create a store around a restored session.
    pub fn with_session(session: Session, default_code: impl Into<String>) -> Self {
        let store = Self::new(default_code);
        *store.state.lock() = Some(session);
        store
    }

    /// Code used for fresh sessions.
    pub fn default_code(&self) -> &str {
        &self.default_code
    }

    /// Snapshot of the current session, creating it on first access.
    pub fn get_state(&self) -> Session {
        if let Some(session) = self.state.lock().as_ref() {
            return session.clone();
        }
        self.ensure_session();
        self.snapshot().unwrap_or_else(|| Session::new(self.default_code.clone()))
    }

    /// Snapshot without lazy creation.
    pub fn snapshot(&self) -> Option<Session> {
        self.state.lock().clone()
    }

    /// Register a listener. It is not called for the current state, only for changes.
    pub fn subscribe<F>(self: &Arc<Self>, listener: F) -> Subscription
    where
        F: Fn(&Session) + Send + Sync + 'static,
    {
        let id = self.next_listener_id.fetch_add(1, Ordering::SeqCst);
        self.listeners.lock().push((id, Arc::new(listener)));
        Subscription {
            id: Some(id),
            store: Arc::downgrade(self),
        }
    }

    fn remove_listener(&self, id: u64) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    // ------------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------------

    /// Create the session if there is none.
    pub fn ensure_session(&self) {
        self.mutate(|_| {});
    }

    pub fn append_user_message(&self, text: &str) {
        self.mutate(|session| {
            session.chat.push(ChatMessage::user(text));
            session.touch();
        });
    }

    pub fn append_assistant_message(&self, text: &str) {
        self.mutate(|session| {
            session.chat.push(ChatMessage::assistant(text));
            session.touch();
        });
    }

    /// Rewrite the trailing assistant message in place.
    ///
    /// Returns false (and changes nothing) when the last message is not from the assistant.
    pub fn update_last_assistant_message(&self, content: &str, code: Option<&str>) -> bool {
        self.mutate(|session| match session.chat.last_mut() {
            Some(message) if message.is_assistant() => {
                message.content = content.to_string();
                if let Some(code) = code {
                    message.code = Some(code.to_string());
                }
                session.touch();
                true
            }
            _ => {
                tracing::warn!("update_last_assistant_message: last message is not an assistant message");
                false
            }
        })
    }

    pub fn set_current_code(&self, code: &str) {
        self.mutate(|session| {
            session.current_code = code.to_string();
            session.touch();
        });
    }

    /// Record that `prompt` changed the code to `code`.
    pub fn apply_new_code(&self, code: &str, prompt: &str) {
        self.mutate(|session| {
            session.revisions.push(CodeRevision {
                code: code.to_string(),
                prompt: prompt.to_string(),
                created_at: chrono::Utc::now(),
            });
            session.current_code = code.to_string();
            session.touch();
        });
    }

    /// Replace the whole session with a new one starting from `default_code`.
    pub fn start_new_session(&self, default_code: &str) {
        let mut state = self.state.lock();
        let session = Session::new(default_code);
        tracing::info!("Starting new session {}", session.session_id);
        *state = Some(session);
        drop(state);
        self.notify();
    }

    /// Empty the chat (and recorded revisions); the current code is left alone.
    pub fn clear_chat(&self) {
        self.mutate(|session| {
            session.chat.clear();
            session.revisions.clear();
            session.touch();
        });
    }

    /// Code snapshot attached to the chat message at `index`, if any.
    pub fn recall_code(&self, index: usize) -> Option<String> {
        self.state
            .lock()
            .as_ref()
            .and_then(|s| s.chat.get(index))
            .and_then(|m| m.code.clone())
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    fn mutate<R>(&self, f: impl FnOnce(&mut Session) -> R) -> R {
        let result = {
            let mut state = self.state.lock();
            let session = state.get_or_insert_with(|| {
                let session = Session::new(self.default_code.clone());
                tracing::info!("Created session {}", session.session_id);
                session
            });
            f(session)
        };
        self.notify();
        result
    }

    fn notify(&self) {
        {
            let mut state = self.notify_state.lock();
            state.pending += 1;
            if state.running {
                return;
            }
            state.running = true;
        }
        let mut guard = CycleGuard {
            state: &self.notify_state,
            finished: false,
        };

        loop {
            {
                let mut state = self.notify_state.lock();
                if state.pending == 0 {
                    // Cleared under the same lock that observed the empty queue
                    state.running = false;
                    guard.finished = true;
                    return;
                }
                state.pending -= 1;
            }

            let Some(snapshot) = self.snapshot() else {
                continue;
            };
            let listeners: Vec<Listener> = self
                .listeners
                .lock()
                .iter()
                .map(|(_, listener)| listener.clone())
                .collect();

            for listener in listeners {
                listener(&snapshot);
            }
        }
    }
}
