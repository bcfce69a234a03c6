//! Session-level operations that touch both the engine and the store.
//!
//! Each one stops playback before changing the loaded code. Callers are expected to
//! refuse these while a generation turn is in flight.

use crate::engine::Playback;

use super::store::SessionStore;

/// Load a historical code snapshot into the engine and the session. Chat is untouched.
pub async fn recall(store: &SessionStore, playback: &Playback, code: &str) {
    playback.stop().await;
    playback.adapter().set_code(code);
    store.set_current_code(code);
    tracing::info!("Recalled code snapshot ({} chars)", code.len());
}

/// Recall the snapshot attached to the chat message at `index`.
///
/// Returns the recalled code, or `None` if that message carries no snapshot.
pub async fn recall_message(
    store: &SessionStore,
    playback: &Playback,
    index: usize,
) -> Option<String> {
    let code = store.recall_code(index)?;
    recall(store, playback, &code).await;
    Some(code)
}

/// Stop playback, reset the engine to the default code and replace the session.
pub async fn start_fresh(store: &SessionStore, playback: &Playback) {
    playback.stop().await;
    let default_code = store.default_code().to_string();
    playback.adapter().set_code(&default_code);
    store.start_new_session(&default_code);
}

/// Stop playback, reset the code to the default and clear the chat.
///
/// The session identifier is kept.
pub async fn reset_history(store: &SessionStore, playback: &Playback) {
    playback.stop().await;
    let default_code = store.default_code().to_string();
    playback.adapter().set_code(&default_code);
    store.set_current_code(&default_code);
    store.clear_chat();
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::engine::testing::MemoryAdapter;
    use crate::engine::ExecutionAdapter;

    const DEFAULT: &str = "// start here";

    fn setup() -> (Arc<SessionStore>, Arc<MemoryAdapter>, Playback) {
        let store = Arc::new(SessionStore::new(DEFAULT));
        let adapter = Arc::new(MemoryAdapter::new(DEFAULT));
        let playback = Playback::new(adapter.clone());
        (store, adapter, playback)
    }

    async fn played_turn(store: &SessionStore, playback: &Playback, code: &str) {
        store.append_user_message("prompt");
        store.append_assistant_message("generating...");
        store.update_last_assistant_message("✓ done", Some(code));
        store.apply_new_code(code, "prompt");
        playback.adapter().set_code(code);
        playback.play().await.unwrap();
    }

    #[tokio::test]
    async fn test_recall_message_stops_and_loads() {
        let (store, adapter, playback) = setup();
        played_turn(&store, &playback, "s(\"bd\")").await;
        played_turn(&store, &playback, "s(\"bd sd\")").await;

        let recalled = recall_message(&store, &playback, 1).await;
        assert_eq!(recalled.as_deref(), Some("s(\"bd\")"));
        assert!(!playback.is_playing());
        assert_eq!(adapter.stop_count(), 1);
        assert_eq!(adapter.get_code(), "s(\"bd\")");

        let session = store.get_state();
        assert_eq!(session.current_code, "s(\"bd\")");
        assert_eq!(session.chat.len(), 4);
    }

    #[tokio::test]
    async fn test_recall_message_without_snapshot() {
        let (store, adapter, playback) = setup();
        store.append_user_message("hello");
        assert!(recall_message(&store, &playback, 0).await.is_none());
        assert_eq!(adapter.stop_count(), 0);
    }

    #[tokio::test]
    async fn test_start_fresh() {
        let (store, adapter, playback) = setup();
        played_turn(&store, &playback, "s(\"bd\")").await;
        let old_id = store.get_state().session_id;

        start_fresh(&store, &playback).await;

        let session = store.get_state();
        assert_ne!(session.session_id, old_id);
        assert!(session.chat.is_empty());
        assert_eq!(session.current_code, DEFAULT);
        assert_eq!(adapter.get_code(), DEFAULT);
        assert!(!playback.is_playing());
    }

    #[tokio::test]
    async fn test_reset_history_keeps_session_id() {
        let (store, adapter, playback) = setup();
        played_turn(&store, &playback, "s(\"bd\")").await;
        let id = store.get_state().session_id;

        reset_history(&store, &playback).await;

        let session = store.get_state();
        assert_eq!(session.session_id, id);
        assert!(session.chat.is_empty());
        assert_eq!(session.current_code, DEFAULT);
        assert_eq!(adapter.get_code(), DEFAULT);
        assert!(!playback.is_playing());
    }

    #[tokio::test]
    async fn test_stop_failure_does_not_block_reset() {
        let (store, adapter, playback) = setup();
        played_turn(&store, &playback, "s(\"bd\")").await;
        adapter.fail_next_stop(crate::engine::EngineError::new("engine gone"));

        reset_history(&store, &playback).await;
        assert_eq!(store.get_state().current_code, DEFAULT);
    }
}
