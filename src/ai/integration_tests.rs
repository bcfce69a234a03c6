//! End-to-end tests for generation turns.
//!
//! A scripted backend replays canned frame streams or HTTP failures, and the in-memory
//! adapter records every engine call.

#![cfg(test)]

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use livegen_client::{
    GenerationClientError, GenerationRequest, Mode, StreamingResponse, PLACEHOLDER_STATUS,
};
use parking_lot::Mutex;
use tokio::sync::{mpsc, Notify};

use super::backend::GenerationBackend;
use super::events::GenerationEvent;
use super::generation::{
    GenerationConfig, GenerationOrchestrator, TurnOutcome, DONE_MESSAGE, UNCHANGED_MESSAGE,
};
use crate::engine::testing::MemoryAdapter;
use crate::engine::{EngineError, ExecutionAdapter, Playback};
use crate::error::TurnError;
use crate::extract::FencedCodeExtractor;
use crate::session::{ChatRole, SessionStore};

const DEFAULT_CODE: &str = "// describe some music";

enum Reply {
    Chunks(Vec<String>),
    Status(u16, String),
    Unreachable,
}

/// Backend that replays queued replies and records requests.
#[derive(Default)]
struct ScriptedBackend {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<GenerationRequest>>,
    /// When set, `open` waits for a notification before replying
    gate: Option<Arc<Notify>>,
    opened: Arc<Notify>,
}

impl ScriptedBackend {
    fn new() -> Self {
        Self::default()
    }

    fn gated(gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::default()
        }
    }

    fn reply(self, reply: Reply) -> Self {
        self.replies.lock().push_back(reply);
        self
    }

    fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    async fn open(
        &self,
        request: &GenerationRequest,
    ) -> Result<StreamingResponse, GenerationClientError> {
        self.requests.lock().push(request.clone());
        self.opened.notify_one();
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        let reply = self.replies.lock().pop_front();
        match reply {
            Some(Reply::Chunks(chunks)) => Ok(StreamingResponse::from_chunks(chunks)),
            Some(Reply::Status(status, body)) => {
                Err(GenerationClientError::from_status(status, &body))
            }
            Some(Reply::Unreachable) => {
                let err = reqwest::Client::new()
                    .get("not a url")
                    .build()
                    .unwrap_err();
                Err(GenerationClientError::Connectivity(err))
            }
            None => Ok(StreamingResponse::from_chunks(vec!["data: [DONE]\n".to_string()])),
        }
    }
}

fn delta(content: &str) -> String {
    format!(
        "data: {}\n",
        serde_json::json!({ "type": "content-delta", "content": content })
    )
}

fn frame(value: serde_json::Value) -> String {
    format!("data: {}\n", value)
}

fn done() -> String {
    "data: [DONE]\n".to_string()
}

fn code_reply(code: &str) -> Reply {
    Reply::Chunks(vec![delta(&format!("```js\n{}\n```", code)), done()])
}

struct Harness {
    orchestrator: Arc<GenerationOrchestrator>,
    store: Arc<SessionStore>,
    adapter: Arc<MemoryAdapter>,
    playback: Arc<Playback>,
    backend: Arc<ScriptedBackend>,
    events: mpsc::UnboundedReceiver<GenerationEvent>,
}

impl Harness {
    fn new(backend: ScriptedBackend) -> Self {
        Self::with_code(backend, DEFAULT_CODE)
    }

    fn with_code(backend: ScriptedBackend, adapter_code: &str) -> Self {
        let store = Arc::new(SessionStore::new(DEFAULT_CODE));
        let adapter = Arc::new(MemoryAdapter::new(adapter_code));
        let playback = Arc::new(Playback::new(adapter.clone()));
        let backend = Arc::new(backend);
        let (tx, events) = mpsc::unbounded_channel();

        let orchestrator = Arc::new(GenerationOrchestrator::new(
            store.clone(),
            playback.clone(),
            Arc::new(FencedCodeExtractor::new()),
            backend.clone(),
            tx,
        ));

        Self {
            orchestrator,
            store,
            adapter,
            playback,
            backend,
            events,
        }
    }

    fn drain_events(&mut self) -> Vec<GenerationEvent> {
        let mut out = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            out.push(event);
        }
        out
    }

    fn chat_tail(&self) -> (ChatRole, String, Option<String>) {
        let session = self.store.get_state();
        let last = session.chat.last().cloned().expect("chat is empty");
        (last.role, last.content, last.code)
    }
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn test_new_code_applied_and_played() {
    let mut h = Harness::new(
        ScriptedBackend::new().reply(Reply::Chunks(vec![delta("```js\ncode();\n```"), done()])),
    );

    let outcome = h.orchestrator.generate("make it darker").await.unwrap();
    assert_eq!(outcome, TurnOutcome::Applied { changed: true });

    let request = &h.backend.requests()[0];
    assert_eq!(request.mode, Mode::New);
    assert_eq!(request.current_code, None);
    assert_eq!(request.prompt, "make it darker");

    assert_eq!(h.adapter.set_code_calls(), vec!["code();".to_string()]);
    assert_eq!(
        h.chat_tail(),
        (
            ChatRole::Assistant,
            DONE_MESSAGE.to_string(),
            Some("code();".to_string())
        )
    );

    let session = h.store.get_state();
    assert_eq!(session.chat.len(), 2);
    assert_eq!(session.chat[0].content, "make it darker");
    assert_eq!(session.current_code, h.adapter.get_code());
    assert_eq!(session.revisions.len(), 1);
    assert_eq!(session.revisions[0].prompt, "make it darker");
    assert!(h.playback.is_playing());
    assert!(!h.orchestrator.is_busy());

    let events = h.drain_events();
    assert!(matches!(events.first(), Some(GenerationEvent::Started { mode, .. }) if mode == "new"));
    assert!(matches!(events.last(), Some(GenerationEvent::Completed { changed: true, .. })));
    assert!(events
        .iter()
        .any(|e| matches!(e, GenerationEvent::CodeApplied { code, .. } if code == "code();")));
}

#[tokio::test]
async fn test_invalid_api_key() {
    let h = Harness::new(ScriptedBackend::new().reply(Reply::Status(401, String::new())));

    let err = h.orchestrator.generate("drums").await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Invalid API key. Please check your API key in Settings."
    );

    let (role, content, code) = h.chat_tail();
    assert_eq!(role, ChatRole::Assistant);
    assert_eq!(
        content,
        "✗ Invalid API key. Please check your API key in Settings."
    );
    assert_eq!(code, None);
    assert!(h.adapter.set_code_calls().is_empty());
    assert_eq!(h.adapter.run_count(), 0);
    assert!(!h.orchestrator.is_busy());
}

#[tokio::test]
async fn test_empty_response() {
    let mut h = Harness::new(ScriptedBackend::new().reply(Reply::Chunks(vec![
        frame(serde_json::json!({"type": "status", "message": "thinking"})),
        done(),
    ])));

    let err = h.orchestrator.generate("drums").await.unwrap_err();
    assert!(matches!(err, TurnError::EmptyResponse));
    assert_eq!(
        err.to_string(),
        "Empty response from AI. The model may be overloaded - please try again."
    );
    assert!(h.adapter.set_code_calls().is_empty());
    assert_eq!(
        h.chat_tail().1,
        "✗ Empty response from AI. The model may be overloaded - please try again."
    );

    let events = h.drain_events();
    assert!(events
        .iter()
        .any(|e| matches!(e, GenerationEvent::Status { message } if message == "thinking")));
    assert!(matches!(
        events.last(),
        Some(GenerationEvent::Error { error_type, .. }) if error_type == "empty_response"
    ));
}

// ============================================================================
// Mode and request shape
// ============================================================================

#[tokio::test]
async fn test_edit_mode_sends_prior_code() {
    let prior = "s(\"bd sd\")";
    let h = Harness::with_code(ScriptedBackend::new().reply(code_reply("s(\"bd*2 sd\")")), prior);

    h.orchestrator.generate("double the kick").await.unwrap();

    let request = &h.backend.requests()[0];
    assert_eq!(request.mode, Mode::Edit);
    assert_eq!(request.current_code.as_deref(), Some(prior));
}

#[tokio::test]
async fn test_blank_adapter_code_is_new_mode() {
    let h = Harness::with_code(ScriptedBackend::new().reply(code_reply("s(\"bd\")")), "   \n");
    h.orchestrator.generate("drums").await.unwrap();
    assert_eq!(h.backend.requests()[0].mode, Mode::New);
}

#[tokio::test]
async fn test_model_and_api_key_forwarded() {
    let h = Harness::new(ScriptedBackend::new().reply(code_reply("s(\"bd\")")));
    h.orchestrator.set_config(GenerationConfig {
        model: Some("small-model".to_string()),
        api_key: Some("sk-test".to_string()),
    });

    h.orchestrator.generate("drums").await.unwrap();

    let request = &h.backend.requests()[0];
    assert_eq!(request.model.as_deref(), Some("small-model"));
    assert_eq!(request.api_key.as_deref(), Some("sk-test"));
}

#[tokio::test]
async fn test_history_context_excludes_current_turn() {
    let h = Harness::new(
        ScriptedBackend::new()
            .reply(code_reply("s(\"bd\")"))
            .reply(code_reply("s(\"bd sd\")")),
    );

    h.orchestrator.generate("drums").await.unwrap();
    h.orchestrator.generate("add a snare").await.unwrap();

    let requests = h.backend.requests();
    assert!(requests[0].chat_history.is_empty());

    let history = &requests[1].chat_history;
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].content, "drums");
    assert_eq!(history[1].content, DONE_MESSAGE);
}

#[tokio::test]
async fn test_history_context_is_capped() {
    let h = Harness::new(ScriptedBackend::new().reply(code_reply("s(\"bd\")")));
    for i in 0..6 {
        h.store.append_user_message(&format!("prompt {}", i));
        h.store.append_assistant_message("✓ done");
    }

    h.orchestrator.generate("more").await.unwrap();

    let history = &h.backend.requests()[0].chat_history;
    assert_eq!(history.len(), 10);
    assert_eq!(history[0].content, "prompt 1");
}

// ============================================================================
// Streaming
// ============================================================================

#[tokio::test]
async fn test_clear_frame_resets_accumulation() {
    let h = Harness::new(ScriptedBackend::new().reply(Reply::Chunks(vec![
        delta("```js\nabc()\n```"),
        frame(serde_json::json!({"type": "clear"})),
        delta("```js\nxyz()\n```"),
        done(),
    ])));

    h.orchestrator.generate("start over").await.unwrap();
    assert_eq!(h.adapter.get_code(), "xyz()");
}

#[tokio::test]
async fn test_payload_split_across_chunks() {
    let full = delta("```js\nnote(\"c3 e3\").s(\"piano\")\n```");
    let (a, b) = full.split_at(17);
    let h = Harness::new(ScriptedBackend::new().reply(Reply::Chunks(vec![
        a.to_string(),
        b.to_string(),
        done(),
    ])));

    h.orchestrator.generate("piano").await.unwrap();
    assert_eq!(h.adapter.get_code(), "note(\"c3 e3\").s(\"piano\")");
}

#[tokio::test]
async fn test_error_frame_aborts_turn() {
    let h = Harness::new(ScriptedBackend::new().reply(Reply::Chunks(vec![
        delta("```js\npartial("),
        frame(serde_json::json!({"type": "error", "error": "model exploded"})),
        delta(")\n```"),
        done(),
    ])));

    let err = h.orchestrator.generate("drums").await.unwrap_err();
    assert_eq!(err.to_string(), "model exploded");
    assert_eq!(err.kind(), "stream_protocol");
    assert_eq!(h.chat_tail().1, "✗ model exploded");
    assert!(h.adapter.set_code_calls().is_empty());
}

#[tokio::test]
async fn test_connectivity_error() {
    let h = Harness::new(ScriptedBackend::new().reply(Reply::Unreachable));

    let err = h.orchestrator.generate("drums").await.unwrap_err();
    assert_eq!(err.kind(), "connectivity");
    assert!(h.chat_tail().1.starts_with("✗ Unable to reach the generation service"));
}

// ============================================================================
// Extraction and application
// ============================================================================

#[tokio::test]
async fn test_extraction_failure_keeps_raw_text() {
    let mut h = Harness::new(
        ScriptedBackend::new().reply(Reply::Chunks(vec![delta("I cannot help with that."), done()])),
    );

    let err = h.orchestrator.generate("drums").await.unwrap_err();
    assert_eq!(err.raw_response(), Some("I cannot help with that."));
    assert!(err.is_execution_class());
    assert_eq!(
        h.chat_tail().1,
        "✗ No code found in AI response. Try rephrasing your request."
    );

    let events = h.drain_events();
    assert!(matches!(
        events.last(),
        Some(GenerationEvent::Error { raw_response: Some(raw), .. }) if raw == "I cannot help with that."
    ));
}

#[tokio::test]
async fn test_unchanged_code_skips_revision() {
    let prior = "s(\"bd\")\n  .gain(0.8)";
    let mut h = Harness::with_code(
        ScriptedBackend::new().reply(code_reply("s(\"bd\") .gain(0.8)")),
        prior,
    );
    h.store.set_current_code(prior);

    let outcome = h.orchestrator.generate("keep it as is").await.unwrap();
    assert_eq!(outcome, TurnOutcome::Applied { changed: false });

    let session = h.store.get_state();
    assert!(session.revisions.is_empty());
    assert_eq!(h.chat_tail().1, UNCHANGED_MESSAGE);
    // Code is still loaded and the store converges on it
    assert_eq!(h.adapter.set_code_calls(), vec!["s(\"bd\") .gain(0.8)".to_string()]);
    assert_eq!(session.current_code, h.adapter.get_code());

    let events = h.drain_events();
    assert!(events.iter().any(
        |e| matches!(e, GenerationEvent::CodeApplied { changed: false, diff, .. } if diff.is_empty())
    ));
}

#[tokio::test]
async fn test_runtime_failure_after_commit() {
    let h = Harness::new(ScriptedBackend::new().reply(code_reply("s(\"bd\").oops()")));
    h.adapter.fail_next_run(EngineError::at_line("oops is not a function", 1));

    let err = h.orchestrator.generate("drums").await.unwrap_err();
    assert!(matches!(err, TurnError::Runtime(_)));
    assert_eq!(err.to_string(), "Line 1: oops is not a function");

    // The turn is recorded and recallable
    let session = h.store.get_state();
    assert_eq!(session.revisions.len(), 1);
    assert_eq!(h.chat_tail().1, DONE_MESSAGE);
    assert_eq!(h.store.recall_code(1).as_deref(), Some("s(\"bd\").oops()"));
    assert_eq!(session.current_code, h.adapter.get_code());
    assert!(!h.playback.is_playing());
    assert!(!h.orchestrator.is_busy());
}

#[tokio::test]
async fn test_runtime_failure_after_playing_turn_stops_playback() {
    let h = Harness::new(
        ScriptedBackend::new()
            .reply(code_reply("s(\"bd\")"))
            .reply(code_reply("s(\"bd\").oops()")),
    );

    h.orchestrator.generate("drums").await.unwrap();
    assert!(h.playback.is_playing());

    h.adapter.fail_next_run(EngineError::at_line("oops is not a function", 1));
    let err = h.orchestrator.generate("break it").await.unwrap_err();
    assert!(matches!(err, TurnError::Runtime(_)));
    assert!(!h.playback.is_playing());
    assert_eq!(h.store.get_state().revisions.len(), 2);
}

// ============================================================================
// Entry guard
// ============================================================================

#[tokio::test]
async fn test_second_turn_dropped_while_in_flight() {
    let gate = Arc::new(Notify::new());
    let h = Harness::new(ScriptedBackend::gated(gate.clone()).reply(code_reply("s(\"bd\")")));

    let first = {
        let orchestrator = h.orchestrator.clone();
        tokio::spawn(async move { orchestrator.generate("drums").await })
    };
    h.backend.opened.notified().await;
    assert!(h.orchestrator.is_busy());

    let second = h.orchestrator.generate("hats").await.unwrap();
    assert_eq!(second, TurnOutcome::Busy);

    let session = h.store.get_state();
    assert_eq!(session.chat.len(), 2);
    assert_eq!(session.chat[1].content, PLACEHOLDER_STATUS);

    gate.notify_one();
    let outcome = first.await.unwrap().unwrap();
    assert_eq!(outcome, TurnOutcome::Applied { changed: true });
    assert_eq!(h.backend.requests().len(), 1);
    assert!(!h.orchestrator.is_busy());
}

#[tokio::test]
async fn test_guard_released_after_failure() {
    let h = Harness::new(
        ScriptedBackend::new()
            .reply(Reply::Status(500, String::new()))
            .reply(code_reply("s(\"bd\")")),
    );

    assert!(h.orchestrator.generate("drums").await.is_err());
    assert!(!h.orchestrator.is_busy());

    let outcome = h.orchestrator.generate("drums again").await.unwrap();
    assert_eq!(outcome, TurnOutcome::Applied { changed: true });
    assert_eq!(h.store.get_state().chat.len(), 4);
}

#[tokio::test]
async fn test_blank_prompt_is_ignored() {
    let h = Harness::new(ScriptedBackend::new());
    assert_eq!(
        h.orchestrator.generate("   ").await.unwrap(),
        TurnOutcome::BlankPrompt
    );
    assert!(h.backend.requests().is_empty());
    assert!(h.store.get_state().chat.is_empty());
}
