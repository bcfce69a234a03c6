//! In-memory execution adapter for tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{EngineError, ExecutionAdapter};

/// Records every call and fails on demand.
pub struct MemoryAdapter {
    code: Mutex<String>,
    set_code_calls: Mutex<Vec<String>>,
    run_failure: Mutex<Option<EngineError>>,
    stop_failure: Mutex<Option<EngineError>>,
    runs: AtomicUsize,
    stops: AtomicUsize,
}

impl MemoryAdapter {
    pub fn new(code: &str) -> Self {
        Self {
            code: Mutex::new(code.to_string()),
            set_code_calls: Mutex::new(Vec::new()),
            run_failure: Mutex::new(None),
            stop_failure: Mutex::new(None),
            runs: AtomicUsize::new(0),
            stops: AtomicUsize::new(0),
        }
    }

    pub fn fail_next_run(&self, error: EngineError) {
        *self.run_failure.lock() = Some(error);
    }

    pub fn fail_next_stop(&self, error: EngineError) {
        *self.stop_failure.lock() = Some(error);
    }

    pub fn set_code_calls(&self) -> Vec<String> {
        self.set_code_calls.lock().clone()
    }

    pub fn run_count(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }

    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExecutionAdapter for MemoryAdapter {
    fn get_code(&self) -> String {
        self.code.lock().clone()
    }

    fn set_code(&self, code: &str) {
        *self.code.lock() = code.to_string();
        self.set_code_calls.lock().push(code.to_string());
    }

    async fn run(&self) -> Result<(), EngineError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        match self.run_failure.lock().take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn stop(&self) -> Result<(), EngineError> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        match self.stop_failure.lock().take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
