//! Execution engine boundary.
//!
//! The live-coding engine is consumed through [`ExecutionAdapter`]. Its evaluation
//! semantics are opaque here: the adapter holds the current code and can start or stop
//! playback, and failures come back as [`EngineError`]s with an optional line number.

mod playback;
mod process;
#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;
use serde::Serialize;

pub use playback::Playback;
pub use process::{ProcessAdapter, RunnerCommand};

/// Capability interface of the live-coding engine.
#[async_trait]
pub trait ExecutionAdapter: Send + Sync + 'static {
    /// Code currently loaded in the engine.
    fn get_code(&self) -> String;

    /// Replace the loaded code. Does not evaluate it.
    fn set_code(&self, code: &str);

    /// Evaluate the loaded code and start playback.
    async fn run(&self) -> Result<(), EngineError>;

    /// Stop playback.
    async fn stop(&self) -> Result<(), EngineError>;
}

/// Error reported by the engine when it rejects or fails to run code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{}", located(.line, .message))]
pub struct EngineError {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
}

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            line: None,
        }
    }

    pub fn at_line(message: impl Into<String>, line: u32) -> Self {
        Self {
            message: message.into(),
            line: Some(line),
        }
    }

    /// Parse engine diagnostics, picking up a line number when one is mentioned.
    pub fn from_diagnostics(text: &str) -> Self {
        let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
        let message = lines
            .iter()
            .find(|l| l.contains("Error"))
            .or_else(|| lines.first())
            .map(|l| l.to_string())
            .unwrap_or_else(|| "Engine failed without diagnostics".to_string());

        Self {
            message,
            line: extract_line_number(text),
        }
    }
}

fn located(line: &Option<u32>, message: &str) -> String {
    match line {
        Some(line) => format!("Line {}: {}", line, message),
        None => message.to_string(),
    }
}

/// Find "line N" or a `file:N` location in diagnostic text.
fn extract_line_number(text: &str) -> Option<u32> {
    let lower = text.to_lowercase();
    if let Some(idx) = lower.find("line ") {
        let digits: String = lower[idx + 5..]
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        if let Ok(line) = digits.parse() {
            return Some(line);
        }
    }

    text.lines()
        .flat_map(|l| l.split(':').skip(1))
        .find_map(|part| {
            let digits: String = part.chars().take_while(|c| c.is_ascii_digit()).collect();
            if digits.is_empty() {
                None
            } else {
                digits.parse().ok()
            }
        })
}
