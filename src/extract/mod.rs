//! Code extraction from free-form model output.
//!
//! The orchestrator only depends on [`OutputExtractor`]; [`FencedCodeExtractor`] is the
//! implementation used by the CLI.

mod fenced;

use serde::Serialize;

pub use fenced::FencedCodeExtractor;

/// Result of pulling a code artifact out of generated text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Extraction {
    /// A validated code artifact
    Success { code: String },
    /// No usable code; the raw text is kept for diagnostics
    Failure { error: String, raw_response: String },
}

pub trait OutputExtractor: Send + Sync + 'static {
    /// Extract and validate the code artifact in `text`.
    fn parse(&self, text: &str) -> Extraction;

    /// Whether `new_code` is equivalent to `old_code` (no meaningful change).
    fn is_unchanged(&self, old_code: &str, new_code: &str) -> bool;
}
