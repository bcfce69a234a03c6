use serde::{Deserialize, Serialize};

/// Progress events of a generation turn, in emission order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GenerationEvent {
    /// A turn passed the entry guard and its placeholder message is in place
    Started { turn_id: String, mode: String },

    /// Informative status from the backend
    Status { message: String },

    /// Streaming text chunk
    TextDelta { delta: String, accumulated: String },

    /// The backend restarted generation; accumulated text was discarded
    Cleared,

    /// New code was loaded into the engine
    CodeApplied {
        code: String,
        changed: bool,
        /// Unified diff against the code held at turn start (empty when unchanged)
        diff: String,
    },

    /// Turn completed and the code is playing
    Completed {
        turn_id: String,
        changed: bool,
        duration_ms: u64,
    },

    /// Turn failed
    Error {
        message: String,
        error_type: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        raw_response: Option<String>,
    },
}

/// Unified diff between two code versions.
pub fn code_diff(old: &str, new: &str) -> String {
    use std::fmt::Write;

    let diff = similar::TextDiff::from_lines(old, new);
    let mut output = String::new();

    for hunk in diff.unified_diff().context_radius(2).iter_hunks() {
        let _ = writeln!(output, "{}", hunk.header());
        for change in hunk.iter_changes() {
            let sign = match change.tag() {
                similar::ChangeTag::Delete => "-",
                similar::ChangeTag::Insert => "+",
                similar::ChangeTag::Equal => " ",
            };
            let _ = write!(output, "{}{}", sign, change.value());
            if !change.value().ends_with('\n') {
                output.push('\n');
            }
        }
    }

    output
}
