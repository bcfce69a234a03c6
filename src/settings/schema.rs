//! Settings schema definitions for livegen.
//!
//! All settings structs use `#[serde(default)]` to allow partial configuration files.
//! Missing fields are filled with sensible defaults.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Code loaded into a fresh session. A session still holding it generates in `new` mode.
pub const DEFAULT_CODE: &str = "// Describe the music you want to hear";

/// Root settings structure.
///
/// Loaded from `~/.livegen/settings.toml` with environment variable interpolation support.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LivegenSettings {
    /// Schema version for migrations
    pub version: u32,

    /// Generation service
    pub ai: AiSettings,

    /// Execution engine
    pub engine: EngineSettings,

    /// Session persistence
    pub session: SessionSettings,

    /// Transient UI timings
    pub ui: UiSettings,

    /// Extra quick actions, merged over the built-in ones by name
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub quick_actions: Vec<QuickActionSettings>,

    /// Advanced/debug settings
    pub advanced: AdvancedSettings,
}

/// Generation service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiSettings {
    /// URL of the generation endpoint
    pub endpoint: String,

    /// Model requested from the service; the service default when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,

    /// API key forwarded with each request (supports $ENV_VAR syntax)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

/// Execution engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Code a fresh session starts with
    pub default_code: String,

    /// Command that plays a code file, e.g. `["strudel-run", "--watch"]`.
    /// The scratch file path is appended. Empty means dry mode.
    #[serde(default)]
    pub runner: Vec<String>,

    /// File the current code is mirrored to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scratch_file: Option<String>,
}

/// Session persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Save sessions to disk and restore the active one at startup
    pub persistence: bool,

    /// Directory holding session records
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
}

/// Transient UI timings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiSettings {
    /// Milliseconds before a status message clears itself
    pub status_clear_ms: u64,

    /// Seconds before a non-persistent diagnostic expires
    pub diagnostic_expiry_secs: u64,
}

/// A user-defined quick action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuickActionSettings {
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
    pub prompt: String,
}

/// Advanced/debug settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvancedSettings {
    /// Log level: "error" | "warn" | "info" | "debug" | "trace"
    pub log_level: String,
}

// =============================================================================
// Path helpers
// =============================================================================

/// Root directory for livegen state (`~/.livegen`).
pub fn livegen_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".livegen")
}

impl EngineSettings {
    pub fn scratch_path(&self) -> PathBuf {
        self.scratch_file
            .as_deref()
            .map(expand_home)
            .unwrap_or_else(|| livegen_dir().join("scratch.js"))
    }
}

impl SessionSettings {
    pub fn sessions_dir(&self) -> PathBuf {
        self.directory
            .as_deref()
            .map(expand_home)
            .unwrap_or_else(|| livegen_dir().join("sessions"))
    }
}

fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(rest),
        None => PathBuf::from(path),
    }
}

// =============================================================================
// Default implementations
// =============================================================================

impl Default for LivegenSettings {
    fn default() -> Self {
        Self {
            version: 1,
            ai: AiSettings::default(),
            engine: EngineSettings::default(),
            session: SessionSettings::default(),
            ui: UiSettings::default(),
            quick_actions: Vec::new(),
            advanced: AdvancedSettings::default(),
        }
    }
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:3000/api/generate".to_string(),
            default_model: None,
            api_key: None,
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            default_code: DEFAULT_CODE.to_string(),
            runner: Vec::new(),
            scratch_file: None,
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            persistence: true,
            directory: None,
        }
    }
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            status_clear_ms: 3000,
            diagnostic_expiry_secs: 30,
        }
    }
}

impl Default for AdvancedSettings {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
        }
    }
}
