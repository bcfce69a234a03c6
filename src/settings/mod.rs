//! TOML-based settings for livegen.
//!
//! Settings are loaded once from `~/.livegen/settings.toml` with environment variable
//! interpolation. `get_with_env_fallback` lets plain environment variables fill in values
//! the file leaves empty.
//!
//! # Usage
//!
//! ```rust,ignore
//! use livegen_lib::settings::{get_with_env_fallback, SettingsFile};
//!
//! let file = SettingsFile::load().await?;
//! let settings = file.settings();
//!
//! let api_key = get_with_env_fallback(&settings.ai.api_key, &["LIVEGEN_API_KEY"], None);
//! ```

pub mod loader;
pub mod schema;

pub use loader::{get_with_env_fallback, settings_path, SettingsFile};
pub use schema::{LivegenSettings, QuickActionSettings, DEFAULT_CODE};
