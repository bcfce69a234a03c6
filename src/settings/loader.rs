//! Loading `settings.toml`.
//!
//! Settings are read once at startup. `$VAR` and `${VAR}` references in string fields
//! are replaced with the environment value, and a commented template is written on the
//! first run so there is something to edit.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::schema::{livegen_dir, LivegenSettings};

const TEMPLATE: &str = include_str!("template.toml");

/// Location of the global settings file.
pub fn settings_path() -> PathBuf {
    livegen_dir().join("settings.toml")
}

/// Settings as loaded from disk, with environment references resolved.
#[derive(Debug, Clone)]
pub struct SettingsFile {
    settings: LivegenSettings,
    path: PathBuf,
}

impl SettingsFile {
    /// Load `~/.livegen/settings.toml`.
    pub async fn load() -> Result<Self> {
        Self::load_from(settings_path()).await
    }

    /// Load a specific file. A missing file yields the defaults.
    pub async fn load_from(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let settings = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => {
                let mut settings: LivegenSettings = toml::from_str(&contents)
                    .with_context(|| format!("Invalid settings in {:?}", path))?;
                resolve_env_refs(&mut settings);
                tracing::info!("Loaded settings from {:?}", path);
                settings
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No settings at {:?}, using defaults", path);
                LivegenSettings::default()
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {:?}", path));
            }
        };

        Ok(Self { settings, path })
    }

    pub fn settings(&self) -> &LivegenSettings {
        &self.settings
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the template when no file exists yet. Returns whether it was written.
    pub async fn write_template_if_missing(&self) -> Result<bool> {
        if tokio::fs::try_exists(&self.path).await.unwrap_or(false) {
            return Ok(false);
        }
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {:?}", parent))?;
        }
        tokio::fs::write(&self.path, TEMPLATE)
            .await
            .with_context(|| format!("Failed to write {:?}", self.path))?;
        tracing::info!("Wrote settings template to {:?}", self.path);
        Ok(true)
    }
}

fn resolve_env_refs(settings: &mut LivegenSettings) {
    fn resolve(value: &mut String) {
        if let Some(resolved) = resolve_env_ref(value) {
            *value = resolved;
        }
    }

    resolve(&mut settings.ai.endpoint);
    for value in [
        &mut settings.ai.api_key,
        &mut settings.ai.default_model,
        &mut settings.engine.scratch_file,
        &mut settings.session.directory,
    ]
    .into_iter()
    .flatten()
    {
        resolve(value);
    }
}

/// Resolve a $ENV_VAR or ${ENV_VAR} reference.
///
/// Returns `Some(resolved)` if the value starts with `$` and the env var exists.
/// Returns `None` if no env var reference or env var not set.
fn resolve_env_ref(value: &str) -> Option<String> {
    let trimmed = value.trim();
    let reference = trimmed.strip_prefix('$')?;

    let var_name = reference
        .strip_prefix('{')
        .and_then(|r| r.strip_suffix('}'))
        .unwrap_or(reference);

    std::env::var(var_name).ok()
}

/// Get a setting value with environment variable fallback.
///
/// Priority order:
/// 1. Settings value (if set and non-empty)
/// 2. Environment variable (first match from list)
/// 3. Default value
pub fn get_with_env_fallback(
    setting: &Option<String>,
    env_vars: &[&str],
    default: Option<String>,
) -> Option<String> {
    if let Some(v) = setting {
        if !v.is_empty() {
            return Some(v.clone());
        }
    }

    for env_var in env_vars {
        if let Ok(v) = std::env::var(env_var) {
            if !v.is_empty() {
                return Some(v);
            }
        }
    }

    default
}
