use std::time::Duration;

use serde::Serialize;

use super::expiring::Expiring;
use crate::engine::EngineError;
use crate::error::TurnError;

/// The error currently shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BannerError {
    pub message: String,
    pub kind: String,
    /// Whether the diagnostic stays until dismissed
    pub persistent: bool,
}

/// Latest error plus its optional raw diagnostic.
///
/// The diagnostic of an execution or parse error persists until dismissed; any other
/// diagnostic expires after `diagnostic_ttl`.
pub struct ErrorBanner {
    error: Expiring<BannerError>,
    diagnostic: Expiring<String>,
    diagnostic_ttl: Duration,
}

impl ErrorBanner {
    pub fn new(diagnostic_ttl: Duration) -> Self {
        Self {
            error: Expiring::new(),
            diagnostic: Expiring::new(),
            diagnostic_ttl,
        }
    }

    pub fn show_turn_error(&self, error: &TurnError) {
        self.show(
            error.to_string(),
            error.kind(),
            error.raw_response().map(str::to_string),
            error.is_execution_class(),
        );
    }

    pub fn show_engine_error(&self, error: &EngineError) {
        self.show(error.to_string(), "runtime", None, true);
    }

    /// Show an error. Replaces the previous one and its diagnostic.
    pub fn show(
        &self,
        message: impl Into<String>,
        kind: &str,
        raw_response: Option<String>,
        persistent: bool,
    ) {
        self.error.set(
            BannerError {
                message: message.into(),
                kind: kind.to_string(),
                persistent,
            },
            None,
        );

        match raw_response.filter(|raw| !raw.trim().is_empty()) {
            Some(raw) => {
                let ttl = if persistent {
                    None
                } else {
                    Some(self.diagnostic_ttl)
                };
                self.diagnostic.set(raw, ttl);
            }
            None => self.diagnostic.clear(),
        }
    }

    pub fn current(&self) -> Option<BannerError> {
        self.error.get()
    }

    pub fn diagnostic(&self) -> Option<String> {
        self.diagnostic.get()
    }

    pub fn dismiss(&self) {
        self.error.clear();
        self.diagnostic.clear();
    }
}
