//! Generation-session engine for LLM-written live-coding music.
//!
//! A prompt becomes a streamed request ([`livegen_client`]), the streamed text becomes a
//! code artifact ([`extract`]), the artifact is loaded and played ([`engine`]), and the
//! turn is recorded in the observable session ([`session`]). [`ai::GenerationOrchestrator`]
//! ties these together and allows one turn in flight at a time.

pub mod ai;
pub mod engine;
pub mod error;
pub mod extract;
pub mod feedback;
pub mod quick_actions;
pub mod session;
pub mod settings;

#[cfg(feature = "cli")]
pub mod cli;

pub use error::TurnError;
