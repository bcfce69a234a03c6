//! Generation turns: backend seam, orchestrator and progress events.

mod backend;
mod events;
mod generation;
mod integration_tests;

pub use backend::GenerationBackend;
pub use events::{code_diff, GenerationEvent};
pub use generation::{
    GenerationConfig, GenerationOrchestrator, TurnOutcome, DONE_MESSAGE, UNCHANGED_MESSAGE,
};
