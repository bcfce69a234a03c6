//! Headless command-line front-end.
//!
//! The CLI wires the generation orchestrator to a process-backed execution adapter and
//! renders turn events on the terminal:
//!
//! ```text
//! +-------------------------+     +-------------+     +---------------+
//! | GenerationOrchestrator  | --> | event_tx    | --> | output.rs     |
//! | (turns, store, engine)  |     | (channel)   |     | (print/JSON)  |
//! +-------------------------+     +-------------+     +---------------+
//! ```
//!
//! # REPL Mode
//!
//! When no prompt is provided via `-e` or `-f`, the CLI enters
//! interactive REPL mode. See `repl.rs` for details.

mod args;
mod bootstrap;
mod output;
mod repl;
mod runner;

pub use args::Args;
pub use bootstrap::{initialize, CliContext};
pub use repl::run_repl;
pub use runner::{execute_batch, execute_once};
