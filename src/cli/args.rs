//! CLI argument parsing using clap.
//!
//! Defines the command-line interface for livegen-cli.

use clap::Parser;
use std::path::PathBuf;

/// livegen CLI - describe music, get live-coding code, hear it play
#[derive(Parser, Debug, Clone)]
#[command(name = "livegen-cli")]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Execute a single prompt and exit
    #[arg(short = 'e', long, conflicts_with = "file")]
    pub execute: Option<String>,

    /// Execute prompts from a file (one per line) and exit
    #[arg(short = 'f', long, conflicts_with = "execute")]
    pub file: Option<PathBuf>,

    /// Override model from settings
    #[arg(short = 'm', long)]
    pub model: Option<String>,

    /// Override the generation endpoint from settings
    #[arg(long)]
    pub endpoint: Option<String>,

    /// API key (overrides settings and LIVEGEN_API_KEY)
    #[arg(long)]
    pub api_key: Option<String>,

    /// Start a new session instead of restoring the last one
    #[arg(long)]
    pub fresh: bool,

    /// Output events as JSON lines (for scripting/parsing)
    #[arg(long)]
    pub json: bool,

    /// Only output the final code (suppress streaming)
    #[arg(long, short = 'q')]
    pub quiet: bool,

    /// Show verbose output (debug information)
    #[arg(short = 'v', long)]
    pub verbose: bool,
}
