//! livegen CLI - headless front-end for the generation-session engine
//!
//! # Usage
//!
//! ```bash
//! # Build the CLI binary
//! cargo build --features cli --bin livegen-cli
//!
//! # Execute a single prompt
//! ./target/debug/livegen-cli -e "a slow ambient pad in D minor"
//!
//! # JSON output for scripting
//! ./target/debug/livegen-cli -e "four on the floor" --json | jq .
//!
//! # Quiet mode - only the final code
//! ./target/debug/livegen-cli -e "add hats" --quiet
//!
//! # Interactive REPL mode (when no -e or -f provided)
//! ./target/debug/livegen-cli
//! ```

use anyhow::Result;
use clap::Parser;

use livegen_lib::cli::{execute_batch, execute_once, initialize, run_repl, Args};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut ctx = initialize(&args).await?;

    let result = if let Some(ref prompt) = args.execute {
        execute_once(&mut ctx, prompt).await
    } else if let Some(ref file) = args.file {
        execute_batch(&mut ctx, file).await
    } else {
        run_repl(&mut ctx).await
    };

    // Graceful shutdown
    ctx.shutdown().await?;

    result
}
