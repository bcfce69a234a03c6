//! CLI execution runner.
//!
//! Runs generation turns while rendering their events as they arrive.

use std::path::Path;

use anyhow::{Context, Result};

use crate::ai::{GenerationEvent, TurnOutcome};

use super::bootstrap::CliContext;
use super::output::{handle_event, truncate};

/// Execute a single prompt and wait for the turn to finish.
pub async fn execute_once(ctx: &mut CliContext, prompt: &str) -> Result<()> {
    let json_mode = ctx.args.json;
    let quiet_mode = ctx.args.quiet;
    let orchestrator = ctx.orchestrator.clone();

    let CliContext {
        event_rx, status, ..
    } = ctx;

    let turn = orchestrator.generate(prompt);
    tokio::pin!(turn);

    // Render events while the turn runs
    let result = loop {
        tokio::select! {
            biased;
            Some(event) = event_rx.recv() => {
                if let GenerationEvent::Status { message } = &event {
                    status.set(message.clone());
                }
                handle_event(&event, json_mode, quiet_mode)?;
            }
            result = &mut turn => break result,
        }
    };

    // Events sent right before the turn returned
    while let Ok(event) = event_rx.try_recv() {
        handle_event(&event, json_mode, quiet_mode)?;
    }
    status.clear();

    match result {
        Ok(TurnOutcome::Applied { .. }) => {
            ctx.banner.dismiss();
            Ok(())
        }
        Ok(TurnOutcome::Busy) => {
            eprintln!("[busy] a generation is already running");
            Ok(())
        }
        Ok(TurnOutcome::BlankPrompt) => Ok(()),
        Err(e) => {
            ctx.banner.show_turn_error(&e);
            Err(e.into())
        }
    }
}

/// Execute prompts from a file, one per line.
///
/// Each non-empty, non-comment line is executed sequentially.
/// Lines starting with `#` are treated as comments.
/// Execution stops on the first failed turn.
pub async fn execute_batch(ctx: &mut CliContext, file_path: &Path) -> Result<()> {
    let content = tokio::fs::read_to_string(file_path)
        .await
        .with_context(|| format!("Failed to read prompt file: {}", file_path.display()))?;

    let prompts = parse_prompt_file(&content);
    if prompts.is_empty() {
        anyhow::bail!("No prompts found in file: {}", file_path.display());
    }

    let total = prompts.len();
    if !ctx.args.quiet {
        eprintln!(
            "[batch] Executing {} prompt(s) from {}",
            total,
            file_path.display()
        );
    }

    for (i, prompt) in prompts.iter().enumerate() {
        if !ctx.args.quiet {
            eprintln!(
                "\n[batch] [{}/{}] Executing: {}",
                i + 1,
                total,
                truncate(prompt, 50)
            );
        }

        execute_once(ctx, prompt)
            .await
            .with_context(|| format!("Prompt {} of {} failed", i + 1, total))?;
    }

    if !ctx.args.quiet {
        eprintln!("\n[batch] All {} prompt(s) completed successfully", total);
    }

    Ok(())
}

fn parse_prompt_file(content: &str) -> Vec<&str> {
    content
        .lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .collect()
}
