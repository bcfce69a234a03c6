//! CLI output handling - renders turn events in terminal, JSON or quiet mode.

use std::io::{self, Write};

use anyhow::Result;

use crate::ai::GenerationEvent;
use crate::session::{ChatRole, Session};

/// Render one event. Returns true for events that end a turn.
pub fn handle_event(event: &GenerationEvent, json_mode: bool, quiet_mode: bool) -> Result<bool> {
    if json_mode {
        // JSON mode: output each event as a JSON line
        println!("{}", serde_json::to_string(event)?);
        io::stdout().flush()?;
    } else if quiet_mode {
        // Quiet mode: only the code that ends up loaded
        if let GenerationEvent::CodeApplied { code, .. } = event {
            println!("{}", code);
        }
    } else {
        handle_event_terminal(event)?;
    }

    match event {
        GenerationEvent::Completed { .. } => Ok(true),
        GenerationEvent::Error { message, .. } => {
            if !json_mode {
                eprintln!("Error: {}", message);
            }
            Ok(true)
        }
        _ => Ok(false),
    }
}

/// Pretty-print events for an interactive terminal.
fn handle_event_terminal(event: &GenerationEvent) -> Result<()> {
    match event {
        GenerationEvent::Started { mode, .. } => {
            eprintln!("[{}] generating...", mode);
        }
        GenerationEvent::Status { message } => {
            eprintln!("[status] {}", message);
        }
        GenerationEvent::TextDelta { delta, .. } => {
            // Stream text as it arrives
            print!("{}", delta);
            io::stdout().flush()?;
        }
        GenerationEvent::Cleared => {
            eprintln!("\n[restart] the model started over");
        }
        GenerationEvent::CodeApplied { changed, diff, .. } => {
            println!();
            if *changed {
                if !diff.is_empty() {
                    eprintln!("[diff]\n{}", diff.trim_end());
                }
            } else {
                eprintln!("[unchanged] no changes needed");
            }
        }
        GenerationEvent::Completed { duration_ms, .. } => {
            eprintln!("[playing] turn finished in {}ms", duration_ms);
        }
        GenerationEvent::Error { .. } => {}
    }

    Ok(())
}

/// One line per chat message, numbered for `/recall`.
pub fn format_history(session: &Session) -> String {
    if session.chat.is_empty() {
        return "(no messages)".to_string();
    }

    session
        .chat
        .iter()
        .enumerate()
        .map(|(i, message)| {
            let who = match message.role {
                ChatRole::User => "you",
                ChatRole::Assistant => "ai ",
            };
            let marker = if message.code.is_some() { " [code]" } else { "" };
            format!("{:>3} {} {}{}", i, who, truncate(&message.content, 70), marker)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Truncate a string to a maximum number of characters.
pub fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
