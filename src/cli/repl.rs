//! Lightweight REPL (Read-Eval-Print-Loop) for livegen-cli.
//!
//! Provides an interactive mode when no prompt is provided via `-e` or `-f`.
//! Any input that is not a slash command is sent as a generation prompt.

use std::io::{self, BufRead, Write};

use anyhow::Result;

use crate::session::actions;

use super::bootstrap::CliContext;
use super::output::format_history;
use super::runner::execute_once;

const HELP: &str = "\
Commands:
  /play          run the current code
  /stop          stop playback
  /code          print the current code
  /history       list chat messages
  /recall N      load the code produced by message N
  /fresh         start a new session
  /reset         clear chat and reset the code, keeping the session
  /quick NAME    send a quick action prompt
  /actions       list quick actions
  /raw           show the raw model output of the last error
  /dismiss       dismiss the last error
  /help          show this help
  /quit          exit
Anything else is sent as a prompt.";

/// REPL command variants.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplCommand {
    /// Exit the REPL
    Quit,
    Play,
    Stop,
    Code,
    History,
    /// Recall the code snapshot of a chat message
    Recall(usize),
    Fresh,
    Reset,
    /// Send the prompt of a named quick action
    Quick(String),
    Actions,
    Raw,
    Dismiss,
    Help,
    /// Malformed command with a usage hint
    Invalid(String),
    /// Unknown command (will show help)
    Unknown(String),
    /// Regular prompt to send to the generator
    Prompt(String),
    /// Empty input (skip)
    Empty,
}

impl ReplCommand {
    /// Parse user input into a REPL command.
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();

        if trimmed.is_empty() {
            return ReplCommand::Empty;
        }

        if !trimmed.starts_with('/') {
            return ReplCommand::Prompt(trimmed.to_string());
        }

        let (command, argument) = match trimmed.split_once(char::is_whitespace) {
            Some((command, argument)) => (command, argument.trim()),
            None => (trimmed, ""),
        };

        match command.to_lowercase().as_str() {
            "/quit" | "/exit" | "/q" => ReplCommand::Quit,
            "/play" => ReplCommand::Play,
            "/stop" => ReplCommand::Stop,
            "/code" => ReplCommand::Code,
            "/history" => ReplCommand::History,
            "/recall" => match argument.parse::<usize>() {
                Ok(index) => ReplCommand::Recall(index),
                Err(_) => ReplCommand::Invalid("Usage: /recall N".to_string()),
            },
            "/fresh" => ReplCommand::Fresh,
            "/reset" => ReplCommand::Reset,
            "/quick" if !argument.is_empty() => ReplCommand::Quick(argument.to_string()),
            "/quick" => ReplCommand::Invalid("Usage: /quick NAME (see /actions)".to_string()),
            "/actions" => ReplCommand::Actions,
            "/raw" => ReplCommand::Raw,
            "/dismiss" => ReplCommand::Dismiss,
            "/help" | "/?" => ReplCommand::Help,
            _ => ReplCommand::Unknown(trimmed.to_string()),
        }
    }
}

/// Run an interactive REPL session.
///
/// Returns when the user exits or on EOF (Ctrl+D).
pub async fn run_repl(ctx: &mut CliContext) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    // Piped input gets no banner or prompt
    let interactive = atty::is(atty::Stream::Stdin);

    if interactive {
        eprintln!("livegen-cli interactive mode");
        eprintln!("Describe some music, or /help for commands\n");
    }

    loop {
        if interactive {
            let indicator = if ctx.playback.is_playing() { "▶" } else { "■" };
            match ctx.status.get() {
                Some(status) => print!("[{}] {} > ", status, indicator),
                None => print!("{} > ", indicator),
            }
            stdout.flush()?;
        }

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            // EOF (Ctrl+D)
            eprintln!("\nGoodbye!");
            break;
        }

        match ReplCommand::parse(&input) {
            ReplCommand::Empty => continue,
            ReplCommand::Quit => {
                eprintln!("Goodbye!");
                break;
            }
            ReplCommand::Prompt(prompt) => run_prompt(ctx, &prompt).await,
            ReplCommand::Quick(name) => match ctx.quick_actions.substitute(&name) {
                Some(prompt) => {
                    eprintln!("[quick] {}", prompt);
                    run_prompt(ctx, &prompt).await;
                }
                None => eprintln!("Unknown quick action: {} (see /actions)", name),
            },
            command => handle_command(ctx, command).await,
        }
    }

    Ok(())
}

async fn run_prompt(ctx: &mut CliContext, prompt: &str) {
    // The turn already rendered its error
    if let Err(e) = execute_once(ctx, prompt).await {
        tracing::debug!("Turn failed: {:#}", e);
    }
    println!();
}

async fn handle_command(ctx: &mut CliContext, command: ReplCommand) {
    let busy = ctx.orchestrator.is_busy();
    match command {
        ReplCommand::Play => match ctx.playback.play().await {
            Ok(()) => ctx.status.set("playing"),
            Err(e) => {
                eprintln!("Error: {}", e);
                ctx.banner.show_engine_error(&e);
            }
        },
        ReplCommand::Stop => {
            ctx.playback.stop().await;
            ctx.status.set("stopped");
        }
        ReplCommand::Code => println!("{}", ctx.playback.adapter().get_code()),
        ReplCommand::History => println!("{}", format_history(&ctx.store.get_state())),
        ReplCommand::Recall(_) | ReplCommand::Fresh | ReplCommand::Reset if busy => {
            eprintln!("[busy] wait for the current generation to finish");
        }
        ReplCommand::Recall(index) => {
            match actions::recall_message(&ctx.store, &ctx.playback, index).await {
                Some(_) => ctx.status.set(format!("recalled code from message {}", index)),
                None => eprintln!("Message {} has no code to recall", index),
            }
        }
        ReplCommand::Fresh => {
            actions::start_fresh(&ctx.store, &ctx.playback).await;
            ctx.banner.dismiss();
            ctx.status.set("new session");
        }
        ReplCommand::Reset => {
            actions::reset_history(&ctx.store, &ctx.playback).await;
            ctx.banner.dismiss();
            ctx.status.set("history cleared");
        }
        ReplCommand::Actions => {
            for action in ctx.quick_actions.all() {
                println!("{:<12} {}", action.name, action.prompt);
            }
        }
        ReplCommand::Raw => match (ctx.banner.current(), ctx.banner.diagnostic()) {
            (_, Some(raw)) => println!("{}", raw),
            (Some(_), None) => eprintln!("No diagnostic output for the last error"),
            (None, None) => eprintln!("No error to show"),
        },
        ReplCommand::Dismiss => ctx.banner.dismiss(),
        ReplCommand::Help => eprintln!("{}", HELP),
        ReplCommand::Invalid(usage) => eprintln!("{}", usage),
        ReplCommand::Unknown(cmd) => {
            eprintln!("Unknown command: {}", cmd);
            eprintln!("Type /help for the list of commands");
        }
        ReplCommand::Quit
        | ReplCommand::Prompt(_)
        | ReplCommand::Quick(_)
        | ReplCommand::Empty => {}
    }
}
