//! CLI bootstrap - wire settings, engine, session store and generation client together.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::mpsc;

use crate::ai::{GenerationConfig, GenerationEvent, GenerationOrchestrator};
use crate::engine::{Playback, ProcessAdapter, RunnerCommand};
use crate::extract::FencedCodeExtractor;
use crate::feedback::{ErrorBanner, StatusLine};
use crate::quick_actions::QuickActions;
use crate::session::{Session, SessionPersister, SessionStorage, SessionStore};
use crate::settings::{get_with_env_fallback, LivegenSettings, SettingsFile};

use super::args::Args;

/// Environment variable consulted for the API key after the CLI flag and settings.
pub const API_KEY_ENV: &str = "LIVEGEN_API_KEY";

/// Everything a CLI run needs.
pub struct CliContext {
    pub orchestrator: Arc<GenerationOrchestrator>,

    /// Turn events, drained by the runner while a turn is in flight
    pub event_rx: mpsc::UnboundedReceiver<GenerationEvent>,

    pub store: Arc<SessionStore>,
    pub playback: Arc<Playback>,

    pub banner: ErrorBanner,
    pub status: StatusLine,
    pub quick_actions: QuickActions,

    /// Background session writer, if persistence is on
    persister: Option<SessionPersister>,

    /// Command-line arguments
    pub args: Args,
}

impl CliContext {
    /// Stop playback and flush pending session writes.
    pub async fn shutdown(self) -> Result<()> {
        self.playback.stop().await;

        if let Some(persister) = self.persister {
            persister.shutdown().await;
        }

        Ok(())
    }
}

/// Initialize the CLI context.
pub async fn initialize(args: &Args) -> Result<CliContext> {
    // Load .env file if present
    if let Err(e) = dotenvy::dotenv() {
        // Only warn on errors other than file not found
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("[cli] Failed to load .env file: {}", e);
        }
    }

    let settings_file = SettingsFile::load()
        .await
        .context("Failed to load settings")?;
    let settings = settings_file.settings().clone();

    init_logging(args, &settings)?;

    // Creates the template on first run
    if let Err(e) = settings_file.write_template_if_missing().await {
        tracing::warn!("Failed to create settings template: {:#}", e);
    }

    if args.verbose {
        eprintln!(
            "[cli] Settings loaded from {}",
            settings_file.path().display()
        );
    }

    let default_code = settings.engine.default_code.clone();
    let storage = SessionStorage::new(settings.session.sessions_dir());
    let restored = if settings.session.persistence && !args.fresh {
        restore_session(&storage).await
    } else {
        None
    };

    let initial_code = restored
        .as_ref()
        .map(|s| s.current_code.clone())
        .unwrap_or_else(|| default_code.clone());

    let store = Arc::new(match restored {
        Some(session) => {
            if args.verbose {
                eprintln!(
                    "[cli] Restored session {} ({} messages)",
                    session.session_id,
                    session.chat.len()
                );
            }
            SessionStore::with_session(session, default_code)
        }
        None => SessionStore::new(default_code),
    });
    store.ensure_session();

    let persister = settings
        .session
        .persistence
        .then(|| SessionPersister::spawn(&store, storage));

    let runner = RunnerCommand::from_argv(&settings.engine.runner);
    if args.verbose {
        match &runner {
            Some(r) => eprintln!("[cli] Runner: {}", r.program),
            None => eprintln!("[cli] No runner configured, code is only written to disk"),
        }
    }
    let adapter = Arc::new(ProcessAdapter::new(
        &initial_code,
        settings.engine.scratch_path(),
        runner,
    ));
    let playback = Arc::new(Playback::new(adapter));

    let endpoint = args
        .endpoint
        .clone()
        .unwrap_or_else(|| settings.ai.endpoint.clone());
    let client = livegen_client::Client::new(&endpoint)
        .with_context(|| format!("Invalid generation endpoint '{}'", endpoint))?;

    let config = resolve_config(&settings, args);
    if args.verbose {
        eprintln!("[cli] Endpoint: {}", endpoint);
        eprintln!(
            "[cli] Model: {}",
            config.model.as_deref().unwrap_or("(service default)")
        );
    }

    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let orchestrator = Arc::new(
        GenerationOrchestrator::new(
            store.clone(),
            playback.clone(),
            Arc::new(FencedCodeExtractor::new()),
            Arc::new(client),
            event_tx,
        )
        .with_config(config),
    );

    Ok(CliContext {
        orchestrator,
        event_rx,
        store,
        playback,
        banner: ErrorBanner::new(Duration::from_secs(settings.ui.diagnostic_expiry_secs)),
        status: StatusLine::new(Duration::from_millis(settings.ui.status_clear_ms)),
        quick_actions: QuickActions::from_settings(&settings.quick_actions),
        persister,
        args: args.clone(),
    })
}

fn init_logging(args: &Args, settings: &LivegenSettings) -> Result<()> {
    let log_level = if args.verbose {
        "debug"
    } else {
        settings.advanced.log_level.as_str()
    };
    let directive = format!("livegen={}", log_level)
        .parse::<tracing_subscriber::filter::Directive>()
        .with_context(|| format!("Invalid log level '{}'", log_level))?;

    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(directive))
        .try_init();
    Ok(())
}

async fn restore_session(storage: &SessionStorage) -> Option<Session> {
    match storage.load_active().await {
        Ok(session) => session,
        Err(e) => {
            tracing::warn!("Could not restore the last session, starting fresh: {:#}", e);
            None
        }
    }
}

/// Resolve model and API key. Priority: CLI argument > settings > environment.
fn resolve_config(settings: &LivegenSettings, args: &Args) -> GenerationConfig {
    let model = args
        .model
        .clone()
        .or_else(|| settings.ai.default_model.clone());

    let api_key = args
        .api_key
        .clone()
        .filter(|k| !k.is_empty())
        .or_else(|| get_with_env_fallback(&settings.ai.api_key, &[API_KEY_ENV], None));

    GenerationConfig { model, api_key }
}
