//! On-disk session persistence.
//!
//! Layout under the sessions directory:
//! - `<session_id>.json` - full session record
//! - `active` - identifier of the current session
//!
//! Writes go through a temp file and a rename. [`SessionPersister`] subscribes to a
//! [`SessionStore`] and hands snapshots to a background writer task, which only writes
//! the most recent snapshot when several are queued.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::models::Session;
use super::store::{SessionStore, Subscription};

const ACTIVE_FILE: &str = "active";

/// Reads and writes session records in a directory.
#[derive(Debug, Clone)]
pub struct SessionStorage {
    dir: PathBuf,
}

impl SessionStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn session_path(&self, id: Uuid) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    /// Write the session record and mark it active.
    pub async fn save(&self, session: &Session) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create sessions dir {:?}", self.dir))?;

        let json = serde_json::to_string_pretty(session).context("Failed to serialize session")?;
        write_atomic(&self.session_path(session.session_id), json.as_bytes()).await?;
        write_atomic(
            &self.dir.join(ACTIVE_FILE),
            session.session_id.to_string().as_bytes(),
        )
        .await?;

        tracing::debug!(
            "Saved session {} ({} messages)",
            session.session_id,
            session.chat.len()
        );
        Ok(())
    }

    /// Load a session by identifier.
    pub async fn load(&self, id: Uuid) -> Result<Session> {
        let path = self.session_path(id);
        let content = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read session file {:?}", path))?;
        serde_json::from_str(&content).with_context(|| format!("Failed to parse {:?}", path))
    }

    /// Load the session marked active, if there is one.
    ///
    /// A missing marker yields `Ok(None)`; a marker pointing at an unreadable record is an error.
    pub async fn load_active(&self) -> Result<Option<Session>> {
        let marker = self.dir.join(ACTIVE_FILE);
        if !marker.exists() {
            return Ok(None);
        }

        let raw = tokio::fs::read_to_string(&marker)
            .await
            .with_context(|| format!("Failed to read {:?}", marker))?;
        let id = Uuid::parse_str(raw.trim())
            .with_context(|| format!("Invalid session id in {:?}", marker))?;

        self.load(id).await.map(Some)
    }
}

async fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let temp_path = path.with_extension("tmp");
    tokio::fs::write(&temp_path, contents)
        .await
        .with_context(|| format!("Failed to write {:?}", temp_path))?;
    tokio::fs::rename(&temp_path, path)
        .await
        .with_context(|| format!("Failed to rename {:?}", temp_path))?;
    Ok(())
}

/// Store subscriber that persists every change in the background.
pub struct SessionPersister {
    subscription: Option<Subscription>,
    writer: JoinHandle<()>,
}

impl SessionPersister {
    /// Subscribe to `store` and spawn the writer task. Must be called inside a tokio runtime.
    pub fn spawn(store: &Arc<SessionStore>, storage: SessionStorage) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Session>();

        let subscription = store.subscribe(move |session| {
            // The receiver only goes away after shutdown
            let _ = tx.send(session.clone());
        });

        let writer = tokio::spawn(async move {
            while let Some(mut latest) = rx.recv().await {
                while let Ok(newer) = rx.try_recv() {
                    latest = newer;
                }
                if let Err(e) = storage.save(&latest).await {
                    tracing::warn!("Failed to persist session {}: {:#}", latest.session_id, e);
                }
            }
            tracing::debug!("Session writer stopped");
        });

        Self {
            subscription: Some(subscription),
            writer,
        }
    }

    /// Stop listening and wait for queued snapshots to be written.
    pub async fn shutdown(mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
        if let Err(e) = (&mut self.writer).await {
            tracing::warn!("Session writer task failed: {}", e);
        }
    }
}
