//! Execution adapter backed by an external runner process.
//!
//! The code lives in memory and is mirrored to a scratch file. When a runner command is
//! configured, `run` launches `<program> <args...> <scratch file>`. A runner that exits
//! non-zero within the startup grace period is treated as a rejection of the code; one
//! that keeps running is considered to be playing until `stop` kills it.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::Mutex as TokioMutex;

use super::{EngineError, ExecutionAdapter};

/// How long a freshly started runner has to report a failure.
const DEFAULT_STARTUP_GRACE: Duration = Duration::from_millis(750);

/// Command used to evaluate the scratch file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl RunnerCommand {
    /// Build from an argv-style list; `None` when the list is empty.
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        if program.trim().is_empty() {
            return None;
        }
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

pub struct ProcessAdapter {
    code: RwLock<String>,
    scratch_path: PathBuf,
    runner: Option<RunnerCommand>,
    child: TokioMutex<Option<Child>>,
    startup_grace: Duration,
}

impl ProcessAdapter {
    pub fn new(initial_code: &str, scratch_path: PathBuf, runner: Option<RunnerCommand>) -> Self {
        Self {
            code: RwLock::new(initial_code.to_string()),
            scratch_path,
            runner,
            child: TokioMutex::new(None),
            startup_grace: DEFAULT_STARTUP_GRACE,
        }
    }

    pub fn with_startup_grace(mut self, grace: Duration) -> Self {
        self.startup_grace = grace;
        self
    }

    pub fn scratch_path(&self) -> &PathBuf {
        &self.scratch_path
    }

    fn write_scratch(&self, code: &str) -> std::io::Result<()> {
        if let Some(parent) = self.scratch_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.scratch_path, code)
    }

    async fn kill_current(&self) -> Result<(), EngineError> {
        let mut guard = self.child.lock().await;
        if let Some(mut child) = guard.take() {
            tracing::debug!("Stopping runner (pid {:?})", child.id());
            child
                .kill()
                .await
                .map_err(|e| EngineError::new(format!("Failed to stop runner: {}", e)))?;
        }
        Ok(())
    }
}

#[async_trait]
impl ExecutionAdapter for ProcessAdapter {
    fn get_code(&self) -> String {
        self.code.read().clone()
    }

    fn set_code(&self, code: &str) {
        *self.code.write() = code.to_string();
        if let Err(e) = self.write_scratch(code) {
            tracing::warn!(
                "Failed to mirror code to {}: {}",
                self.scratch_path.display(),
                e
            );
        }
    }

    async fn run(&self) -> Result<(), EngineError> {
        self.kill_current().await?;

        let code = self.get_code();
        self.write_scratch(&code).map_err(|e| {
            EngineError::new(format!(
                "Failed to write {}: {}",
                self.scratch_path.display(),
                e
            ))
        })?;

        let Some(runner) = &self.runner else {
            tracing::debug!("No runner configured, code written to {}", self.scratch_path.display());
            return Ok(());
        };

        let mut child = Command::new(&runner.program)
            .args(&runner.args)
            .arg(&self.scratch_path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                EngineError::new(format!("Failed to start runner '{}': {}", runner.program, e))
            })?;

        match tokio::time::timeout(self.startup_grace, child.wait()).await {
            Ok(Ok(status)) if status.success() => {
                tracing::info!("Runner finished successfully");
                Ok(())
            }
            Ok(Ok(status)) => {
                let mut diagnostics = String::new();
                if let Some(mut stderr) = child.stderr.take() {
                    let _ = stderr.read_to_string(&mut diagnostics).await;
                }
                if diagnostics.trim().is_empty() {
                    diagnostics = format!("Runner exited with {}", status);
                }
                tracing::warn!("Runner rejected code: {}", diagnostics.trim());
                Err(EngineError::from_diagnostics(&diagnostics))
            }
            Ok(Err(e)) => Err(EngineError::new(format!("Runner failed: {}", e))),
            Err(_) => {
                // Still running: drain stderr so the pipe never fills up
                if let Some(stderr) = child.stderr.take() {
                    tokio::spawn(async move {
                        let mut lines = BufReader::new(stderr).lines();
                        while let Ok(Some(line)) = lines.next_line().await {
                            tracing::debug!(target: "livegen::runner", "{}", line);
                        }
                    });
                }
                tracing::info!("Runner playing (pid {:?})", child.id());
                *self.child.lock().await = Some(child);
                Ok(())
            }
        }
    }

    async fn stop(&self) -> Result<(), EngineError> {
        self.kill_current().await
    }
}
