//! Child processes for external translators and simulation engines.
//!
//! The caller holds the running child through [`ExternalCommand::run`] and
//! can stop it from another thread through a [`CancelFlag`]; a cancelled
//! child is killed and reaped before the call returns.

use crate::error::DragonflyError;
use anyhow::Result;
use log::{debug, info, warn};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Shared cancellation switch.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A program invocation.
#[derive(Debug, Clone)]
pub struct ExternalCommand {
    pub program: OsString,
    pub args: Vec<OsString>,
    pub working_dir: Option<PathBuf>,
}

impl ExternalCommand {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: vec![],
            working_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn current_dir(mut self, dir: &Path) -> Self {
        self.working_dir = Some(dir.to_path_buf());
        self
    }

    fn display(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }

    /// Runs the program to completion.
    ///
    /// # Returns
    /// The exit status of a successful run
    ///
    /// # Errors
    /// `ExternalFailure` when the program cannot start, exits with a
    /// non-zero status, or is cancelled.
    pub fn run(&self, cancel: &CancelFlag) -> Result<ExitStatus> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).stdin(Stdio::null());
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }
        let mut child = cmd.spawn().map_err(|e| {
            DragonflyError::ExternalFailure(format!("Failed to start {}: {}", self.display(), e))
        })?;
        info!("Started {} (pid {})", self.display(), child.id());

        loop {
            if cancel.is_cancelled() {
                warn!("Cancelling {} (pid {})", self.display(), child.id());
                if let Err(e) = child.kill() {
                    debug!("Kill failed, the process may have exited: {}", e);
                }
                let _ = child.wait();
                return Err(DragonflyError::ExternalFailure(format!("{} was cancelled", self.display())).into());
            }
            let polled = child.try_wait().map_err(|e| {
                DragonflyError::ExternalFailure(format!("Failed to wait for {}: {}", self.display(), e))
            })?;
            if let Some(status) = polled {
                if !status.success() {
                    return Err(DragonflyError::ExternalFailure(format!(
                        "{} exited with {}",
                        self.display(),
                        status
                    ))
                    .into());
                }
                debug!("{} finished", self.display());
                return Ok(status);
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_success_and_failure() -> Result<()> {
        let cancel = CancelFlag::new();
        ExternalCommand::new("true").run(&cancel)?;
        let err = ExternalCommand::new("false").run(&cancel).unwrap_err();
        assert!(matches!(crate::error::kind(&err), Some(DragonflyError::ExternalFailure(_))));
        Ok(())
    }

    #[test]
    fn test_missing_program() {
        let err = ExternalCommand::new("dragonfly-no-such-program").run(&CancelFlag::new()).unwrap_err();
        assert!(matches!(crate::error::kind(&err), Some(DragonflyError::ExternalFailure(_))));
    }

    #[test]
    fn test_cancel_kills_child() {
        let cancel = CancelFlag::new();
        let remote = cancel.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            remote.cancel();
        });
        let start = Instant::now();
        let result = ExternalCommand::new("sleep").arg("30").run(&cancel);
        handle.join().unwrap();
        assert!(result.is_err());
        assert!(start.elapsed() < Duration::from_secs(10));
    }
}
