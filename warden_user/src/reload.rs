//! # Daemon Reload
//!
//! After the active list changes, the VPN daemon has to be restarted to pick it up. The
//! restart itself is a collaborator behind [`ReloadTrigger`]; the ledger only records
//! whether it worked.
//!
//! ## Important Notes
//!
//! * A reload is attempted after the document guard is released
//! * A failed reload never fails or reverts the operation that requested it
//! * [`ReloadCommand`] kills the child process when the timeout elapses

use crate::misc::AccountError;
use async_trait::async_trait;
use std::time::Duration;
use warden_io::tokio;

/// Default bound on a daemon restart
pub const DEFAULT_RELOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Restarts the consuming daemon
#[async_trait]
pub trait ReloadTrigger: Send + Sync {
    /// Restart the daemon now
    async fn reload(&self) -> Result<(), AccountError>;
}

/// Runs an external program (by default `systemctl restart <unit>`) under a timeout
#[derive(Clone, Debug)]
pub struct ReloadCommand {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl ReloadCommand {
    pub fn new<P: Into<String>, I: IntoIterator<Item = S>, S: Into<String>>(
        program: P,
        args: I,
    ) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            timeout: DEFAULT_RELOAD_TIMEOUT,
        }
    }

    /// `systemctl restart <unit>`
    pub fn systemd<T: Into<String>>(unit: T) -> Self {
        Self::new("systemctl", ["restart".to_string(), unit.into()])
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl std::fmt::Display for ReloadCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

#[async_trait]
impl ReloadTrigger for ReloadCommand {
    async fn reload(&self) -> Result<(), AccountError> {
        let child = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, child)
            .await
            .map_err(|_| {
                AccountError::ReloadFailed(format!(
                    "'{self}' did not finish within {}s",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|err| AccountError::ReloadFailed(format!("unable to run '{self}': {err}")))?;

        if output.status.success() {
            log::trace!(target: "warden", "'{}' succeeded", self);
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(AccountError::ReloadFailed(format!(
                "'{self}' exited with {}: {}",
                output.status,
                stderr.trim()
            )))
        }
    }
}

/// For deployments without a daemon to restart
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopReload;

#[async_trait]
impl ReloadTrigger for NoopReload {
    async fn reload(&self) -> Result<(), AccountError> {
        Ok(())
    }
}

/// Whether the daemon was restarted after an operation
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReloadStatus {
    /// The active list did not change
    NotRequired,
    Reloaded,
    /// The documents were saved but the daemon still runs the previous list
    Failed(String),
}

impl ReloadStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(..))
    }
}

/// Runs `trigger`, logging any failure instead of returning it
pub(crate) async fn reload_logged(trigger: &dyn ReloadTrigger, cause: &str) -> ReloadStatus {
    match trigger.reload().await {
        Ok(()) => {
            log::info!(target: "warden", "Daemon reloaded after {}", cause);
            ReloadStatus::Reloaded
        }
        Err(err) => {
            log::error!(target: "warden", "CRITICAL: daemon reload after {} failed: {}. The saved documents stay authoritative", cause, err);
            ReloadStatus::Failed(err.into_string())
        }
    }
}
