//! # Audit Log
//!
//! An append-only record of every management action, kept as a JSON array next to the
//! daemon configuration:
//!
//! ```text
//! [
//!     {
//!         "timestamp": "2024-05-01 10:00:00",
//!         "admin_id": 1001,
//!         "action": "add_username",
//!         "target_username": "alice",
//!         "details": "Account 'alice' added. Expires on 2024-05-31 10:00:00."
//!     }
//! ]
//! ```
//!
//! ## Important Notes
//!
//! * A missing, empty or non-array log is started over, with a warning
//! * Failing to write the log never fails the command being audited

use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;
use warden_io::tokio;
use warden_io::tokio::sync::Mutex;
use warden_user::misc::format_timestamp;
use warden_user::prelude::{ActorId, Clock};

/// The audited actions. Each has a `_fail` counterpart
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AuditAction {
    AddUsername,
    DeleteUsername,
    RenewUsername,
    GrantManager,
    RevokeManager,
    Backup,
    Repair,
    Sweep,
}

impl AuditAction {
    /// The name written to the log for a success (`ok`) or a failure
    pub fn name(self, ok: bool) -> &'static str {
        match (self, ok) {
            (AuditAction::AddUsername, true) => "add_username",
            (AuditAction::AddUsername, false) => "add_username_fail",
            (AuditAction::DeleteUsername, true) => "delete_username",
            (AuditAction::DeleteUsername, false) => "delete_username_fail",
            (AuditAction::RenewUsername, true) => "renew_username",
            (AuditAction::RenewUsername, false) => "renew_username_fail",
            (AuditAction::GrantManager, true) => "grant_manager",
            (AuditAction::GrantManager, false) => "grant_manager_fail",
            (AuditAction::RevokeManager, true) => "revoke_manager",
            (AuditAction::RevokeManager, false) => "revoke_manager_fail",
            (AuditAction::Backup, true) => "backup",
            (AuditAction::Backup, false) => "backup_fail",
            (AuditAction::Repair, true) => "repair",
            (AuditAction::Repair, false) => "repair_fail",
            (AuditAction::Sweep, true) => "sweep",
            (AuditAction::Sweep, false) => "sweep_fail",
        }
    }
}

/// One line of the audit log
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct AuditEntry {
    pub timestamp: String,
    pub admin_id: ActorId,
    pub action: String,
    pub target_username: Option<String>,
    pub details: String,
}

/// Appends entries to the audit log file. Clones share the same file and guard
#[derive(Clone)]
pub struct AuditLog {
    path: Option<Arc<PathBuf>>,
    clock: Arc<dyn Clock>,
    guard: Arc<Mutex<()>>,
}

impl AuditLog {
    pub fn new<P: Into<PathBuf>>(path: P, clock: Arc<dyn Clock>) -> Self {
        Self {
            path: Some(Arc::new(path.into())),
            clock,
            guard: Arc::new(Mutex::new(())),
        }
    }

    /// An audit log that records nothing
    pub fn disabled(clock: Arc<dyn Clock>) -> Self {
        Self {
            path: None,
            clock,
            guard: Arc::new(Mutex::new(())),
        }
    }

    /// Appends one entry. Failures are logged, never returned
    pub async fn record<T: Into<String>>(
        &self,
        actor: ActorId,
        action: AuditAction,
        ok: bool,
        target: Option<String>,
        details: T,
    ) {
        let Some(path) = self.path.as_deref() else {
            return;
        };

        let entry = AuditEntry {
            timestamp: format_timestamp(&self.clock.now()),
            admin_id: actor,
            action: action.name(ok).to_string(),
            target_username: target,
            details: details.into(),
        };

        let _guard = self.guard.lock().await;
        let mut entries = read_entries(path).await;
        entries.push(entry);

        let bytes = match serde_json::to_vec_pretty(&entries) {
            Ok(bytes) => bytes,
            Err(err) => {
                log::error!(target: "warden", "Unable to encode the audit log: {}", err);
                return;
            }
        };

        if let Err(err) = tokio::fs::write(path, bytes).await {
            log::error!(target: "warden", "Unable to write the audit log {}: {}", path.display(), err);
        }
    }

    /// Every entry currently in the log
    pub async fn entries(&self) -> Vec<AuditEntry> {
        match self.path.as_deref() {
            Some(path) => {
                let _guard = self.guard.lock().await;
                read_entries(path).await
            }
            None => Vec::new(),
        }
    }
}

async fn read_entries(path: &std::path::Path) -> Vec<AuditEntry> {
    let raw = match tokio::fs::read(path).await {
        Ok(raw) => raw,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            log::warn!(target: "warden", "The audit log {} did not exist and was initialized", path.display());
            return Vec::new();
        }
        Err(err) => {
            log::error!(target: "warden", "Unable to read the audit log {}: {}", path.display(), err);
            return Vec::new();
        }
    };

    if raw.iter().all(u8::is_ascii_whitespace) {
        log::warn!(target: "warden", "The audit log {} was empty and was initialized", path.display());
        return Vec::new();
    }

    match serde_json::from_slice::<Vec<AuditEntry>>(&raw) {
        Ok(entries) => entries,
        Err(err) => {
            log::warn!(target: "warden", "The audit log {} is not a valid list ({}). Starting over", path.display(), err);
            Vec::new()
        }
    }
}
