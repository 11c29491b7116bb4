//! # Backups
//!
//! Point-in-time copies of every persisted document. Each document is copied on its own:
//! a missing file or a failed copy is recorded and the next document is still attempted.
//!
//! ```text
//! backups/
//! ├── config.json_20240501_030000.bak
//! ├── manager_tracking.json_20240501_030000.bak
//! └── manager_allowlist.json_20240501_030000.bak
//! ```
//!
//! The report exposes the daemon configuration copy only when the whole backup
//! succeeded, since that copy is what an operator downloads.

use crate::account_manager::AccountManager;
use crate::backend::Document;
use crate::misc::{AccountError, BACKUP_STAMP_FORMAT};
use std::path::{Path, PathBuf};

/// The outcome of copying one document
#[derive(Clone, Debug)]
pub struct BackupEntry {
    pub document: Document,
    /// The file that was copied
    pub source: PathBuf,
    /// The copy, or why it could not be made
    pub outcome: Result<PathBuf, String>,
}

/// The per-file outcome of a backup
#[derive(Clone, Debug)]
pub struct BackupReport {
    /// The `YYYYMMDD_HHMMSS` stamp shared by every copy
    pub stamp: String,
    pub entries: Vec<BackupEntry>,
}

impl BackupReport {
    /// Whether every document was copied
    pub fn is_complete(&self) -> bool {
        !self.entries.is_empty() && self.entries.iter().all(|entry| entry.outcome.is_ok())
    }

    /// The copy of the daemon configuration, only if every document was copied
    pub fn primary_copy(&self) -> Option<&Path> {
        if !self.is_complete() {
            return None;
        }

        self.entries
            .iter()
            .find(|entry| entry.document == Document::Config)
            .and_then(|entry| entry.outcome.as_ref().ok())
            .map(PathBuf::as_path)
    }

    /// The copies that were made
    pub fn copies(&self) -> impl Iterator<Item = &Path> {
        self.entries
            .iter()
            .filter_map(|entry| entry.outcome.as_ref().ok())
            .map(PathBuf::as_path)
    }

    /// Every document that could not be copied, with the reason
    pub fn failures(&self) -> impl Iterator<Item = (Document, &str)> {
        self.entries.iter().filter_map(|entry| match &entry.outcome {
            Err(reason) => Some((entry.document, reason.as_str())),
            Ok(_) => None,
        })
    }
}

impl std::fmt::Display for BackupReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_complete() {
            return write!(f, "Backup {} created ({} files).", self.stamp, self.entries.len());
        }

        write!(f, "Backup {} is incomplete:", self.stamp)?;
        for (document, reason) in self.failures() {
            write!(f, "\n- {document}: {reason}")?;
        }
        Ok(())
    }
}

impl AccountManager {
    /// Copies every document into the backup location, stamped with the current time.
    /// Fails outright only when the backend cannot take backups at all
    pub async fn create_backup(&self) -> Result<BackupReport, AccountError> {
        let stamp = self.clock().now().format(BACKUP_STAMP_FORMAT).to_string();
        let pers = self.get_persistence_handler();
        let _guard = pers.lock().await;
        let report = pers.backup_documents(&stamp).await?;

        if report.is_complete() {
            log::info!(target: "warden", "Backup {} complete", stamp);
        } else {
            log::error!(target: "warden", "Backup {} incomplete: {} of {} documents copied", stamp, report.copies().count(), report.entries.len());
        }

        Ok(report)
    }
}

/// `<basename>_<stamp>.bak`, or `None` if `source` has no file name
pub fn backup_file_name(source: &Path, stamp: &str) -> Option<String> {
    source
        .file_name()
        .map(|name| format!("{}_{stamp}.bak", name.to_string_lossy()))
}
