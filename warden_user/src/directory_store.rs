//! # Directory Store Management
//!
//! Where each persisted document lives on disk.
//!
//! ## Directory Structure
//!
//! ```text
//! /etc/zivpn/
//! ├── config.json              # daemon configuration (read by the VPN daemon)
//! ├── manager_tracking.json    # ownership and expiration of every managed account
//! ├── manager_allowlist.json   # identities allowed to manage accounts
//! └── backups/                 # <file>_<YYYYMMDD_HHMMSS>.bak copies
//! ```
//!
//! Every file can be relocated individually; the daemon configuration in particular is
//! usually dictated by the daemon's packaging.
//!
//! ## Usage Example
//!
//! ```rust
//! use warden_user::directory_store::{DirectoryStore, BasePath, setup_directories};
//!
//! fn prepare() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = DirectoryStore::new("/var/lib/warden")
//!         .with_config_file("/etc/zivpn/config.json");
//!     setup_directories(&store)?;
//!     let archive = store.make_path(BasePath::BackupDir, "config.json_20240101_000000.bak");
//!     assert!(archive.starts_with("/var/lib/warden/backups"));
//!     Ok(())
//! }
//! ```
//!
//! ## Important Notes
//!
//! * Parent directories of every document and the backup directory are created on setup
//! * Documents themselves are created by `PersistenceHandler::initialize`

use crate::backend::Document;
use crate::misc::AccountError;
use std::fs::create_dir_all as mkdir;
use std::path::{Path, PathBuf};

/// Default home of the daemon configuration and the warden documents
pub const DEFAULT_HOME: &str = "/etc/zivpn";
pub const CONFIG_FILE_NAME: &str = "config.json";
pub const TRACKING_FILE_NAME: &str = "manager_tracking.json";
pub const ALLOWLIST_FILE_NAME: &str = "manager_allowlist.json";
pub const BACKUP_DIR_NAME: &str = "backups";

/// Correlated to important directories for the program
#[allow(missing_docs)]
pub enum BasePath {
    Home,
    BackupDir,
}

#[derive(Clone, Debug, PartialEq, Eq)]
/// Stores important information for the filesystem
pub struct DirectoryStore {
    /// The warden home directory
    pub home: PathBuf,
    /// The daemon configuration
    pub config_file: PathBuf,
    /// The tracking ledger
    pub tracking_file: PathBuf,
    /// The manager allowlist
    pub allowlist_file: PathBuf,
    /// Destination of backup copies
    pub backup_dir: PathBuf,
}

impl DirectoryStore {
    /// Places every document under `home` using the default file names
    pub fn new<P: AsRef<Path>>(home: P) -> Self {
        let home = home.as_ref().to_path_buf();
        Self {
            config_file: home.join(CONFIG_FILE_NAME),
            tracking_file: home.join(TRACKING_FILE_NAME),
            allowlist_file: home.join(ALLOWLIST_FILE_NAME),
            backup_dir: home.join(BACKUP_DIR_NAME),
            home,
        }
    }

    pub fn with_config_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config_file = path.into();
        self
    }

    pub fn with_tracking_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.tracking_file = path.into();
        self
    }

    pub fn with_allowlist_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.allowlist_file = path.into();
        self
    }

    pub fn with_backup_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.backup_dir = path.into();
        self
    }

    /// Creates a path given the `base` value (the base value should come from self)
    pub fn make_path<T: AsRef<Path>>(&self, base: BasePath, file: T) -> PathBuf {
        let base = match base {
            BasePath::Home => &self.home,
            BasePath::BackupDir => &self.backup_dir,
        };

        base.join(file)
    }

    /// The file backing `document`
    pub fn document_path(&self, document: Document) -> &Path {
        match document {
            Document::Config => &self.config_file,
            Document::Tracking => &self.tracking_file,
            Document::Allowlist => &self.allowlist_file,
        }
    }
}

impl Default for DirectoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_HOME)
    }
}

/// Creates the home directory, the parents of every document and the backup directory
pub fn setup_directories(store: &DirectoryStore) -> Result<(), AccountError> {
    let mut dirs = vec![store.home.clone(), store.backup_dir.clone()];
    dirs.extend(
        Document::ALL
            .iter()
            .filter_map(|doc| store.document_path(*doc).parent().map(Path::to_path_buf))
            .filter(|parent| !parent.as_os_str().is_empty()),
    );

    for dir in dirs {
        mkdir(&dir).map_err(|err| {
            AccountError::msg(format!("Unable to create directory {}: {err}", dir.display()))
        })?;
    }

    log::trace!(target: "warden", "Directories ready under {}", store.home.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layout() {
        let store = DirectoryStore::new("/srv/warden");
        assert_eq!(
            store.document_path(Document::Tracking),
            Path::new("/srv/warden/manager_tracking.json")
        );
        assert_eq!(
            store.make_path(BasePath::BackupDir, "x.bak"),
            PathBuf::from("/srv/warden/backups/x.bak")
        );
        assert_eq!(
            store.make_path(BasePath::Home, "admin_log.json"),
            PathBuf::from("/srv/warden/admin_log.json")
        );
    }

    #[test]
    fn setup_creates_relocated_parents() {
        let tmp = tempfile::tempdir().unwrap();
        let store = DirectoryStore::new(tmp.path().join("home"))
            .with_config_file(tmp.path().join("daemon/etc/config.json"));
        setup_directories(&store).unwrap();
        assert!(tmp.path().join("daemon/etc").is_dir());
        assert!(store.backup_dir.is_dir());
    }
}
