//! # Filesystem Backend
//!
//! Persists the three documents as plain JSON files, in the locations described by a
//! [`DirectoryStore`]. The daemon configuration is the very file the VPN daemon reads.
//!
//! ## Features
//!
//! * Full-overwrite writes through a sibling temporary file and a rename, so a crash
//!   never leaves a half-written document behind
//! * Timestamped backup copies of every document
//! * Directory setup on connect
//!
//! ## Important Notes
//!
//! * Single writer only: the guard in `PersistenceHandler` serializes writers inside one
//!   process, nothing protects against a second process
//! * A missing file reads as `None`; any other I/O failure is an error
//!
//! ## Related Components
//!
//! * `DirectoryStore`: Where each document lives
//! * `BackupReport`: The per-file result of a backup
//! * `BackendConnection`: The trait implemented here

use crate::backend::{BackendConnection, Document};
use crate::backup::{backup_file_name, BackupEntry, BackupReport};
use crate::directory_store::{setup_directories, BasePath, DirectoryStore};
use crate::misc::AccountError;
use async_trait::async_trait;
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use warden_io::tokio;

/// A backend storing each document as a JSON file on the local filesystem
pub struct FilesystemBackend {
    directory_store: DirectoryStore,
    connected: bool,
}

impl From<DirectoryStore> for FilesystemBackend {
    fn from(directory_store: DirectoryStore) -> Self {
        Self {
            directory_store,
            connected: false,
        }
    }
}

impl FilesystemBackend {
    fn path_of(&self, document: Document) -> &Path {
        self.directory_store.document_path(document)
    }

    /// The directory store this backend operates on
    pub fn directory_store(&self) -> &DirectoryStore {
        &self.directory_store
    }
}

#[async_trait]
impl BackendConnection for FilesystemBackend {
    async fn connect(&mut self) -> Result<(), AccountError> {
        setup_directories(&self.directory_store)?;
        self.connected = true;
        Ok(())
    }

    async fn is_connected(&self) -> Result<bool, AccountError> {
        Ok(self.connected)
    }

    async fn read_document(&self, document: Document) -> Result<Option<Vec<u8>>, AccountError> {
        let path = self.path_of(document);
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(AccountError::storage(
                document,
                format!("unable to read {}: {err}", path.display()),
            )),
        }
    }

    async fn write_document(
        &self,
        document: Document,
        bytes: Vec<u8>,
    ) -> Result<(), AccountError> {
        let path = self.path_of(document);
        let staging = staging_path(path);

        let result = async {
            tokio::fs::write(&staging, &bytes).await?;
            tokio::fs::rename(&staging, path).await
        }
        .await;

        result.map_err(|err| {
            let _ = std::fs::remove_file(&staging);
            AccountError::storage(document, format!("unable to write {}: {err}", path.display()))
        })
    }

    async fn document_exists(&self, document: Document) -> Result<bool, AccountError> {
        Ok(tokio::fs::metadata(self.path_of(document)).await.is_ok())
    }

    async fn backup_documents(&self, stamp: &str) -> Result<BackupReport, AccountError> {
        tokio::fs::create_dir_all(&self.directory_store.backup_dir)
            .await
            .map_err(|err| {
                AccountError::msg(format!(
                    "Unable to create the backup directory {}: {err}",
                    self.directory_store.backup_dir.display()
                ))
            })?;

        let mut entries = Vec::with_capacity(Document::ALL.len());
        for document in Document::ALL {
            let source = self.path_of(document).to_path_buf();
            let outcome = match backup_file_name(&source, stamp) {
                Some(name) => {
                    let destination = self.directory_store.make_path(BasePath::BackupDir, name);
                    copy_document(&source, destination).await
                }
                None => Err(format!("{} has no file name", source.display())),
            };

            match &outcome {
                Ok(copy) => {
                    log::info!(target: "warden", "Backed up {} to {}", source.display(), copy.display())
                }
                Err(err) => {
                    log::error!(target: "warden", "Unable to back up {}: {}", source.display(), err)
                }
            }

            entries.push(BackupEntry {
                document,
                source,
                outcome,
            });
        }

        Ok(BackupReport {
            stamp: stamp.to_string(),
            entries,
        })
    }
}

async fn copy_document(source: &Path, destination: PathBuf) -> Result<PathBuf, String> {
    if tokio::fs::metadata(source).await.is_err() {
        return Err(format!("{} does not exist", source.display()));
    }

    tokio::fs::copy(source, &destination)
        .await
        .map(|_| destination)
        .map_err(|err| err.to_string())
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(|| OsString::from("document"));
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staging_is_a_sibling() {
        assert_eq!(
            staging_path(Path::new("/etc/zivpn/config.json")),
            PathBuf::from("/etc/zivpn/config.json.tmp")
        );
    }

    #[tokio::test]
    async fn write_then_read() {
        let tmp = tempfile::tempdir().unwrap();
        let mut backend = FilesystemBackend::from(DirectoryStore::new(tmp.path()));
        backend.connect().await.unwrap();
        assert!(backend.is_connected().await.unwrap());

        assert_eq!(backend.read_document(Document::Config).await.unwrap(), None);
        backend
            .write_document(Document::Config, b"{}\n".to_vec())
            .await
            .unwrap();
        assert!(backend.document_exists(Document::Config).await.unwrap());
        assert_eq!(
            backend.read_document(Document::Config).await.unwrap(),
            Some(b"{}\n".to_vec())
        );
        assert!(!tmp.path().join("config.json.tmp").exists());
    }

    #[tokio::test]
    async fn write_into_missing_directory_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let store = DirectoryStore::new(tmp.path())
            .with_tracking_file(tmp.path().join("missing").join("tracking.json"));
        let backend = FilesystemBackend::from(store);
        let err = backend
            .write_document(Document::Tracking, b"[]".to_vec())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AccountError::Storage {
                document: Document::Tracking,
                ..
            }
        ));
    }
}
