use std::ops::Deref;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use crate::account::AccountRecord;
use crate::backup::BackupReport;
use crate::misc::AccountError;
use crate::primary_config::PrimaryConfig;
use crate::serialization::{decode_allowlist, decode_config, decode_tracking, JsonIO};
use warden_io::tokio::sync::{Mutex, MutexGuard};
use warden_types::prelude::{AccountId, ActorId};

#[cfg(feature = "filesystem")]
use crate::directory_store::DirectoryStore;

/// Implementation for the default filesystem backend
#[cfg(feature = "filesystem")]
pub mod filesystem_backend;
/// Implementation for an in-memory backend. Nothing survives the process.
/// This is useful for tests and dry runs
pub mod memory;

/// The three documents persisted by the warden
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Document {
    /// The daemon configuration holding the active list
    Config,
    /// Ownership and expiration of every managed account
    Tracking,
    /// Identities allowed to manage accounts
    Allowlist,
}

impl Document {
    /// Every document, in the order they are saved and backed up
    pub const ALL: [Document; 3] = [Document::Config, Document::Tracking, Document::Allowlist];
}

impl std::fmt::Display for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Document::Config => write!(f, "the daemon configuration"),
            Document::Tracking => write!(f, "the tracking ledger"),
            Document::Allowlist => write!(f, "the manager allowlist"),
        }
    }
}

/// Used when constructing the account manager
#[derive(Clone, Debug, Eq, PartialEq)]
#[allow(variant_size_differences)]
pub enum BackendType {
    /// Documents are lost between program executions. Ideal for tests and
    /// dry runs against a daemon that is not installed
    InMemory,
    /// Synchronization will occur on the filesystem
    #[cfg(feature = "filesystem")]
    Filesystem(DirectoryStore),
}

impl BackendType {
    /// Creates a new [`BackendType`] given the provided `url`. Returns an error
    /// if the URL could not be parsed
    pub fn new<T: Into<String>>(url: T) -> Result<Self, AccountError> {
        let addr = url.into();
        if addr == "memory:" {
            return Ok(Self::InMemory);
        }

        #[cfg(feature = "filesystem")]
        {
            if let Some(home) = addr.strip_prefix("file:") {
                return Ok(Self::filesystem(home));
            }
        }

        Err(AccountError::msg(format!("The addr '{addr}' is not a valid target (hint: use 'memory:' or 'file:/path/to/home' with the 'filesystem' feature enabled)")))
    }

    /// For requesting the use of the local filesystem as a backend, with every document
    /// placed under `home` by its default name
    #[cfg(feature = "filesystem")]
    pub fn filesystem<T: Into<PathBuf>>(home: T) -> Self {
        Self::Filesystem(DirectoryStore::new(home.into()))
    }
}

/// An interface for synchronizing the raw documents to differing targets
#[async_trait]
pub trait BackendConnection: Send + Sync {
    /// This should be run for handling any types of underlying connect operations
    async fn connect(&mut self) -> Result<(), AccountError>;
    /// Determines if connected or not
    async fn is_connected(&self) -> Result<bool, AccountError>;
    /// Returns the raw bytes of `document`, or `None` if it does not exist
    async fn read_document(&self, document: Document) -> Result<Option<Vec<u8>>, AccountError>;
    /// Replaces `document` entirely with `bytes`
    async fn write_document(&self, document: Document, bytes: Vec<u8>)
        -> Result<(), AccountError>;
    /// Determines if `document` exists
    async fn document_exists(&self, document: Document) -> Result<bool, AccountError> {
        Ok(self.read_document(document).await?.is_some())
    }
    /// Copies every document to an archive whose name carries `stamp`. Every document
    /// is attempted, and each outcome is reported individually
    #[allow(unused_variables)]
    async fn backup_documents(&self, stamp: &str) -> Result<BackupReport, AccountError> {
        Err(AccountError::Generic(
            "The target does not support backups".into(),
        ))
    }
}

/// Shared by every component operating on one document set. Typed loads recover from
/// corruption, typed saves surface every failure, and a single guard serializes each
/// load-mutate-save sequence
pub struct PersistenceHandler {
    inner: Arc<dyn BackendConnection>,
    guard: Arc<Mutex<()>>,
    seed: Arc<Vec<AccountId>>,
}

impl PersistenceHandler {
    /// Creates a new persistence handler, connecting to the backend then
    /// returning self. `seed` is the active list of the default daemon configuration
    pub async fn create<T: BackendConnection + 'static>(
        mut inner: T,
        seed: Vec<AccountId>,
    ) -> Result<Self, AccountError> {
        inner.connect().await?;
        Ok(Self {
            inner: Arc::new(inner),
            guard: Arc::new(Mutex::new(())),
            seed: Arc::new(seed),
        })
    }

    /// Acquires the document guard. Hold it across a full load-mutate-save sequence
    pub async fn lock(&self) -> MutexGuard<'_, ()> {
        self.guard.lock().await
    }

    /// Writes the default of every document that does not exist yet. Existing documents,
    /// even corrupt ones, are left untouched
    pub async fn initialize(&self) -> Result<Vec<Document>, AccountError> {
        let _guard = self.lock().await;
        let mut created = Vec::new();

        for document in Document::ALL {
            if self.inner.document_exists(document).await? {
                continue;
            }

            let bytes = match document {
                Document::Config => PrimaryConfig::with_seed(&self.seed)
                    .to_value()
                    .serialize_to_document(document)?,
                Document::Tracking => Vec::<AccountRecord>::new().serialize_to_document(document)?,
                Document::Allowlist => Vec::<ActorId>::new().serialize_to_document(document)?,
            };

            self.inner.write_document(document, bytes).await?;
            log::info!(target: "warden", "Created {} with its default content", document);
            created.push(document);
        }

        Ok(created)
    }

    /// Loads the daemon configuration. Never fails
    pub async fn load_config(&self) -> PrimaryConfig {
        decode_config(self.read_or_log(Document::Config).await, &self.seed)
    }

    pub async fn save_config(&self, config: &PrimaryConfig) -> Result<(), AccountError> {
        let bytes = config.to_value().serialize_to_document(Document::Config)?;
        self.write(Document::Config, bytes).await
    }

    /// Loads the tracking ledger. Never fails
    pub async fn load_tracking(&self) -> Vec<AccountRecord> {
        decode_tracking(self.read_or_log(Document::Tracking).await)
    }

    pub async fn save_tracking(&self, records: &[AccountRecord]) -> Result<(), AccountError> {
        let bytes = records.serialize_to_document(Document::Tracking)?;
        self.write(Document::Tracking, bytes).await
    }

    /// Loads the manager allowlist. Never fails
    pub async fn load_allowlist(&self) -> Vec<ActorId> {
        decode_allowlist(self.read_or_log(Document::Allowlist).await)
    }

    pub async fn save_allowlist(&self, managers: &[ActorId]) -> Result<(), AccountError> {
        let bytes = managers.serialize_to_document(Document::Allowlist)?;
        self.write(Document::Allowlist, bytes).await
    }

    async fn read_or_log(&self, document: Document) -> Option<Vec<u8>> {
        match self.inner.read_document(document).await {
            Ok(raw) => raw,
            Err(err) => {
                log::error!(target: "warden", "Unable to read {}: {}", document, err);
                None
            }
        }
    }

    async fn write(&self, document: Document, bytes: Vec<u8>) -> Result<(), AccountError> {
        self.inner
            .write_document(document, bytes)
            .await
            .map_err(|err| match err {
                err @ AccountError::Storage { .. } => err,
                err => AccountError::storage(document, err),
            })?;
        log::trace!(target: "warden", "Saved {}", document);
        Ok(())
    }
}

impl Deref for PersistenceHandler {
    type Target = Arc<dyn BackendConnection>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl Clone for PersistenceHandler {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            guard: self.guard.clone(),
            seed: self.seed.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::MemoryBackend;

    #[test]
    fn backend_urls() {
        assert_eq!(BackendType::new("memory:").unwrap(), BackendType::InMemory);
        assert_eq!(
            BackendType::new("file:/etc/zivpn").unwrap(),
            BackendType::filesystem("/etc/zivpn")
        );
        assert!(BackendType::new("redis://localhost").is_err());
    }

    #[tokio::test]
    async fn initialize_only_creates_missing_documents() {
        let backend = MemoryBackend::default();
        backend.insert_raw(Document::Allowlist, b"[7]".to_vec());
        let handler = PersistenceHandler::create(backend, vec!["root".into()])
            .await
            .unwrap();

        let created = handler.initialize().await.unwrap();
        assert_eq!(created, vec![Document::Config, Document::Tracking]);
        assert_eq!(handler.load_allowlist().await, vec![7]);
        assert_eq!(handler.load_config().await.active(), &[AccountId::from("root")]);
        assert!(handler.initialize().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn write_failures_are_storage_errors() {
        let backend = MemoryBackend::default();
        backend.fail_writes_to(Document::Tracking);
        let handler = PersistenceHandler::create(backend, Vec::new()).await.unwrap();
        let err = handler.save_tracking(&[]).await.unwrap_err();
        assert!(matches!(
            err,
            AccountError::Storage {
                document: Document::Tracking,
                inconsistent: false,
                ..
            }
        ));
    }
}
