use crate::backend::{BackendConnection, Document};
use crate::misc::AccountError;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use warden_io::RwLock;

/// A backend that keeps every document in memory. Clones share the same documents, so
/// a handle kept outside the [`PersistenceHandler`](crate::backend::PersistenceHandler)
/// can inspect or corrupt them
#[derive(Clone, Default)]
pub struct MemoryBackend {
    documents: Arc<RwLock<HashMap<Document, Vec<u8>>>>,
    failing: Arc<RwLock<HashSet<Document>>>,
}

impl MemoryBackend {
    /// Replaces `document` with arbitrary bytes
    pub fn insert_raw(&self, document: Document, bytes: Vec<u8>) {
        let _ = self.documents.write().insert(document, bytes);
    }

    /// Removes `document` entirely
    pub fn remove_raw(&self, document: Document) -> Option<Vec<u8>> {
        self.documents.write().remove(&document)
    }

    /// The raw bytes of `document`, if present
    pub fn raw(&self, document: Document) -> Option<Vec<u8>> {
        self.documents.read().get(&document).cloned()
    }

    /// Makes every subsequent write to `document` fail
    pub fn fail_writes_to(&self, document: Document) {
        let _ = self.failing.write().insert(document);
    }

    /// Lets writes to `document` succeed again
    pub fn restore_writes_to(&self, document: Document) {
        let _ = self.failing.write().remove(&document);
    }
}

#[async_trait]
impl BackendConnection for MemoryBackend {
    async fn connect(&mut self) -> Result<(), AccountError> {
        Ok(())
    }

    async fn is_connected(&self) -> Result<bool, AccountError> {
        Ok(true)
    }

    async fn read_document(&self, document: Document) -> Result<Option<Vec<u8>>, AccountError> {
        Ok(self.raw(document))
    }

    async fn write_document(
        &self,
        document: Document,
        bytes: Vec<u8>,
    ) -> Result<(), AccountError> {
        if self.failing.read().contains(&document) {
            return Err(AccountError::storage(document, "write rejected by the backend"));
        }

        self.insert_raw(document, bytes);
        Ok(())
    }

    async fn document_exists(&self, document: Document) -> Result<bool, AccountError> {
        Ok(self.documents.read().contains_key(&document))
    }
}
