//! Local filesystem object store.

use crate::{
    errors::StorageError,
    store::{decode_body, encode_record, object_path, ObjectStore},
};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use trustless_types::{FileType, SavedFile, TrustlessRecord};

/// Writes record payloads under a root directory, optionally gzipped.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
    compression: bool,
}

impl LocalStore {
    /// Creates a store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>, compression: bool) -> Self {
        Self { root: root.into(), compression }
    }

    fn absolute(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    async fn save(
        &self,
        record: &TrustlessRecord,
        attach_proof: bool,
    ) -> Result<SavedFile, StorageError> {
        let path = object_path(record, self.compression);
        let body = encode_record(record, attach_proof, self.compression)?;

        let target = self.absolute(&path);
        if let Some(dir) = target.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        tokio::fs::write(&target, body).await?;

        Ok(SavedFile { file_type: FileType::Local, path })
    }

    async fn load(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        // Reject handles trying to escape the storage root.
        if Path::new(path).components().any(|c| matches!(c, std::path::Component::ParentDir)) {
            return Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "path escapes storage root",
            )));
        }
        let raw = tokio::fs::read(self.absolute(path)).await?;
        decode_body(path, raw)
    }
}
