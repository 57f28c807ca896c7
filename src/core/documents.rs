//! Storage for rendered invoice documents.
//!
//! Rendering real PDFs is outside the portal; the issuer writes a small placeholder document and
//! keeps the returned path on the invoice row so it can be downloaded later.

use crate::errors::{Error, Result};
use async_trait::async_trait;
use std::path::PathBuf;

/// Body written for every invoice until a real renderer is plugged in.
pub const PLACEHOLDER_CONTENTS: &[u8] = b"Placeholder for invoice file";

/// Persists and retrieves document bytes by name.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Stores `contents` under `name` and returns the path to record.
    async fn store(&self, name: &str, contents: &[u8]) -> Result<String>;

    /// Reads back a document previously returned by [`DocumentStore::store`].
    async fn load(&self, path: &str) -> Result<Vec<u8>>;
}

/// Document store backed by a local directory.
#[derive(Clone, Debug)]
pub struct FsDocumentStore {
    root: PathBuf,
}

impl FsDocumentStore {
    /// Creates a store rooted at `root`. The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl DocumentStore for FsDocumentStore {
    async fn store(&self, name: &str, contents: &[u8]) -> Result<String> {
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return Err(Error::validation(format!("Invalid document name: {name:?}")));
        }
        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.root.join(name);
        tokio::fs::write(&path, contents).await?;
        tracing::debug!(path = %path.display(), bytes = contents.len(), "Stored document");
        Ok(path.to_string_lossy().into_owned())
    }

    async fn load(&self, path: &str) -> Result<Vec<u8>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::not_found("Document", path))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[tokio::test]
    async fn test_store_then_load() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = FsDocumentStore::new(dir.path().join("invoices"));

        let path = store.store("INV-20250101-0001.pdf", PLACEHOLDER_CONTENTS).await?;
        assert!(path.ends_with("INV-20250101-0001.pdf"));
        assert_eq!(store.load(&path).await?, PLACEHOLDER_CONTENTS);
        Ok(())
    }

    #[tokio::test]
    async fn test_load_missing_file_is_not_found() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = FsDocumentStore::new(dir.path());
        let missing = dir.path().join("nope.pdf");

        let result = store.load(missing.to_str().unwrap()).await;
        assert!(matches!(result, Err(Error::NotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_store_rejects_path_like_names() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = FsDocumentStore::new(dir.path());
        assert!(store.store("../escape.pdf", b"x").await.is_err());
        assert!(store.store("", b"x").await.is_err());
        Ok(())
    }
}
