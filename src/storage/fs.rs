//! Filesystem document store
//!
//! Layout: `{root}/{document_id}/{file_name}`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::types::{validate_key_part, ObjectMetadata, StorageError, StorageObject, StorageResult};
use super::DocumentStore;

#[derive(Debug, Clone)]
pub struct FsDocumentStore {
    root: PathBuf,
}

impl FsDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, document_id: &str, file_name: &str) -> StorageResult<PathBuf> {
        validate_key_part(document_id)?;
        validate_key_part(file_name)?;
        Ok(self.root.join(document_id).join(file_name))
    }

    fn not_found(document_id: &str, file_name: &str) -> StorageError {
        StorageError::ObjectNotFound(format!("{}/{}", document_id, file_name))
    }
}

#[async_trait]
impl DocumentStore for FsDocumentStore {
    async fn get(&self, document_id: &str, file_name: &str) -> StorageResult<StorageObject> {
        let path = self.path_for(document_id, file_name)?;

        let data = match tokio::fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Self::not_found(document_id, file_name));
            }
            Err(e) => return Err(e.into()),
        };
        let last_modified = tokio::fs::metadata(&path)
            .await
            .ok()
            .and_then(|m| m.modified().ok())
            .map(DateTime::<Utc>::from);

        tracing::debug!("Read {} bytes from {}", data.len(), path.display());

        Ok(StorageObject {
            metadata: ObjectMetadata {
                document_id: document_id.to_string(),
                file_name: file_name.to_string(),
                size: data.len() as u64,
                last_modified,
            },
            data,
        })
    }

    async fn put(
        &self,
        document_id: &str,
        file_name: &str,
        data: Vec<u8>,
    ) -> StorageResult<ObjectMetadata> {
        let path = self.path_for(document_id, file_name)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let size = data.len() as u64;
        tokio::fs::write(&path, data).await?;

        Ok(ObjectMetadata {
            document_id: document_id.to_string(),
            file_name: file_name.to_string(),
            size,
            last_modified: Some(Utc::now()),
        })
    }

    async fn list(&self, document_id: &str) -> StorageResult<Vec<ObjectMetadata>> {
        validate_key_part(document_id)?;
        let dir = self.root.join(document_id);

        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut objects = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            objects.push(ObjectMetadata {
                document_id: document_id.to_string(),
                file_name: entry.file_name().to_string_lossy().into_owned(),
                size: metadata.len(),
                last_modified: metadata.modified().ok().map(DateTime::<Utc>::from),
            });
        }
        objects.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        Ok(objects)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_list() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsDocumentStore::new(dir.path());

        store.put("doc-1", "b.png", vec![1, 2, 3]).await.unwrap();
        store.put("doc-1", "a.pdf", vec![4]).await.unwrap();

        let object = store.get("doc-1", "b.png").await.unwrap();
        assert_eq!(object.data, vec![1, 2, 3]);
        assert_eq!(object.metadata.size, 3);
        assert!(object.metadata.last_modified.is_some());

        let listed = store.list("doc-1").await.unwrap();
        let names: Vec<_> = listed.iter().map(|o| o.file_name.as_str()).collect();
        assert_eq!(names, vec!["a.pdf", "b.png"]);
        assert!(store.list("doc-2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsDocumentStore::new(dir.path());
        let err = store.get("doc-1", "missing.pdf").await.unwrap_err();
        assert!(matches!(err, StorageError::ObjectNotFound(_)));
    }

    #[tokio::test]
    async fn test_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsDocumentStore::new(dir.path().join("root"));
        let err = store.get("..", "secret.txt").await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey(_)));
        let err = store.put("doc", "../escape", vec![]).await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey(_)));
    }
}
