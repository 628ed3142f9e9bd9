//! In-memory document store

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use super::types::{validate_key_part, ObjectMetadata, StorageError, StorageObject, StorageResult};
use super::DocumentStore;

#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    objects: RwLock<HashMap<(String, String), Vec<u8>>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get(&self, document_id: &str, file_name: &str) -> StorageResult<StorageObject> {
        let key = (document_id.to_string(), file_name.to_string());
        let data = self
            .objects
            .read()
            .get(&key)
            .cloned()
            .ok_or_else(|| StorageError::ObjectNotFound(format!("{}/{}", document_id, file_name)))?;

        Ok(StorageObject {
            metadata: ObjectMetadata {
                document_id: document_id.to_string(),
                file_name: file_name.to_string(),
                size: data.len() as u64,
                last_modified: None,
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
        validate_key_part(document_id)?;
        validate_key_part(file_name)?;
        let size = data.len() as u64;
        self.objects
            .write()
            .insert((document_id.to_string(), file_name.to_string()), data);

        Ok(ObjectMetadata {
            document_id: document_id.to_string(),
            file_name: file_name.to_string(),
            size,
            last_modified: Some(Utc::now()),
        })
    }

    async fn list(&self, document_id: &str) -> StorageResult<Vec<ObjectMetadata>> {
        let mut objects: Vec<ObjectMetadata> = self
            .objects
            .read()
            .iter()
            .filter(|((doc, _), _)| doc == document_id)
            .map(|((doc, name), data)| ObjectMetadata {
                document_id: doc.clone(),
                file_name: name.clone(),
                size: data.len() as u64,
                last_modified: None,
            })
            .collect();
        objects.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        Ok(objects)
    }
}
