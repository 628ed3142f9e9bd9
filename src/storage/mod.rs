//! Document byte storage
//!
//! Documents are addressed by `(document_id, file_name)`. The filesystem
//! store backs the server; the in-memory store backs tests.

mod fs;
mod memory;
mod types;

use async_trait::async_trait;

pub use fs::FsDocumentStore;
pub use memory::InMemoryDocumentStore;
pub use types::*;

/// Source of document bytes
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, document_id: &str, file_name: &str) -> StorageResult<StorageObject>;

    async fn put(
        &self,
        document_id: &str,
        file_name: &str,
        data: Vec<u8>,
    ) -> StorageResult<ObjectMetadata>;

    async fn list(&self, document_id: &str) -> StorageResult<Vec<ObjectMetadata>>;
}
