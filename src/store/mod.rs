//! Blob store and search index collaborator seams
//!
//! The content store is a key/value byte store with per-object metadata; the
//! search index is a document upsert + query service. Both are external
//! collaborators consumed through traits, with in-memory implementations for
//! tests and the local run mode.
//!
//! Blob keys are derived from the normalized URL via [`content_key`], so a
//! duplicate delivery of the same work item overwrites its own earlier upload
//! instead of creating a second object; this is what makes the fetch
//! pipeline safe under at-least-once delivery.

mod memory;

pub use memory::{InMemoryBlobStore, InMemoryIndex};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Errors that can occur during blob store or index operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Blob put failed for {key}: {reason}")]
    Put { key: String, reason: String },

    #[error("Blob get failed for {key}: {reason}")]
    Get { key: String, reason: String },

    #[error("Blob list failed: {0}")]
    List(String),

    #[error("Index operation failed: {0}")]
    Index(String),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Metadata attached to a stored blob
///
/// Retaining the original URL here lets the indexer recover the page URL from
/// the object itself, without a separate URL-to-key mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobMetadata {
    pub original_url: String,
}

/// A stored blob with its metadata
#[derive(Debug, Clone)]
pub struct StoredBlob {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub metadata: BlobMetadata,
}

/// Key/value byte store with metadata
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stores bytes under `key`, replacing any existing object
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
        metadata: BlobMetadata,
    ) -> StoreResult<()>;

    /// Fetches a blob, or `None` when the key does not exist
    async fn get(&self, key: &str) -> StoreResult<Option<StoredBlob>>;

    /// Lists all stored keys
    async fn list(&self) -> StoreResult<Vec<String>>;
}

/// A ranked search result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub url: String,
    pub title: String,
    pub score: usize,
}

/// Document upsert + boolean query service
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Inserts or replaces the document for `url`
    async fn upsert(&self, url: &str, title: &str, content: &str) -> StoreResult<()>;

    /// Returns documents matching every term in `text`, best match first
    async fn query(&self, text: &str) -> StoreResult<Vec<SearchHit>>;
}

/// Derives the blob key for a page from its normalized URL
///
/// Hex SHA-256 of the URL string: stable across duplicate task executions and
/// collision-safe across distinct URLs.
pub fn content_key(normalized_url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalized_url.as_bytes());
    hex::encode(hasher.finalize())
}
