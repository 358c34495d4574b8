//! In-memory blob store and search index for tests and the local run mode

use crate::store::{
    BlobMetadata, BlobStore, SearchHit, SearchIndex, StoreResult, StoredBlob,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory key/value byte store
///
/// Data is lost on restart; suitable only for tests and local development.
#[derive(Default)]
pub struct InMemoryBlobStore {
    blobs: RwLock<HashMap<String, StoredBlob>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn blob_count(&self) -> usize {
        self.blobs.read().unwrap().len()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
        metadata: BlobMetadata,
    ) -> StoreResult<()> {
        self.blobs.write().unwrap().insert(
            key.to_string(),
            StoredBlob {
                bytes,
                content_type: content_type.to_string(),
                metadata,
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<StoredBlob>> {
        Ok(self.blobs.read().unwrap().get(key).cloned())
    }

    async fn list(&self) -> StoreResult<Vec<String>> {
        let mut keys: Vec<String> = self.blobs.read().unwrap().keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}

struct IndexedDoc {
    title: String,
    haystack: String,
}

/// In-memory search index: AND-of-terms matching, ranked by occurrence count
#[derive(Default)]
pub struct InMemoryIndex {
    docs: RwLock<HashMap<String, IndexedDoc>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn doc_count(&self) -> usize {
        self.docs.read().unwrap().len()
    }
}

#[async_trait]
impl SearchIndex for InMemoryIndex {
    async fn upsert(&self, url: &str, title: &str, content: &str) -> StoreResult<()> {
        let haystack = format!("{} {}", title, content).to_lowercase();
        self.docs.write().unwrap().insert(
            url.to_string(),
            IndexedDoc {
                title: title.to_string(),
                haystack,
            },
        );
        Ok(())
    }

    async fn query(&self, text: &str) -> StoreResult<Vec<SearchHit>> {
        let terms: Vec<String> = text
            .split_whitespace()
            .map(|t| t.to_lowercase())
            .collect();
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let docs = self.docs.read().unwrap();
        let mut hits: Vec<SearchHit> = docs
            .iter()
            .filter_map(|(url, doc)| {
                let mut score = 0;
                for term in &terms {
                    let count = doc.haystack.matches(term.as_str()).count();
                    if count == 0 {
                        return None;
                    }
                    score += count;
                }
                Some(SearchHit {
                    url: url.clone(),
                    title: doc.title.clone(),
                    score,
                })
            })
            .collect();

        hits.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.url.cmp(&b.url)));
        Ok(hits)
    }
}
