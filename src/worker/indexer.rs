//! Index worker: ingests stored pages into the search index
//!
//! Periodically lists the blob store, extracts title and visible text from
//! blobs it has not yet ingested, and upserts each document into the search
//! index keyed by the page's original URL. Upserts are idempotent, so a
//! re-ingest after a restart is harmless.

use crate::config::Config;
use crate::message::IndexerHeartbeat;
use crate::queue::MessageQueue;
use crate::store::{BlobStore, SearchIndex};
use crate::worker::extract::{extract_text, extract_title};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Sleep after a transient store/index error before the next pass
const ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Worker that feeds the search index from the blob store
pub struct IndexWorker {
    id: String,
    config: Arc<Config>,
    blob_store: Arc<dyn BlobStore>,
    index: Arc<dyn SearchIndex>,
    heartbeat_queue: Arc<dyn MessageQueue>,
    indexed: Arc<AtomicU64>,
    ingested: HashSet<String>,
}

impl IndexWorker {
    pub fn new(
        id: &str,
        config: Arc<Config>,
        blob_store: Arc<dyn BlobStore>,
        index: Arc<dyn SearchIndex>,
        heartbeat_queue: Arc<dyn MessageQueue>,
    ) -> Self {
        Self {
            id: id.to_string(),
            config,
            blob_store,
            index,
            heartbeat_queue,
            indexed: Arc::new(AtomicU64::new(0)),
            ingested: HashSet::new(),
        }
    }

    pub fn indexed_count(&self) -> u64 {
        self.indexed.load(Ordering::Relaxed)
    }

    /// Runs ingest passes until shutdown is signaled
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!("Index worker {} starting", self.id);

        let heartbeats = tokio::spawn(heartbeat_loop(
            self.heartbeat_queue.clone(),
            self.id.clone(),
            self.indexed.clone(),
            self.config.worker.heartbeat_interval(),
            shutdown.clone(),
        ));

        let mut ticker = tokio::time::interval(self.config.worker.index_interval());
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = ticker.tick() => {
                    if let Err(e) = self.ingest_once().await {
                        tracing::warn!("Index worker {} ingest failed: {}", self.id, e);
                        tokio::time::sleep(ERROR_BACKOFF).await;
                    }
                }
            }
        }

        let _ = heartbeats.await;
        tracing::info!("Index worker {} stopped", self.id);
    }

    /// One ingest pass over blobs not yet indexed
    ///
    /// A per-document upsert failure leaves that key un-ingested so the next
    /// pass retries it; list and get failures abort the pass.
    pub async fn ingest_once(&mut self) -> crate::Result<()> {
        let keys = self.blob_store.list().await?;
        let mut newly_indexed = 0u64;

        for key in keys {
            if self.ingested.contains(&key) {
                continue;
            }
            let Some(blob) = self.blob_store.get(&key).await? else {
                continue;
            };

            let html = String::from_utf8_lossy(&blob.bytes);
            let url = if blob.metadata.original_url.is_empty() {
                key.clone()
            } else {
                blob.metadata.original_url.clone()
            };
            let title = extract_title(&html);
            let content = extract_text(&html);

            match self.index.upsert(&url, &title, &content).await {
                Ok(()) => {
                    self.ingested.insert(key);
                    self.indexed.fetch_add(1, Ordering::Relaxed);
                    newly_indexed += 1;
                    tracing::debug!("Indexed {}", url);
                }
                Err(e) => tracing::warn!("Index upsert failed for {}: {}", url, e),
            }
        }

        if newly_indexed > 0 {
            tracing::info!(
                "Index worker {} ingested {} new pages ({} total)",
                self.id,
                newly_indexed,
                self.indexed_count()
            );
        }
        Ok(())
    }
}

/// Emits an indexer heartbeat every interval tick and once more on shutdown
async fn heartbeat_loop(
    queue: Arc<dyn MessageQueue>,
    indexer_id: String,
    indexed: Arc<AtomicU64>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = ticker.tick() => send_heartbeat(&queue, &indexer_id, &indexed).await,
        }
    }

    send_heartbeat(&queue, &indexer_id, &indexed).await;
}

async fn send_heartbeat(queue: &Arc<dyn MessageQueue>, indexer_id: &str, indexed: &AtomicU64) {
    let heartbeat = IndexerHeartbeat::new(indexer_id, indexed.load(Ordering::Relaxed));
    match serde_json::to_string(&heartbeat) {
        Ok(body) => {
            if let Err(e) = queue.send(&body).await {
                tracing::warn!("Heartbeat send failed for {}: {}", indexer_id, e);
            }
        }
        Err(e) => tracing::warn!("Heartbeat encode failed for {}: {}", indexer_id, e),
    }
}
