//! Wire types for queue message bodies
//!
//! All queue traffic is JSON text. The heartbeat shapes (including the
//! differing id field names for crawlers and indexers) are part of the
//! protocol consumed by the external dashboard and must not change.

use serde::{Deserialize, Serialize};

/// One URL's unit of crawl work, as carried on the work queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkOrder {
    pub url: String,
    pub depth: u32,
    pub depth_limit: u32,
    pub restrict_domain: bool,
}

/// Periodic liveness + counters report from a crawl worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlerHeartbeat {
    pub worker_id: String,
    /// Sender-side unix timestamp (seconds), informational only: liveness
    /// classification uses the coordinator's receive time
    pub timestamp: i64,
    pub status: String,
    pub crawled: u64,
    pub uploaded: u64,
    pub failed: u64,
}

/// Periodic liveness + counters report from an index worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexerHeartbeat {
    pub indexer_id: String,
    pub timestamp: i64,
    pub status: String,
    pub indexed: u64,
}

impl CrawlerHeartbeat {
    pub fn new(worker_id: &str, crawled: u64, uploaded: u64, failed: u64) -> Self {
        Self {
            worker_id: worker_id.to_string(),
            timestamp: chrono::Utc::now().timestamp(),
            status: "alive".to_string(),
            crawled,
            uploaded,
            failed,
        }
    }
}

impl IndexerHeartbeat {
    pub fn new(indexer_id: &str, indexed: u64) -> Self {
        Self {
            indexer_id: indexer_id.to_string(),
            timestamp: chrono::Utc::now().timestamp(),
            status: "alive".to_string(),
            indexed,
        }
    }
}
