//! Liveness monitor: heartbeat ingest, active/inactive classification, GC
//!
//! Workers push heartbeats; nothing here polls them. A worker is `active`
//! while its most recent heartbeat is at most [`INACTIVE_THRESHOLD`] old, and
//! its record is dropped entirely after [`MAX_AGE`] of silence. Classification
//! runs on a periodic pass, not on message receipt, so a worker that stops
//! heartbeating is still reclassified on time.
//!
//! Liveness math uses the coordinator's receive time rather than the
//! timestamp carried in the message, so sender clock skew cannot flip a
//! classification.

use crate::message::{CrawlerHeartbeat, IndexerHeartbeat};
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Silence after which a worker is classified inactive
pub const INACTIVE_THRESHOLD: Duration = Duration::from_secs(90);

/// Silence after which a worker's record is garbage-collected
pub const MAX_AGE: Duration = Duration::from_secs(300);

/// Worker role, distinguishing the two heartbeat streams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkerRole {
    Crawler,
    Indexer,
}

/// Last known state of one worker
#[derive(Debug, Clone)]
pub struct WorkerRecord {
    pub role: WorkerRole,
    pub last_seen: Instant,
    pub crawled: u64,
    pub uploaded: u64,
    pub failed: u64,
    pub indexed: u64,
    pub active: bool,
}

/// Active/inactive counts for one role
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoleCounts {
    pub active: usize,
    pub inactive: usize,
}

/// The aggregate exposed to the dashboard collaborator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LivenessSnapshot {
    pub crawlers: RoleCounts,
    pub indexers: RoleCounts,
}

/// Time-indexed map of worker heartbeat records
#[derive(Debug, Default)]
pub struct LivenessMonitor {
    workers: HashMap<String, WorkerRecord>,
    snapshot: LivenessSnapshot,
}

impl LivenessMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upserts a crawl worker's record from a received heartbeat
    pub fn observe_crawler(&mut self, heartbeat: &CrawlerHeartbeat, now: Instant) {
        let record = self
            .workers
            .entry(heartbeat.worker_id.clone())
            .or_insert_with(|| WorkerRecord {
                role: WorkerRole::Crawler,
                last_seen: now,
                crawled: 0,
                uploaded: 0,
                failed: 0,
                indexed: 0,
                active: true,
            });
        record.last_seen = now;
        record.active = true;
        record.crawled = heartbeat.crawled;
        record.uploaded = heartbeat.uploaded;
        record.failed = heartbeat.failed;
    }

    /// Upserts an index worker's record from a received heartbeat
    pub fn observe_indexer(&mut self, heartbeat: &IndexerHeartbeat, now: Instant) {
        let record = self
            .workers
            .entry(heartbeat.indexer_id.clone())
            .or_insert_with(|| WorkerRecord {
                role: WorkerRole::Indexer,
                last_seen: now,
                crawled: 0,
                uploaded: 0,
                failed: 0,
                indexed: 0,
                active: true,
            });
        record.last_seen = now;
        record.active = true;
        record.indexed = heartbeat.indexed;
    }

    /// Periodic pass: drop records silent past [`MAX_AGE`], reclassify the
    /// rest, and recompute the per-role aggregate
    pub fn classify(&mut self, now: Instant) -> LivenessSnapshot {
        self.workers
            .retain(|_, record| now.duration_since(record.last_seen) <= MAX_AGE);

        let mut snapshot = LivenessSnapshot::default();
        for record in self.workers.values_mut() {
            record.active = now.duration_since(record.last_seen) <= INACTIVE_THRESHOLD;
            let counts = match record.role {
                WorkerRole::Crawler => &mut snapshot.crawlers,
                WorkerRole::Indexer => &mut snapshot.indexers,
            };
            if record.active {
                counts.active += 1;
            } else {
                counts.inactive += 1;
            }
        }
        self.snapshot = snapshot;
        snapshot
    }

    /// The most recently computed aggregate
    pub fn snapshot(&self) -> LivenessSnapshot {
        self.snapshot
    }

    pub fn worker(&self, id: &str) -> Option<&WorkerRecord> {
        self.workers.get(id)
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crawler_hb(id: &str, crawled: u64) -> CrawlerHeartbeat {
        CrawlerHeartbeat {
            worker_id: id.to_string(),
            timestamp: 0,
            status: "alive".to_string(),
            crawled,
            uploaded: 0,
            failed: 0,
        }
    }

    fn indexer_hb(id: &str, indexed: u64) -> IndexerHeartbeat {
        IndexerHeartbeat {
            indexer_id: id.to_string(),
            timestamp: 0,
            status: "alive".to_string(),
            indexed,
        }
    }

    #[test]
    fn test_new_worker_is_active() {
        let mut monitor = LivenessMonitor::new();
        let now = Instant::now();
        monitor.observe_crawler(&crawler_hb("c1", 1), now);

        let snapshot = monitor.classify(now);
        assert_eq!(snapshot.crawlers, RoleCounts { active: 1, inactive: 0 });
    }

    #[test]
    fn test_worker_within_threshold_stays_active() {
        let mut monitor = LivenessMonitor::new();
        let now = Instant::now();
        monitor.observe_crawler(&crawler_hb("c1", 1), now);

        let snapshot = monitor.classify(now + Duration::from_secs(89));
        assert_eq!(snapshot.crawlers, RoleCounts { active: 1, inactive: 0 });
    }

    #[test]
    fn test_silent_worker_goes_inactive() {
        let mut monitor = LivenessMonitor::new();
        let now = Instant::now();
        monitor.observe_crawler(&crawler_hb("c1", 1), now);

        let snapshot = monitor.classify(now + Duration::from_secs(91));
        assert_eq!(snapshot.crawlers, RoleCounts { active: 0, inactive: 1 });
        assert!(!monitor.worker("c1").unwrap().active);
    }

    #[test]
    fn test_heartbeat_revives_inactive_worker() {
        let mut monitor = LivenessMonitor::new();
        let now = Instant::now();
        monitor.observe_crawler(&crawler_hb("c1", 1), now);
        monitor.classify(now + Duration::from_secs(120));

        let later = now + Duration::from_secs(150);
        monitor.observe_crawler(&crawler_hb("c1", 2), later);
        let snapshot = monitor.classify(later);
        assert_eq!(snapshot.crawlers, RoleCounts { active: 1, inactive: 0 });
    }

    #[test]
    fn test_record_removed_after_max_age() {
        let mut monitor = LivenessMonitor::new();
        let now = Instant::now();
        monitor.observe_crawler(&crawler_hb("c1", 1), now);

        let snapshot = monitor.classify(now + Duration::from_secs(301));
        assert_eq!(monitor.worker_count(), 0);
        assert_eq!(snapshot.crawlers, RoleCounts::default());
    }

    #[test]
    fn test_record_survives_under_max_age() {
        let mut monitor = LivenessMonitor::new();
        let now = Instant::now();
        monitor.observe_crawler(&crawler_hb("c1", 1), now);

        monitor.classify(now + Duration::from_secs(299));
        assert_eq!(monitor.worker_count(), 1);
    }

    #[test]
    fn test_counters_updated_on_each_heartbeat() {
        let mut monitor = LivenessMonitor::new();
        let now = Instant::now();
        monitor.observe_crawler(&crawler_hb("c1", 5), now);
        monitor.observe_crawler(&crawler_hb("c1", 8), now + Duration::from_secs(60));

        let record = monitor.worker("c1").unwrap();
        assert_eq!(record.crawled, 8);
        assert_eq!(monitor.worker_count(), 1);
    }

    #[test]
    fn test_roles_aggregate_independently() {
        let mut monitor = LivenessMonitor::new();
        let now = Instant::now();
        monitor.observe_crawler(&crawler_hb("c1", 1), now);
        monitor.observe_crawler(&crawler_hb("c2", 1), now);
        monitor.observe_indexer(&indexer_hb("i1", 1), now);

        // One crawler goes silent past the threshold
        monitor.observe_crawler(&crawler_hb("c1", 2), now + Duration::from_secs(100));
        let snapshot = monitor.classify(now + Duration::from_secs(120));

        assert_eq!(snapshot.crawlers, RoleCounts { active: 1, inactive: 1 });
        assert_eq!(snapshot.indexers, RoleCounts { active: 0, inactive: 1 });
    }

    #[test]
    fn test_indexer_counter_tracked() {
        let mut monitor = LivenessMonitor::new();
        let now = Instant::now();
        monitor.observe_indexer(&indexer_hb("i1", 42), now);

        assert_eq!(monitor.worker("i1").unwrap().indexed, 42);
        assert_eq!(monitor.worker("i1").unwrap().role, WorkerRole::Indexer);
    }
}
