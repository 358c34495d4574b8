//! Crawl worker: queue consumption, fetch pipeline, heartbeats
//!
//! Each worker process is single-threaded through its own pipeline, one URL
//! in flight at a time, and coordinates with its peers only through the
//! work queue's at-least-once delivery contract. Horizontal scale-out means
//! running more workers, not widening one.

mod extract;
mod fetcher;
mod indexer;
mod pipeline;

pub use extract::{extract_links, extract_text, extract_title};
pub use fetcher::{build_http_client, fetch_with_retry, FetchOutcome, RetryPolicy};
pub use indexer::IndexWorker;
pub use pipeline::{FetchPipeline, PipelineOutcome};

use crate::config::Config;
use crate::message::{CrawlerHeartbeat, WorkOrder};
use crate::queue::{MessageQueue, ReceivedMessage};
use crate::store::BlobStore;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// How long a worker's receive waits on an empty queue before re-checking
/// for shutdown
const WORK_POLL_WAIT: Duration = Duration::from_secs(2);

/// Sleep after a transient queue error before retrying
const ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Cumulative per-worker counters, shared between the pipeline and the
/// heartbeat task
#[derive(Debug, Default)]
pub struct WorkerStats {
    crawled: AtomicU64,
    uploaded: AtomicU64,
    failed: AtomicU64,
}

impl WorkerStats {
    pub fn record_crawled(&self) {
        self.crawled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_uploaded(&self) {
        self.uploaded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn crawled(&self) -> u64 {
        self.crawled.load(Ordering::Relaxed)
    }

    pub fn uploaded(&self) -> u64 {
        self.uploaded.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}

/// Sink for a worker's task reports
///
/// The transport for reports is deployment-specific; in the local run mode
/// the coordinator implements this directly.
pub trait ReportSink: Send + Sync {
    fn task_started(&self, url: &str);
    fn task_done(&self, url: &str);
    fn task_failed(&self, url: &str);
    /// Links extracted from a completed page, for frontier feedback
    fn links_discovered(&self, parent: &WorkOrder, links: &[String]);
}

/// A crawl worker: consumes work orders, runs the fetch pipeline, reports
/// outcomes, and emits heartbeats
pub struct CrawlWorker {
    id: String,
    config: Arc<Config>,
    work_queue: Arc<dyn MessageQueue>,
    heartbeat_queue: Arc<dyn MessageQueue>,
    stats: Arc<WorkerStats>,
    pipeline: FetchPipeline,
    reports: Option<Arc<dyn ReportSink>>,
}

impl CrawlWorker {
    pub fn new(
        id: &str,
        config: Arc<Config>,
        work_queue: Arc<dyn MessageQueue>,
        heartbeat_queue: Arc<dyn MessageQueue>,
        blob_store: Arc<dyn BlobStore>,
        reports: Option<Arc<dyn ReportSink>>,
    ) -> crate::Result<Self> {
        let stats = Arc::new(WorkerStats::default());
        let pipeline = FetchPipeline::new(
            &config.worker,
            &config.user_agent,
            blob_store,
            stats.clone(),
        )?;
        Ok(Self {
            id: id.to_string(),
            config,
            work_queue,
            heartbeat_queue,
            stats,
            pipeline,
            reports,
        })
    }

    pub fn stats(&self) -> Arc<WorkerStats> {
        self.stats.clone()
    }

    /// Runs until shutdown is signaled
    ///
    /// On shutdown the worker finishes its in-flight item (the pipeline call
    /// is never cancelled mid-item), and the heartbeat task sends one final
    /// report before exiting.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!("Crawl worker {} starting", self.id);

        let heartbeats = tokio::spawn(heartbeat_loop(
            self.heartbeat_queue.clone(),
            self.id.clone(),
            self.stats.clone(),
            self.config.worker.heartbeat_interval(),
            shutdown.clone(),
        ));

        let work_queue = self.work_queue.clone();
        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                _ = shutdown.changed() => break,
                result = work_queue.receive(1, WORK_POLL_WAIT) => match result {
                    Ok(messages) => {
                        for msg in messages {
                            self.handle(msg).await;
                        }
                    }
                    Err(e) => {
                        tracing::warn!("Worker {} receive failed: {}", self.id, e);
                        tokio::time::sleep(ERROR_BACKOFF).await;
                    }
                },
            }
        }

        let _ = heartbeats.await;
        tracing::info!("Crawl worker {} stopped", self.id);
    }

    /// Processes one delivery end to end
    ///
    /// The message is deleted only after the pipeline reaches a definitive
    /// outcome, never while a retry is still pending. An unparseable body is
    /// deleted immediately; redelivering it cannot help.
    async fn handle(&mut self, msg: ReceivedMessage) {
        let order = match serde_json::from_str::<WorkOrder>(&msg.body) {
            Ok(order) => order,
            Err(e) => {
                tracing::warn!("Worker {} discarding malformed work order: {}", self.id, e);
                if let Err(e) = self.work_queue.delete(&msg.receipt).await {
                    tracing::warn!("Worker {} failed to delete message: {}", self.id, e);
                }
                return;
            }
        };

        tracing::info!("Worker {} processing {}", self.id, order.url);
        if let Some(reports) = &self.reports {
            reports.task_started(&order.url);
        }

        let outcome = self.pipeline.process(&order).await;

        match &outcome {
            PipelineOutcome::Completed {
                url,
                links,
                uploaded,
                ..
            } => {
                tracing::info!(
                    "Worker {} completed {} ({} links, uploaded: {})",
                    self.id,
                    url,
                    links.len(),
                    uploaded
                );
                if let Some(reports) = &self.reports {
                    reports.links_discovered(&order, links);
                    reports.task_done(url);
                }
            }
            PipelineOutcome::Disallowed { url } => {
                if let Some(reports) = &self.reports {
                    reports.task_failed(url);
                }
            }
            PipelineOutcome::FetchFailed { url, reason } => {
                tracing::warn!("Worker {} failed {}: {}", self.id, url, reason);
                if let Some(reports) = &self.reports {
                    reports.task_failed(url);
                }
            }
        }

        if let Err(e) = self.work_queue.delete(&msg.receipt).await {
            tracing::warn!("Worker {} failed to delete message: {}", self.id, e);
        }
    }
}

/// Emits a heartbeat every interval tick and once more on shutdown
async fn heartbeat_loop(
    queue: Arc<dyn MessageQueue>,
    worker_id: String,
    stats: Arc<WorkerStats>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = ticker.tick() => send_heartbeat(&queue, &worker_id, &stats).await,
        }
    }

    // Final heartbeat so the coordinator sees the closing counters
    send_heartbeat(&queue, &worker_id, &stats).await;
}

async fn send_heartbeat(queue: &Arc<dyn MessageQueue>, worker_id: &str, stats: &WorkerStats) {
    let heartbeat =
        CrawlerHeartbeat::new(worker_id, stats.crawled(), stats.uploaded(), stats.failed());
    match serde_json::to_string(&heartbeat) {
        Ok(body) => {
            if let Err(e) = queue.send(&body).await {
                tracing::warn!("Heartbeat send failed for {}: {}", worker_id, e);
            }
        }
        Err(e) => tracing::warn!("Heartbeat encode failed for {}: {}", worker_id, e),
    }
}
