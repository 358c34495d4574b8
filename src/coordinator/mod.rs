//! Coordinator: URL intake, work dispatch, timeout sweep, liveness tracking
//!
//! A single coordinator owns the frontier dedup set, the task tracker, and
//! the liveness monitor. Its periodic activities (the timeout sweep, the two
//! heartbeat drains, the liveness classification pass, and the stats
//! reporter) run as independent interval loops sharing those maps behind
//! mutexes. Lock scopes are short and never held across an await. A
//! transient error in one loop logs, backs off, and leaves the other loops
//! running; only the shutdown signal stops them.

mod frontier;
mod liveness;
mod tracker;

pub use frontier::Frontier;
pub use liveness::{
    LivenessMonitor, LivenessSnapshot, RoleCounts, WorkerRecord, WorkerRole, INACTIVE_THRESHOLD,
    MAX_AGE,
};
pub use tracker::{TaskStatus, TaskTracker, TrackerCounts, WorkItem};

use crate::config::Config;
use crate::message::{CrawlerHeartbeat, IndexerHeartbeat, WorkOrder};
use crate::queue::MessageQueue;
use crate::url::normalize;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::watch;

/// How long a heartbeat drain waits on an empty queue before re-checking
/// for shutdown
const HEARTBEAT_POLL_WAIT: Duration = Duration::from_secs(2);

/// Batch size for heartbeat drains
const HEARTBEAT_BATCH: usize = 10;

/// Read-only view of coordinator state for the dashboard collaborator
#[derive(Debug, Clone, Copy)]
pub struct SystemSnapshot {
    pub liveness: LivenessSnapshot,
    pub tasks: TrackerCounts,
    pub queue_ready: usize,
    pub queue_in_flight: usize,
}

/// The coordinator process: owns all task lifecycle and liveness state
#[derive(Clone)]
pub struct Coordinator {
    config: Arc<Config>,
    work_queue: Arc<dyn MessageQueue>,
    crawler_heartbeats: Arc<dyn MessageQueue>,
    indexer_heartbeats: Arc<dyn MessageQueue>,
    frontier: Arc<Mutex<Frontier>>,
    tracker: Arc<Mutex<TaskTracker>>,
    monitor: Arc<Mutex<LivenessMonitor>>,
}

impl Coordinator {
    pub fn new(
        config: Config,
        work_queue: Arc<dyn MessageQueue>,
        crawler_heartbeats: Arc<dyn MessageQueue>,
        indexer_heartbeats: Arc<dyn MessageQueue>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            work_queue,
            crawler_heartbeats,
            indexer_heartbeats,
            frontier: Arc::new(Mutex::new(Frontier::new())),
            tracker: Arc::new(Mutex::new(TaskTracker::new())),
            monitor: Arc::new(Mutex::new(LivenessMonitor::new())),
        }
    }

    /// Submits seed URLs for crawling
    ///
    /// Each URL is normalized and offered to the frontier; duplicates are
    /// silently dropped. Newly accepted URLs are sent to the work queue and
    /// recorded as `Queued`. Returns the number of URLs accepted and
    /// enqueued.
    pub async fn submit(&self, urls: &[String], depth_limit: u32, restrict_domain: bool) -> usize {
        self.submit_at_depth(urls, 0, depth_limit, restrict_domain)
            .await
    }

    /// Shared intake path for seeds (depth 0) and discovered links
    ///
    /// A queue send failure leaves the URL in the frontier without a tracked
    /// item: it was never enqueued, yet a resubmission will be dropped as a
    /// duplicate. Deliberately left as-is rather than rolling back the
    /// frontier insert or retrying the send.
    async fn submit_at_depth(
        &self,
        urls: &[String],
        depth: u32,
        depth_limit: u32,
        restrict_domain: bool,
    ) -> usize {
        let mut accepted = 0;

        for raw in urls {
            let normalized = normalize(raw);

            let is_new = self.frontier.lock().unwrap().accept(&normalized);
            if !is_new {
                tracing::debug!("Dropping duplicate URL: {}", normalized);
                continue;
            }

            let order = WorkOrder {
                url: normalized.clone(),
                depth,
                depth_limit,
                restrict_domain,
            };
            let body = match serde_json::to_string(&order) {
                Ok(body) => body,
                Err(e) => {
                    tracing::warn!("Failed to encode work order for {}: {}", normalized, e);
                    continue;
                }
            };

            match self.work_queue.send(&body).await {
                Ok(()) => {
                    self.tracker
                        .lock()
                        .unwrap()
                        .record_queued(&order, Instant::now());
                    accepted += 1;
                    tracing::info!("Accepted URL for crawling: {}", normalized);
                }
                Err(e) => {
                    tracing::warn!("Failed to enqueue {}: {}", normalized, e);
                }
            }
        }

        accepted
    }

    /// Worker start report for a task
    pub fn report_started(&self, normalized_url: &str) {
        self.tracker.lock().unwrap().mark_in_flight(normalized_url);
    }

    /// Terminal success report for a task
    pub fn report_done(&self, normalized_url: &str) {
        self.tracker.lock().unwrap().mark_done(normalized_url);
    }

    /// Explicit failure report for a task: counted, not requeued
    pub fn report_failure(&self, normalized_url: &str) {
        self.tracker.lock().unwrap().record_failure(normalized_url);
    }

    /// Current aggregate state for the dashboard collaborator
    pub async fn snapshot(&self) -> crate::Result<SystemSnapshot> {
        let (queue_ready, queue_in_flight) = self.work_queue.depth().await?;
        let tasks = self.tracker.lock().unwrap().counts();
        let liveness = self.monitor.lock().unwrap().snapshot();
        Ok(SystemSnapshot {
            liveness,
            tasks,
            queue_ready,
            queue_in_flight,
        })
    }

    /// Runs all periodic coordinator activities until shutdown is signaled
    pub async fn run(&self, shutdown: watch::Receiver<bool>) {
        tracing::info!(
            "Coordinator starting (task timeout {}s, sweep every {}s)",
            self.config.coordinator.task_timeout_secs,
            self.config.coordinator.sweep_interval_secs
        );

        let handles = vec![
            tokio::spawn(self.clone().sweep_loop(shutdown.clone())),
            tokio::spawn(self.clone().crawler_drain_loop(shutdown.clone())),
            tokio::spawn(self.clone().indexer_drain_loop(shutdown.clone())),
            tokio::spawn(self.clone().classify_loop(shutdown.clone())),
            tokio::spawn(self.clone().stats_loop(shutdown)),
        ];

        for handle in handles {
            let _ = handle.await;
        }
        tracing::info!("Coordinator stopped");
    }

    /// One timeout sweep: requeue every stale item
    ///
    /// Items whose resend fails stay `TimedOut` and are retried on the next
    /// sweep.
    pub async fn sweep_once(&self) -> crate::Result<()> {
        let due = {
            let mut tracker = self.tracker.lock().unwrap();
            tracker.begin_sweep(self.config.coordinator.task_timeout(), Instant::now())
        };

        if due.is_empty() {
            return Ok(());
        }
        tracing::info!("Requeueing {} timed-out tasks", due.len());

        for order in due {
            let body = serde_json::to_string(&order)?;
            match self.work_queue.send(&body).await {
                Ok(()) => {
                    self.tracker
                        .lock()
                        .unwrap()
                        .confirm_requeued(&order.url, Instant::now());
                }
                Err(e) => {
                    tracing::warn!("Failed to requeue {}: {}", order.url, e);
                }
            }
        }
        Ok(())
    }

    /// One crawler heartbeat drain pass
    ///
    /// Messages are acknowledged whether or not they parse: under
    /// at-least-once delivery, losing one malformed heartbeat is harmless,
    /// while leaving it undeleted would redeliver it forever.
    pub async fn drain_crawler_heartbeats_once(&self) -> crate::Result<()> {
        let messages = self
            .crawler_heartbeats
            .receive(HEARTBEAT_BATCH, HEARTBEAT_POLL_WAIT)
            .await?;

        for msg in messages {
            match serde_json::from_str::<CrawlerHeartbeat>(&msg.body) {
                Ok(heartbeat) => {
                    self.monitor
                        .lock()
                        .unwrap()
                        .observe_crawler(&heartbeat, Instant::now());
                }
                Err(e) => tracing::warn!("Discarding malformed crawler heartbeat: {}", e),
            }
            if let Err(e) = self.crawler_heartbeats.delete(&msg.receipt).await {
                tracing::warn!("Failed to delete crawler heartbeat: {}", e);
            }
        }
        Ok(())
    }

    /// One indexer heartbeat drain pass
    pub async fn drain_indexer_heartbeats_once(&self) -> crate::Result<()> {
        let messages = self
            .indexer_heartbeats
            .receive(HEARTBEAT_BATCH, HEARTBEAT_POLL_WAIT)
            .await?;

        for msg in messages {
            match serde_json::from_str::<IndexerHeartbeat>(&msg.body) {
                Ok(heartbeat) => {
                    self.monitor
                        .lock()
                        .unwrap()
                        .observe_indexer(&heartbeat, Instant::now());
                }
                Err(e) => tracing::warn!("Discarding malformed indexer heartbeat: {}", e),
            }
            if let Err(e) = self.indexer_heartbeats.delete(&msg.receipt).await {
                tracing::warn!("Failed to delete indexer heartbeat: {}", e);
            }
        }
        Ok(())
    }

    /// One liveness classification pass
    pub fn classify_once(&self) -> LivenessSnapshot {
        self.monitor.lock().unwrap().classify(Instant::now())
    }

    async fn sweep_loop(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.config.coordinator.sweep_interval());
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = ticker.tick() => {
                    if let Err(e) = self.sweep_once().await {
                        tracing::warn!("Timeout sweep failed: {}", e);
                        self.error_backoff().await;
                    }
                }
            }
        }
    }

    async fn crawler_drain_loop(self, mut shutdown: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                result = self.drain_crawler_heartbeats_once() => {
                    if let Err(e) = result {
                        tracing::warn!("Crawler heartbeat drain failed: {}", e);
                        self.error_backoff().await;
                    }
                }
            }
        }
    }

    async fn indexer_drain_loop(self, mut shutdown: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                result = self.drain_indexer_heartbeats_once() => {
                    if let Err(e) = result {
                        tracing::warn!("Indexer heartbeat drain failed: {}", e);
                        self.error_backoff().await;
                    }
                }
            }
        }
    }

    async fn classify_loop(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.config.coordinator.liveness_interval());
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = ticker.tick() => {
                    let snapshot = self.classify_once();
                    tracing::debug!(
                        "Liveness: crawlers {}/{} active, indexers {}/{} active",
                        snapshot.crawlers.active,
                        snapshot.crawlers.active + snapshot.crawlers.inactive,
                        snapshot.indexers.active,
                        snapshot.indexers.active + snapshot.indexers.inactive
                    );
                }
            }
        }
    }

    async fn stats_loop(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.config.coordinator.stats_interval());
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = ticker.tick() => {
                    match self.snapshot().await {
                        Ok(snapshot) => tracing::info!(
                            "Tasks: {} total, {} queued, {} in flight, {} done, {} requeued, {} failed; queue depth {}+{}",
                            snapshot.tasks.total,
                            snapshot.tasks.queued,
                            snapshot.tasks.in_flight,
                            snapshot.tasks.done,
                            snapshot.tasks.requeued,
                            snapshot.tasks.failed,
                            snapshot.queue_ready,
                            snapshot.queue_in_flight,
                        ),
                        Err(e) => {
                            tracing::warn!("Stats report failed: {}", e);
                            self.error_backoff().await;
                        }
                    }
                }
            }
        }
    }

    async fn error_backoff(&self) {
        tokio::time::sleep(self.config.coordinator.error_backoff()).await;
    }
}

impl crate::worker::ReportSink for Coordinator {
    fn task_started(&self, url: &str) {
        self.report_started(url);
    }

    fn task_done(&self, url: &str) {
        self.report_done(url);
    }

    fn task_failed(&self, url: &str) {
        self.report_failure(url);
    }

    /// Feeds extracted links back into the frontier one level deeper than
    /// their parent, unless that would exceed the parent's depth limit.
    /// Dispatched on a task so a worker's report never blocks on the queue.
    fn links_discovered(&self, parent: &WorkOrder, links: &[String]) {
        let next_depth = parent.depth + 1;
        if next_depth > parent.depth_limit || links.is_empty() {
            return;
        }

        let coordinator = self.clone();
        let links = links.to_vec();
        let depth_limit = parent.depth_limit;
        let restrict_domain = parent.restrict_domain;
        tokio::spawn(async move {
            let accepted = coordinator
                .submit_at_depth(&links, next_depth, depth_limit, restrict_domain)
                .await;
            if accepted > 0 {
                tracing::debug!("Accepted {} discovered links at depth {}", accepted, next_depth);
            }
        });
    }
}
