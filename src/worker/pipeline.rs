//! The crawl worker's per-item fetch pipeline
//!
//! For each dequeued work order: robots check, retrying fetch, crawl-delay
//! pacing, text and link extraction, blob upload. Steps degrade rather than
//! abort: an upload failure still reports the extracted links and text, and
//! only a robots denial or an exhausted fetch stops the item early.
//!
//! The pipeline is safe to run twice on the same URL: the upload key is
//! derived from the URL, so a duplicate delivery overwrites the same blob.

use crate::config::{UserAgentConfig, WorkerConfig};
use crate::message::WorkOrder;
use crate::robots::RobotsCache;
use crate::store::{content_key, BlobMetadata, BlobStore};
use crate::url::origin_of;
use crate::worker::fetcher::{build_http_client, fetch_with_retry, FetchOutcome, RetryPolicy};
use crate::worker::{extract, WorkerStats};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Total attempts for a blob upload before it counts as a failure
const UPLOAD_ATTEMPTS: u32 = 3;

/// Pause between upload attempts
const UPLOAD_RETRY_PAUSE: Duration = Duration::from_millis(250);

/// Result of running the pipeline on one work order
#[derive(Debug)]
pub enum PipelineOutcome {
    /// Fetch succeeded; extraction and upload were attempted
    Completed {
        url: String,
        blob_key: String,
        uploaded: bool,
        title: String,
        text: String,
        links: Vec<String>,
    },

    /// robots.txt denies this URL; a deliberate skip, not a network failure
    Disallowed { url: String },

    /// Fetch failed after retries (or the URL was unusable)
    FetchFailed { url: String, reason: String },
}

/// One worker's fetch pipeline: HTTP client, robots cache, pacing state
///
/// Single-threaded by design, one URL in flight at a time. The crawl delay
/// applies process-wide and only ever increases: a robots `Crawl-delay`
/// larger than the current value raises it for the rest of the run.
pub struct FetchPipeline {
    client: Client,
    robots: RobotsCache,
    blob_store: Arc<dyn BlobStore>,
    stats: Arc<WorkerStats>,
    retry: RetryPolicy,
    robots_timeout: Duration,
    delay: Duration,
}

impl FetchPipeline {
    pub fn new(
        config: &WorkerConfig,
        user_agent: &UserAgentConfig,
        blob_store: Arc<dyn BlobStore>,
        stats: Arc<WorkerStats>,
    ) -> crate::Result<Self> {
        let client = build_http_client(user_agent, config.fetch_timeout())?;
        Ok(Self {
            client,
            robots: RobotsCache::new(),
            blob_store,
            stats,
            retry: RetryPolicy::from_config(config),
            robots_timeout: config.robots_fetch_timeout(),
            delay: config.crawl_delay(),
        })
    }

    /// The effective crawl delay currently in force
    pub fn current_delay(&self) -> Duration {
        self.delay
    }

    /// Runs the full pipeline for one work order
    pub async fn process(&mut self, order: &WorkOrder) -> PipelineOutcome {
        // Robots check against the URL's origin
        let Some(origin) = origin_of(&order.url) else {
            self.stats.record_failed();
            return PipelineOutcome::FetchFailed {
                url: order.url.clone(),
                reason: "URL has no usable origin".to_string(),
            };
        };

        let entry = self
            .robots
            .get(&self.client, &origin, self.robots_timeout)
            .await;

        if let Some(robots_delay) = entry.crawl_delay() {
            if robots_delay > self.delay {
                tracing::info!(
                    "Raising crawl delay to {:?} per robots.txt for {}",
                    robots_delay,
                    origin
                );
                self.delay = robots_delay;
            }
        }

        if !entry.can_fetch(&order.url) {
            tracing::info!("URL {} disallowed by robots.txt", order.url);
            return PipelineOutcome::Disallowed {
                url: order.url.clone(),
            };
        }

        // Fetch with retry
        let (body, content_type) = match fetch_with_retry(&self.client, &order.url, &self.retry).await
        {
            FetchOutcome::Success {
                body, content_type, ..
            } => (body, content_type),
            FetchOutcome::Failed {
                reason,
                retries_used,
            } => {
                tracing::warn!(
                    "Fetch failed for {} after {} retries: {}",
                    order.url,
                    retries_used,
                    reason
                );
                self.stats.record_failed();
                return PipelineOutcome::FetchFailed {
                    url: order.url.clone(),
                    reason,
                };
            }
        };
        self.stats.record_crawled();

        // Pace the next fetch this worker will issue
        tokio::time::sleep(self.delay).await;

        // Extraction degrades on bad markup instead of failing the item
        let title = extract::extract_title(&body);
        let text = extract::extract_text(&body);
        let links = match Url::parse(&order.url) {
            Ok(base) => extract::extract_links(&body, &base, order.restrict_domain),
            Err(e) => {
                tracing::warn!("Cannot resolve links against {}: {}", order.url, e);
                Vec::new()
            }
        };

        // Upload keyed by the URL hash; failure still reports extraction
        let blob_key = content_key(&order.url);
        let bytes = body.into_bytes();
        let mut uploaded = false;
        for attempt in 0..UPLOAD_ATTEMPTS {
            let metadata = BlobMetadata {
                original_url: order.url.clone(),
            };
            match self
                .blob_store
                .put(&blob_key, bytes.clone(), &content_type, metadata)
                .await
            {
                Ok(()) => {
                    uploaded = true;
                    break;
                }
                Err(e) => {
                    tracing::warn!(
                        "Upload attempt {} failed for {}: {}",
                        attempt + 1,
                        order.url,
                        e
                    );
                    if attempt + 1 < UPLOAD_ATTEMPTS {
                        tokio::time::sleep(UPLOAD_RETRY_PAUSE).await;
                    }
                }
            }
        }
        if uploaded {
            self.stats.record_uploaded();
        } else {
            self.stats.record_failed();
        }

        PipelineOutcome::Completed {
            url: order.url.clone(),
            blob_key,
            uploaded,
            title,
            text,
            links,
        }
    }
}
