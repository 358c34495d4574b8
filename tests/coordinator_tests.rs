//! End-to-end tests: coordinator, crawl worker, and index worker wired over
//! in-memory collaborators, fetching from mock HTTP servers.

use crawl_swarm::config::Config;
use crawl_swarm::coordinator::Coordinator;
use crawl_swarm::message::WorkOrder;
use crawl_swarm::queue::{InMemoryQueue, MessageQueue};
use crawl_swarm::store::{content_key, BlobStore, InMemoryBlobStore, InMemoryIndex, SearchIndex};
use crawl_swarm::url::normalize;
use crawl_swarm::worker::{CrawlWorker, IndexWorker, ReportSink};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Config tuned for tests: no pacing delay, fast ingest
fn test_config() -> Config {
    let mut config = Config::default();
    config.worker.crawl_delay_ms = 0;
    config.worker.retry_backoff_base_ms = 10;
    config.worker.index_interval_secs = 1;
    config
}

struct Fleet {
    work_queue: Arc<dyn MessageQueue>,
    crawler_heartbeats: Arc<dyn MessageQueue>,
    indexer_heartbeats: Arc<dyn MessageQueue>,
    blob_store: Arc<InMemoryBlobStore>,
    index: Arc<InMemoryIndex>,
    coordinator: Coordinator,
}

fn make_fleet(config: &Config) -> Fleet {
    let work_queue: Arc<dyn MessageQueue> = Arc::new(InMemoryQueue::new());
    let crawler_heartbeats: Arc<dyn MessageQueue> = Arc::new(InMemoryQueue::new());
    let indexer_heartbeats: Arc<dyn MessageQueue> = Arc::new(InMemoryQueue::new());
    let coordinator = Coordinator::new(
        config.clone(),
        work_queue.clone(),
        crawler_heartbeats.clone(),
        indexer_heartbeats.clone(),
    );
    Fleet {
        work_queue,
        crawler_heartbeats,
        indexer_heartbeats,
        blob_store: Arc::new(InMemoryBlobStore::new()),
        index: Arc::new(InMemoryIndex::new()),
        coordinator,
    }
}

async fn wait_for<F: Fn() -> bool>(condition: F, what: &str) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !condition() {
        assert!(Instant::now() < deadline, "timed out waiting for {}", what);
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

async fn mount_site(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nAllow: /"))
        .mount(server)
        .await;

    let page_a = r#"<html><head><title>Page A</title></head><body>
        <h1>Alpha heading</h1>
        <p>Seed page content.</p>
        <a href="/b">local link</a>
        <a href="http://other.invalid/c">cross-domain link</a>
    </body></html>"#;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(page_a)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;

    let page_b = r#"<html><head><title>Page B</title></head><body>
        <p>Second page, no further links.</p>
    </body></html>"#;
    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(page_b)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_end_to_end_crawl_index_and_liveness() {
    let server = MockServer::start().await;
    mount_site(&server).await;

    let config = test_config();
    let fleet = make_fleet(&config);
    let shared_config = Arc::new(config);

    let seed = format!("{}/a", server.uri());
    let accepted = fleet.coordinator.submit(&[seed.clone()], 1, true).await;
    assert_eq!(accepted, 1);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let reports: Arc<dyn ReportSink> = Arc::new(fleet.coordinator.clone());

    let worker = CrawlWorker::new(
        "crawler-1",
        shared_config.clone(),
        fleet.work_queue.clone(),
        fleet.crawler_heartbeats.clone(),
        fleet.blob_store.clone(),
        Some(reports),
    )
    .unwrap();
    let worker_handle = tokio::spawn(worker.run(shutdown_rx.clone()));

    let index_worker = IndexWorker::new(
        "indexer-1",
        shared_config.clone(),
        fleet.blob_store.clone(),
        fleet.index.clone(),
        fleet.indexer_heartbeats.clone(),
    );
    let indexer_handle = tokio::spawn(index_worker.run(shutdown_rx.clone()));

    // Seed page and its discovered local link both crawled and indexed;
    // the cross-domain link is dropped by restrict_domain
    let blob_store = fleet.blob_store.clone();
    wait_for(move || blob_store.blob_count() == 2, "two pages stored").await;
    let index = fleet.index.clone();
    wait_for(move || index.doc_count() == 2, "two pages indexed").await;

    shutdown_tx.send(true).unwrap();
    worker_handle.await.unwrap();
    indexer_handle.await.unwrap();

    // Both tasks reached Done; nothing else was ever tracked
    let url_a = normalize(&seed);
    let url_b = normalize(&format!("{}/b", server.uri()));
    let snapshot = fleet.coordinator.snapshot().await.unwrap();
    assert_eq!(snapshot.tasks.total, 2);
    assert_eq!(snapshot.tasks.done, 2);
    assert_eq!(snapshot.tasks.requeued, 0);
    assert_eq!(snapshot.queue_ready, 0);
    assert_eq!(snapshot.queue_in_flight, 0);

    // Stored blobs are keyed by the normalized URL hash
    assert!(fleet
        .blob_store
        .get(&content_key(&url_a))
        .await
        .unwrap()
        .is_some());
    assert!(fleet
        .blob_store
        .get(&content_key(&url_b))
        .await
        .unwrap()
        .is_some());

    // Heartbeats from both roles make their workers active
    fleet.coordinator.drain_crawler_heartbeats_once().await.unwrap();
    fleet.coordinator.drain_indexer_heartbeats_once().await.unwrap();
    let liveness = fleet.coordinator.classify_once();
    assert_eq!(liveness.crawlers.active, 1);
    assert_eq!(liveness.crawlers.inactive, 0);
    assert_eq!(liveness.indexers.active, 1);

    // The indexed content is queryable by page text
    let hits = fleet.index.query("alpha heading").await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].url, url_a);
    assert_eq!(hits[0].title, "Page A");
}

#[tokio::test]
async fn test_duplicate_delivery_is_idempotent() {
    let server = MockServer::start().await;
    mount_site(&server).await;

    let config = test_config();
    let fleet = make_fleet(&config);

    // Simulate the queue delivering the same order twice
    let order = WorkOrder {
        url: normalize(&format!("{}/b", server.uri())),
        depth: 0,
        depth_limit: 0,
        restrict_domain: true,
    };
    let body = serde_json::to_string(&order).unwrap();
    fleet.work_queue.send(&body).await.unwrap();
    fleet.work_queue.send(&body).await.unwrap();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker = CrawlWorker::new(
        "crawler-1",
        Arc::new(config),
        fleet.work_queue.clone(),
        fleet.crawler_heartbeats.clone(),
        fleet.blob_store.clone(),
        None,
    )
    .unwrap();
    let stats = worker.stats();
    let handle = tokio::spawn(worker.run(shutdown_rx));

    let worker_stats = stats.clone();
    wait_for(move || worker_stats.crawled() == 2, "both deliveries processed").await;

    shutdown_tx.send(true).unwrap();
    handle.await.unwrap();

    // Same URL, same key: one blob, overwritten in place
    assert_eq!(fleet.blob_store.blob_count(), 1);
    assert_eq!(fleet.work_queue.depth().await.unwrap(), (0, 0));
}

#[tokio::test]
async fn test_malformed_work_order_is_discarded() {
    let config = test_config();
    let fleet = make_fleet(&config);

    fleet.work_queue.send("not a work order").await.unwrap();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker = CrawlWorker::new(
        "crawler-1",
        Arc::new(config),
        fleet.work_queue.clone(),
        fleet.crawler_heartbeats.clone(),
        fleet.blob_store.clone(),
        None,
    )
    .unwrap();
    let handle = tokio::spawn(worker.run(shutdown_rx));

    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        if fleet.work_queue.depth().await.unwrap() == (0, 0) {
            break;
        }
        assert!(Instant::now() < deadline, "timed out waiting for poison delete");
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    shutdown_tx.send(true).unwrap();
    handle.await.unwrap();
    assert_eq!(fleet.blob_store.blob_count(), 0);
}
