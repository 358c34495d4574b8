//! crawl-swarm main entry point
//!
//! Command-line interface for running a local crawl fleet or validating
//! configuration. The local fleet wires the coordinator, crawl workers, and
//! the index worker over in-memory queue/store collaborators; production
//! deployments swap those for real backends behind the same traits.

use clap::{Parser, Subcommand};
use crawl_swarm::config::{load_config_with_hash, Config};
use crawl_swarm::coordinator::Coordinator;
use crawl_swarm::queue::{InMemoryQueue, MessageQueue};
use crawl_swarm::store::{InMemoryBlobStore, InMemoryIndex, SearchIndex};
use crawl_swarm::worker::{CrawlWorker, IndexWorker, ReportSink};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

/// crawl-swarm: a distributed web crawl coordinator and worker fleet
#[derive(Parser, Debug)]
#[command(name = "crawl-swarm")]
#[command(version)]
#[command(about = "A distributed web crawl coordinator and worker fleet", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults apply when omitted)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a local fleet: coordinator, crawl workers, and an index worker
    Run {
        /// Seed URLs to submit
        #[arg(required = true)]
        seeds: Vec<String>,

        /// Maximum link depth to follow from the seeds
        #[arg(long, default_value_t = 1)]
        depth_limit: u32,

        /// Drop links that leave the seed's host
        #[arg(long)]
        restrict_domain: bool,

        /// Number of crawl workers
        #[arg(long, default_value_t = 2)]
        workers: usize,

        /// Stop after this many seconds instead of waiting for Ctrl-C
        #[arg(long)]
        run_for: Option<u64>,

        /// Query to run against the search index before exiting
        #[arg(long)]
        query: Option<String>,
    },

    /// Validate the configuration and print the effective settings
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config = match &cli.config {
        Some(path) => {
            let (config, hash) = load_config_with_hash(path)?;
            tracing::info!("Configuration loaded from {} (hash: {})", path.display(), hash);
            config
        }
        None => {
            tracing::info!("No configuration file given, using defaults");
            Config::default()
        }
    };

    match cli.command {
        Commands::Check => handle_check(&config),
        Commands::Run {
            seeds,
            depth_limit,
            restrict_domain,
            workers,
            run_for,
            query,
        } => {
            handle_run(
                config,
                seeds,
                depth_limit,
                restrict_domain,
                workers,
                run_for,
                query,
            )
            .await?
        }
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("crawl_swarm=info,warn"),
            1 => EnvFilter::new("crawl_swarm=debug,info"),
            2 => EnvFilter::new("crawl_swarm=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the check subcommand: validates config and prints what would run
fn handle_check(config: &Config) {
    println!("=== crawl-swarm configuration ===\n");

    println!("Coordinator:");
    println!("  Task timeout: {}s", config.coordinator.task_timeout_secs);
    println!("  Sweep interval: {}s", config.coordinator.sweep_interval_secs);
    println!(
        "  Liveness interval: {}s",
        config.coordinator.liveness_interval_secs
    );
    println!("  Error backoff: {}s", config.coordinator.error_backoff_secs);

    println!("\nWorker:");
    println!("  Crawl delay: {}ms", config.worker.crawl_delay_ms);
    println!(
        "  Heartbeat interval: {}s",
        config.worker.heartbeat_interval_secs
    );
    println!("  Fetch timeout: {}s", config.worker.fetch_timeout_secs);
    println!(
        "  Robots fetch timeout: {}s",
        config.worker.robots_fetch_timeout_secs
    );
    println!("  Max retries: {}", config.worker.max_retries);

    println!("\nUser agent: {}", config.user_agent.header_value());

    println!("\n✓ Configuration is valid");
}

/// Handles the run subcommand: local fleet over in-memory collaborators
async fn handle_run(
    config: Config,
    seeds: Vec<String>,
    depth_limit: u32,
    restrict_domain: bool,
    workers: usize,
    run_for: Option<u64>,
    query: Option<String>,
) -> anyhow::Result<()> {
    let work_queue: Arc<dyn MessageQueue> = Arc::new(InMemoryQueue::new());
    let crawler_heartbeats: Arc<dyn MessageQueue> = Arc::new(InMemoryQueue::new());
    let indexer_heartbeats: Arc<dyn MessageQueue> = Arc::new(InMemoryQueue::new());
    let blob_store = Arc::new(InMemoryBlobStore::new());
    let index = Arc::new(InMemoryIndex::new());

    let coordinator = Coordinator::new(
        config.clone(),
        work_queue.clone(),
        crawler_heartbeats.clone(),
        indexer_heartbeats.clone(),
    );

    let accepted = coordinator
        .submit(&seeds, depth_limit, restrict_domain)
        .await;
    tracing::info!("Accepted {} of {} seed URLs", accepted, seeds.len());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let config = Arc::new(config);
    let reports: Arc<dyn ReportSink> = Arc::new(coordinator.clone());
    let mut handles = Vec::new();

    handles.push(tokio::spawn({
        let coordinator = coordinator.clone();
        let shutdown = shutdown_rx.clone();
        async move { coordinator.run(shutdown).await }
    }));

    for n in 1..=workers {
        let worker = CrawlWorker::new(
            &format!("crawler-{}", n),
            config.clone(),
            work_queue.clone(),
            crawler_heartbeats.clone(),
            blob_store.clone(),
            Some(reports.clone()),
        )?;
        handles.push(tokio::spawn(worker.run(shutdown_rx.clone())));
    }

    let index_worker = IndexWorker::new(
        "indexer-1",
        config.clone(),
        blob_store.clone(),
        index.clone(),
        indexer_heartbeats.clone(),
    );
    handles.push(tokio::spawn(index_worker.run(shutdown_rx.clone())));

    match run_for {
        Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
        None => {
            tokio::signal::ctrl_c().await?;
            tracing::info!("Interrupt received, shutting down");
        }
    }

    let _ = shutdown_tx.send(true);
    for handle in handles {
        let _ = handle.await;
    }

    let snapshot = coordinator.snapshot().await?;
    println!("\n=== Crawl summary ===");
    println!(
        "Tasks: {} total, {} done, {} queued, {} requeued, {} failed",
        snapshot.tasks.total,
        snapshot.tasks.done,
        snapshot.tasks.queued,
        snapshot.tasks.requeued,
        snapshot.tasks.failed
    );
    println!(
        "Queue depth: {} ready, {} in flight",
        snapshot.queue_ready, snapshot.queue_in_flight
    );
    println!("Stored pages: {}", blob_store.blob_count());
    println!("Indexed documents: {}", index.doc_count());

    if let Some(query) = query {
        let hits = index.query(&query).await?;
        println!("\n=== Search: {} ===", query);
        if hits.is_empty() {
            println!("No results");
        } else {
            for hit in hits.iter().take(10) {
                println!("→ {} | {}", hit.url, hit.title);
            }
        }
    }

    Ok(())
}
