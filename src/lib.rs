//! Crawl-Swarm: a distributed web crawl coordinator and worker fleet
//!
//! This crate implements the two halves of a small distributed crawler: a
//! coordinator that normalizes and deduplicates submitted URLs, dispatches
//! work through an at-least-once message queue, requeues tasks that time out,
//! and classifies worker liveness from heartbeats; and a crawl worker that
//! enforces robots.txt policy, fetches pages with retry and backoff, extracts
//! links and text, and uploads raw HTML to a blob store.
//!
//! The queue, blob store, and search index are external collaborators and are
//! modeled as traits (with in-memory implementations for tests and the local
//! run mode).

pub mod config;
pub mod coordinator;
pub mod message;
pub mod queue;
pub mod robots;
pub mod store;
pub mod url;
pub mod worker;

use thiserror::Error;

/// Main error type for crawl-swarm operations
#[derive(Debug, Error)]
pub enum SwarmError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Queue error: {0}")]
    Queue(#[from] queue::QueueError),

    #[error("Store error: {0}")]
    Store(#[from] store::StoreError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Message encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for crawl-swarm operations
pub type Result<T> = std::result::Result<T, SwarmError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use coordinator::Coordinator;
pub use message::{CrawlerHeartbeat, IndexerHeartbeat, WorkOrder};
pub use url::normalize;
