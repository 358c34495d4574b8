//! Configuration module for crawl-swarm
//!
//! Handles loading, parsing, and validating TOML configuration files. Every
//! field defaults to the system's documented operating constants, so a
//! minimal (even empty) file is valid.
//!
//! # Example
//!
//! ```no_run
//! use crawl_swarm::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.toml")).unwrap();
//! println!("Task timeout: {}s", config.coordinator.task_timeout_secs);
//! ```

mod parser;
mod types;
mod validation;

pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use types::{Config, CoordinatorConfig, UserAgentConfig, WorkerConfig};
