use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for crawl-swarm
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub coordinator: CoordinatorConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            coordinator: CoordinatorConfig::default(),
            worker: WorkerConfig::default(),
            user_agent: UserAgentConfig::default(),
        }
    }
}

/// Coordinator behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CoordinatorConfig {
    /// Seconds a task may go without a terminal report before the sweep
    /// requeues it
    #[serde(rename = "task-timeout-secs", default = "default_task_timeout")]
    pub task_timeout_secs: u64,

    /// Seconds between timeout sweeps
    #[serde(rename = "sweep-interval-secs", default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    /// Seconds between liveness classification passes
    #[serde(rename = "liveness-interval-secs", default = "default_liveness_interval")]
    pub liveness_interval_secs: u64,

    /// Seconds between stats reports
    #[serde(rename = "stats-interval-secs", default = "default_stats_interval")]
    pub stats_interval_secs: u64,

    /// Seconds a periodic loop sleeps after a transient error
    #[serde(rename = "error-backoff-secs", default = "default_error_backoff")]
    pub error_backoff_secs: u64,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            task_timeout_secs: default_task_timeout(),
            sweep_interval_secs: default_sweep_interval(),
            liveness_interval_secs: default_liveness_interval(),
            stats_interval_secs: default_stats_interval(),
            error_backoff_secs: default_error_backoff(),
        }
    }
}

impl CoordinatorConfig {
    pub fn task_timeout(&self) -> Duration {
        Duration::from_secs(self.task_timeout_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn liveness_interval(&self) -> Duration {
        Duration::from_secs(self.liveness_interval_secs)
    }

    pub fn stats_interval(&self) -> Duration {
        Duration::from_secs(self.stats_interval_secs)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_secs(self.error_backoff_secs)
    }
}

/// Crawl worker behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    /// Minimum milliseconds between fetches issued by one worker; robots
    /// crawl-delay can raise the effective value, never lower it
    #[serde(rename = "crawl-delay-ms", default = "default_crawl_delay")]
    pub crawl_delay_ms: u64,

    /// Seconds between heartbeat emissions
    #[serde(rename = "heartbeat-interval-secs", default = "default_heartbeat_interval")]
    pub heartbeat_interval_secs: u64,

    /// Total request timeout for page fetches, seconds
    #[serde(rename = "fetch-timeout-secs", default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    /// Request timeout for robots.txt fetches, seconds
    #[serde(rename = "robots-fetch-timeout-secs", default = "default_robots_timeout")]
    pub robots_fetch_timeout_secs: u64,

    /// Maximum retries for recoverable fetch failures (429/5xx)
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Backoff base in milliseconds; attempt n sleeps base * 2^n.
    /// Production keeps the 1s default; tests shrink it.
    #[serde(rename = "retry-backoff-base-ms", default = "default_backoff_base")]
    pub retry_backoff_base_ms: u64,

    /// Seconds between index worker ingest passes
    #[serde(rename = "index-interval-secs", default = "default_index_interval")]
    pub index_interval_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            crawl_delay_ms: default_crawl_delay(),
            heartbeat_interval_secs: default_heartbeat_interval(),
            fetch_timeout_secs: default_fetch_timeout(),
            robots_fetch_timeout_secs: default_robots_timeout(),
            max_retries: default_max_retries(),
            retry_backoff_base_ms: default_backoff_base(),
            index_interval_secs: default_index_interval(),
        }
    }
}

impl WorkerConfig {
    pub fn crawl_delay(&self) -> Duration {
        Duration::from_millis(self.crawl_delay_ms)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn robots_fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.robots_fetch_timeout_secs)
    }

    pub fn retry_backoff_base(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_base_ms)
    }

    pub fn index_interval(&self) -> Duration {
        Duration::from_secs(self.index_interval_secs)
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    #[serde(rename = "crawler-name", default = "default_crawler_name")]
    pub crawler_name: String,

    #[serde(rename = "crawler-version", default = "default_crawler_version")]
    pub crawler_version: String,

    #[serde(rename = "contact-url", default = "default_contact_url")]
    pub contact_url: String,

    #[serde(rename = "contact-email", default = "default_contact_email")]
    pub contact_email: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: default_crawler_name(),
            crawler_version: default_crawler_version(),
            contact_url: default_contact_url(),
            contact_email: default_contact_email(),
        }
    }
}

impl UserAgentConfig {
    /// Format: CrawlerName/Version (+ContactURL; ContactEmail)
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

fn default_crawler_name() -> String {
    "CrawlSwarm".to_string()
}

fn default_crawler_version() -> String {
    "0.1".to_string()
}

fn default_contact_url() -> String {
    "https://example.com/about".to_string()
}

fn default_contact_email() -> String {
    "admin@example.com".to_string()
}

fn default_task_timeout() -> u64 {
    180
}

fn default_sweep_interval() -> u64 {
    15
}

fn default_liveness_interval() -> u64 {
    30
}

fn default_stats_interval() -> u64 {
    30
}

fn default_error_backoff() -> u64 {
    5
}

fn default_crawl_delay() -> u64 {
    1000
}

fn default_heartbeat_interval() -> u64 {
    60
}

fn default_fetch_timeout() -> u64 {
    10
}

fn default_robots_timeout() -> u64 {
    5
}

fn default_max_retries() -> u32 {
    3
}

fn default_backoff_base() -> u64 {
    1000
}

fn default_index_interval() -> u64 {
    30
}
