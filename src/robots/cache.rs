//! Per-origin robots.txt cache with TTL and fail-open semantics

use crate::robots::RobotsRules;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;

/// How long a cached entry (including a fail-open one) remains valid
pub const ROBOTS_TTL_SECS: i64 = 3600;

/// The user agent token robots rules are evaluated against
const WILDCARD_AGENT: &str = "*";

/// Cached robots state for one origin
#[derive(Debug, Clone)]
pub struct RulesEntry {
    pub rules: RobotsRules,
    pub fetched_at: DateTime<Utc>,
    /// True when the fetch failed or returned non-200 and the entry is a
    /// fail-open placeholder
    pub allow_all: bool,
}

impl RulesEntry {
    fn parsed(rules: RobotsRules) -> Self {
        Self {
            rules,
            fetched_at: Utc::now(),
            allow_all: false,
        }
    }

    /// Fail-open entry, cached with the normal TTL so a broken origin does
    /// not cause a refetch on every page
    fn fail_open() -> Self {
        Self {
            rules: RobotsRules::allow_all(),
            fetched_at: Utc::now(),
            allow_all: true,
        }
    }

    /// Entries older than [`ROBOTS_TTL_SECS`] are replaced wholesale
    pub fn is_stale(&self) -> bool {
        Utc::now() - self.fetched_at > ChronoDuration::seconds(ROBOTS_TTL_SECS)
    }

    /// Whether the wildcard agent may fetch `url`
    pub fn can_fetch(&self, url: &str) -> bool {
        self.allow_all || self.rules.is_allowed(url, WILDCARD_AGENT)
    }

    /// The origin's crawl delay for the wildcard agent, if any
    pub fn crawl_delay(&self) -> Option<Duration> {
        self.rules
            .crawl_delay(WILDCARD_AGENT)
            .map(Duration::from_secs_f64)
    }
}

/// Per-origin cache of robots rules
///
/// Owned exclusively by one worker; no cross-process sharing.
#[derive(Debug, Default)]
pub struct RobotsCache {
    entries: HashMap<String, RulesEntry>,
}

impl RobotsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the entry for `origin`, fetching robots.txt when the cache
    /// has none or the cached one expired
    pub async fn get(&mut self, client: &Client, origin: &str, timeout: Duration) -> RulesEntry {
        if let Some(entry) = self.entries.get(origin) {
            if !entry.is_stale() {
                return entry.clone();
            }
        }

        let entry = fetch_rules(client, origin, timeout).await;
        self.entries.insert(origin.to_string(), entry.clone());
        entry
    }

    /// Test hook: seed an entry directly
    #[cfg(test)]
    pub fn insert(&mut self, origin: &str, entry: RulesEntry) {
        self.entries.insert(origin.to_string(), entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Fetches and parses `{origin}/robots.txt`
///
/// Any failure (transport error, timeout, or a non-200 status) produces a
/// fail-open entry.
async fn fetch_rules(client: &Client, origin: &str, timeout: Duration) -> RulesEntry {
    let robots_url = format!("{}/robots.txt", origin);

    let response = match client.get(&robots_url).timeout(timeout).send().await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!("robots.txt fetch failed for {}: {} (allowing all)", origin, e);
            return RulesEntry::fail_open();
        }
    };

    if !response.status().is_success() {
        tracing::debug!(
            "robots.txt for {} returned {} (allowing all)",
            origin,
            response.status()
        );
        return RulesEntry::fail_open();
    }

    match response.text().await {
        Ok(body) => RulesEntry::parsed(RobotsRules::from_content(&body)),
        Err(e) => {
            tracing::warn!("robots.txt body read failed for {}: {} (allowing all)", origin, e);
            RulesEntry::fail_open()
        }
    }
}
