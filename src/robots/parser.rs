//! Robots.txt rule evaluation
//!
//! Allow/disallow matching is delegated to the `robotstxt` crate;
//! `Crawl-delay` is not part of that crate's matcher, so it is parsed here
//! directly from the cached text.

use robotstxt::DefaultMatcher;

/// Parsed robots.txt rules for one origin
#[derive(Debug, Clone)]
pub struct RobotsRules {
    content: String,
    allow_all: bool,
}

impl RobotsRules {
    /// Wraps raw robots.txt content
    pub fn from_content(content: &str) -> Self {
        Self {
            content: content.to_string(),
            allow_all: false,
        }
    }

    /// Permissive rules used when robots.txt cannot be fetched (fail open)
    pub fn allow_all() -> Self {
        Self {
            content: String::new(),
            allow_all: true,
        }
    }

    /// Checks whether `url` may be fetched by `user_agent`
    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        if self.allow_all || self.content.is_empty() {
            return true;
        }
        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, user_agent, url)
    }

    /// Extracts the `Crawl-delay` directive in seconds for `user_agent`
    ///
    /// A delay in the group matching the specific agent wins over one in the
    /// wildcard group.
    pub fn crawl_delay(&self, user_agent: &str) -> Option<f64> {
        if self.allow_all || self.content.is_empty() {
            return None;
        }

        let agent = user_agent.to_lowercase();
        let mut group_agents: Vec<String> = Vec::new();
        let mut wildcard_delay: Option<f64> = None;
        let mut agent_delay: Option<f64> = None;

        for line in self.content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();

            match key.trim().to_lowercase().as_str() {
                "user-agent" => group_agents.push(value.to_lowercase()),
                "crawl-delay" => {
                    if let Ok(delay) = value.parse::<f64>() {
                        if group_agents.iter().any(|a| a != "*" && agent.contains(a.as_str())) {
                            agent_delay = Some(delay);
                        } else if group_agents.iter().any(|a| a == "*") {
                            wildcard_delay = Some(delay);
                        }
                    }
                    // Crawl-delay closes its group; the next User-agent
                    // line starts a new one
                    group_agents.clear();
                }
                _ => {}
            }
        }

        agent_delay.or(wildcard_delay)
    }
}
