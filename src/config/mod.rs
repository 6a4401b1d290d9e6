//! Configuration management for blogcheck
//!
//! Settings are layered with figment: built-in defaults, then user and
//! repository config files (TOML, JSON or YAML), then `BLOGCHECK_`
//! environment variables. See [`BlogcheckConfig::load_with_custom_config`].

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

mod loader;
mod smart_load;

pub use smart_load::auto;

/// Upper bound on configured worker threads
pub const MAX_WORKERS_LIMIT: usize = 256;

/// Main configuration structure for blogcheck
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct BlogcheckConfig {
    /// Where posts live and which files count as posts
    pub posts: PostsConfig,

    /// Worker pool settings
    pub parallel: ParallelConfig,

    /// Cache TTLs and timeouts
    pub cache: CacheConfig,

    /// Built-in check settings
    pub checks: ChecksConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostsConfig {
    /// Posts directory, relative to the working directory
    pub dir: PathBuf,

    /// Glob patterns selecting post files
    pub patterns: Vec<String>,
}

impl Default for PostsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("src/posts"),
            patterns: vec!["*.md".to_string()],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParallelConfig {
    /// Worker threads (0 = CPU count clamped to 4..=6)
    pub max_workers: usize,

    /// Per-validator timeout in seconds (0 = no timeout)
    pub task_timeout_secs: u64,
}

impl ParallelConfig {
    pub fn effective_workers(&self) -> usize {
        if self.max_workers > 0 {
            self.max_workers
        } else {
            crate::parallel::default_workers()
        }
    }

    pub fn task_timeout(&self) -> Option<Duration> {
        (self.task_timeout_secs > 0).then(|| Duration::from_secs(self.task_timeout_secs))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// How long an HTTP response is reused
    pub http_ttl_secs: u64,

    /// How long a directory listing is reused
    pub discovery_ttl_secs: u64,

    /// Per-request HTTP timeout
    pub http_timeout_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            http_ttl_secs: 600,
            discovery_ttl_secs: 60,
            http_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChecksConfig {
    /// Frontmatter keys every post must define
    pub required_fields: Vec<String>,

    /// Reject posts sharing a title
    pub unique_titles: bool,

    /// Reject posts whose body is blank
    pub non_empty_body: bool,

    /// Fetch every external link (slow, needs network)
    pub external_links: bool,
}

impl Default for ChecksConfig {
    fn default() -> Self {
        Self {
            required_fields: vec!["title".to_string(), "date".to_string()],
            unique_titles: true,
            non_empty_body: true,
            external_links: false,
        }
    }
}

impl BlogcheckConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.posts.patterns.is_empty() {
            anyhow::bail!("At least one post pattern must be specified");
        }
        crate::cache::discovery::build_globset(&self.posts.patterns)?;

        if self.parallel.max_workers > MAX_WORKERS_LIMIT {
            anyhow::bail!(
                "parallel.max_workers ({}) exceeds the limit of {}",
                self.parallel.max_workers,
                MAX_WORKERS_LIMIT
            );
        }

        if self.cache.http_timeout_secs == 0 {
            anyhow::bail!("cache.http_timeout_secs cannot be 0");
        }

        if self.checks.required_fields.iter().any(|f| f.trim().is_empty()) {
            anyhow::bail!("checks.required_fields cannot contain blank names");
        }

        Ok(())
    }
}
