use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use super::clock::Clock;
use super::lock;
use super::stats::{CacheKind, CacheStats};

/// Build a glob set from user-supplied patterns
pub fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).with_context(|| format!("Invalid glob pattern: {pattern}"))?;
        builder.add(glob);
    }
    builder.build().context("Failed to build glob set")
}

/// Sorted file listings per directory, reused for a short TTL
pub struct DiscoveryCache {
    entries: Mutex<HashMap<PathBuf, (Instant, Arc<Vec<PathBuf>>)>>,
    matcher: GlobSet,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    stats: Arc<CacheStats>,
}

impl DiscoveryCache {
    pub fn new(
        patterns: &[String],
        clock: Arc<dyn Clock>,
        ttl: Duration,
        stats: Arc<CacheStats>,
    ) -> Result<Self> {
        Ok(Self {
            entries: Mutex::new(HashMap::new()),
            matcher: build_globset(patterns)?,
            clock,
            ttl,
            stats,
        })
    }

    /// List files below `dir` whose name matches the configured patterns
    pub fn list(&self, dir: &Path) -> Result<Arc<Vec<PathBuf>>> {
        let dir = fs::canonicalize(dir)
            .with_context(|| format!("Failed to resolve directory {}", dir.display()))?;

        {
            let entries = lock(&self.entries);
            if let Some((listed_at, files)) = entries.get(&dir)
                && self.clock.now().saturating_duration_since(*listed_at) < self.ttl
            {
                self.stats.record_hit(CacheKind::Discovery);
                return Ok(files.clone());
            }
        }

        self.stats.record_miss(CacheKind::Discovery);
        let files = Arc::new(self.walk(&dir)?);
        tracing::debug!("Discovered {} files in {}", files.len(), dir.display());

        lock(&self.entries).insert(dir, (self.clock.now(), files.clone()));
        Ok(files)
    }

    fn walk(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        if !dir.is_dir() {
            anyhow::bail!("{} is not a directory", dir.display());
        }

        let mut files = Vec::new();
        for entry in WalkBuilder::new(dir).hidden(true).build() {
            let entry = entry.with_context(|| format!("Failed to walk {}", dir.display()))?;
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }

            let path = entry.path();
            let relative = path.strip_prefix(dir).unwrap_or(path);
            if self.matcher.is_match(relative) {
                files.push(path.to_path_buf());
            }
        }

        files.sort();
        Ok(files)
    }

    pub fn clear(&self) {
        lock(&self.entries).clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::clock::ManualClock;
    use tempfile::TempDir;

    fn patterns() -> Vec<String> {
        vec!["*.md".to_string()]
    }

    #[test]
    fn test_lists_sorted_matching_files() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("b.md"), "").unwrap();
        fs::write(temp_dir.path().join("a.md"), "").unwrap();
        fs::write(temp_dir.path().join("notes.txt"), "").unwrap();
        fs::create_dir(temp_dir.path().join("2024")).unwrap();
        fs::write(temp_dir.path().join("2024/c.md"), "").unwrap();

        let cache = DiscoveryCache::new(
            &patterns(),
            Arc::new(ManualClock::new()),
            Duration::from_secs(60),
            Arc::new(CacheStats::default()),
        )
        .unwrap();

        let files = cache.list(temp_dir.path()).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["c.md", "a.md", "b.md"]);
    }

    #[test]
    fn test_ttl_expiry_rewalks() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.md"), "").unwrap();

        let clock = Arc::new(ManualClock::new());
        let stats = Arc::new(CacheStats::default());
        let cache = DiscoveryCache::new(
            &patterns(),
            clock.clone(),
            Duration::from_secs(60),
            stats.clone(),
        )
        .unwrap();

        assert_eq!(cache.list(temp_dir.path()).unwrap().len(), 1);
        fs::write(temp_dir.path().join("b.md"), "").unwrap();

        // Within the TTL the stale listing is served
        clock.advance(Duration::from_secs(30));
        assert_eq!(cache.list(temp_dir.path()).unwrap().len(), 1);

        clock.advance(Duration::from_secs(31));
        assert_eq!(cache.list(temp_dir.path()).unwrap().len(), 2);

        let snapshot = stats.snapshot().discovery;
        assert_eq!((snapshot.hits, snapshot.misses), (1, 2));
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let result = DiscoveryCache::new(
            &["[unclosed".to_string()],
            Arc::new(ManualClock::new()),
            Duration::from_secs(60),
            Arc::new(CacheStats::default()),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_directory_is_error() {
        let cache = DiscoveryCache::new(
            &patterns(),
            Arc::new(ManualClock::new()),
            Duration::from_secs(60),
            Arc::new(CacheStats::default()),
        )
        .unwrap();
        assert!(cache.list(Path::new("/no/such/posts")).is_err());
    }
}
