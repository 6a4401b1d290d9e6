//! Built-in post validators
//!
//! Each check is a plain function over a shared [`CheckContext`] returning a
//! [`Verdict`]. Expensive reads (post discovery, frontmatter, link fetches)
//! go through the context's [`CacheManager`], so checks running side by side
//! reuse each other's work.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cache::{CacheManager, Document};
use crate::config::ChecksConfig;
use crate::parallel::{ParallelValidator, Verdict};

pub mod duplicates;
pub mod frontmatter;
pub mod links;

/// Offenders listed in a failure message before the rest are summarized
const MAX_LISTED: usize = 5;

/// Everything a built-in check needs
pub struct CheckContext {
    posts_dir: PathBuf,
    cache: Arc<CacheManager>,
    settings: ChecksConfig,
}

impl CheckContext {
    pub fn new(posts_dir: &Path, cache: Arc<CacheManager>, settings: ChecksConfig) -> Result<Self> {
        let posts_dir = posts_dir
            .canonicalize()
            .with_context(|| format!("Posts directory not found: {}", posts_dir.display()))?;
        Ok(Self {
            posts_dir,
            cache,
            settings,
        })
    }

    pub fn posts_dir(&self) -> &Path {
        &self.posts_dir
    }

    pub fn cache(&self) -> &Arc<CacheManager> {
        &self.cache
    }

    pub fn settings(&self) -> &ChecksConfig {
        &self.settings
    }

    /// Every post file, sorted
    pub fn posts(&self) -> Result<Arc<Vec<PathBuf>>> {
        self.cache.discover(&self.posts_dir)
    }

    /// Parsed posts; files whose frontmatter fails to parse are skipped here
    /// and reported by the frontmatter check instead
    pub fn documents(&self) -> Result<Vec<(PathBuf, Arc<Document>)>> {
        let posts = self.posts()?;
        Ok(posts
            .iter()
            .filter_map(|path| match self.cache.frontmatter(path) {
                Ok(doc) => Some((path.clone(), doc)),
                Err(e) => {
                    tracing::debug!("Skipping {}: {:#}", path.display(), e);
                    None
                }
            })
            .collect())
    }

    /// Path relative to the posts directory, for messages
    pub fn display_path(&self, path: &Path) -> String {
        path.strip_prefix(&self.posts_dir)
            .unwrap_or(path)
            .display()
            .to_string()
    }
}

/// Register every enabled built-in check
pub fn register_builtin(validator: &mut ParallelValidator, ctx: Arc<CheckContext>) -> Result<()> {
    let checks: [(&str, bool, fn(&CheckContext) -> Result<Verdict>); 4] = [
        ("frontmatter", true, frontmatter::required_fields),
        ("non-empty-body", ctx.settings.non_empty_body, frontmatter::non_empty_body),
        ("unique-titles", ctx.settings.unique_titles, duplicates::unique_titles),
        ("external-links", ctx.settings.external_links, links::external_links),
    ];

    for (name, enabled, check) in checks {
        if !enabled {
            tracing::debug!("Check {} disabled", name);
            continue;
        }
        let ctx = ctx.clone();
        validator.add_validator(name, move || check(&ctx))?;
    }

    Ok(())
}

/// "N problems: a, b, c, d, e and 3 more"
pub(crate) fn summarize(what: &str, offenders: &[String]) -> String {
    let listed = offenders
        .iter()
        .take(MAX_LISTED)
        .cloned()
        .collect::<Vec<_>>()
        .join(", ");
    let mut message = format!("{} {}: {}", offenders.len(), what, listed);
    if offenders.len() > MAX_LISTED {
        message.push_str(&format!(" and {} more", offenders.len() - MAX_LISTED));
    }
    message
}


#[cfg(test)]
mod tests {
    use super::test_support::context_with;
    use super::*;

    #[test]
    fn test_summarize_truncates() {
        let offenders: Vec<String> = (1..=7).map(|i| format!("p{i}.md")).collect();
        assert_eq!(
            summarize("posts missing fields", &offenders),
            "7 posts missing fields: p1.md, p2.md, p3.md, p4.md, p5.md and 2 more"
        );
        assert_eq!(summarize("bad", &offenders[..1]), "1 bad: p1.md");
    }

    #[test]
    fn test_register_respects_settings() {
        let (_dir, ctx) = context_with(&[], ChecksConfig::default());
        let mut validator = ParallelValidator::new(2);
        register_builtin(&mut validator, ctx).unwrap();
        let names: Vec<&str> = validator.names().collect();
        assert_eq!(names, vec!["frontmatter", "non-empty-body", "unique-titles"]);
    }

    #[test]
    fn test_builtin_checks_pass_on_clean_posts() {
        let settings = ChecksConfig {
            external_links: true,
            ..ChecksConfig::default()
        };
        let (_dir, ctx) = context_with(
            &[
                ("one.md", "---\ntitle: One\ndate: 2024-01-01\n---\nSee https://example.com/ok."),
                ("two.md", "---\ntitle: Two\ndate: 2024-02-01\n---\nSecond post"),
            ],
            settings,
        );

        let mut validator = ParallelValidator::new(4);
        register_builtin(&mut validator, ctx.clone()).unwrap();
        let (all_passed, results) = validator.run_all().unwrap();

        assert!(all_passed, "{results:?}");
        assert_eq!(results.len(), 4);
        // Every check listed the posts through the shared discovery cache
        assert_eq!(ctx.cache().stats().discovery.lookups(), 4);
    }

    #[test]
    fn test_missing_posts_dir() {
        let cache = Arc::new(
            CacheManager::with_parts(
                crate::cache::CacheSettings::default(),
                Arc::new(test_support::FakeFetcher),
                Arc::new(crate::cache::SystemClock),
            )
            .unwrap(),
        );
        let missing = Path::new("/no/posts/here");
        assert!(CheckContext::new(missing, cache, ChecksConfig::default()).is_err());
    }
}
