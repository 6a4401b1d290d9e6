use anyhow::Result;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

use super::{CheckContext, summarize};
use crate::parallel::{Outcome, Verdict, WorkerPool};

/// Concurrent link fetches inside the external-links check
const LINK_WORKERS: usize = 8;

static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"https?://[^\s<>()\[\]"'`]+"#)
        .unwrap_or_else(|e| panic!("invalid URL pattern: {e}"))
});

/// Distinct http(s) URLs in a Markdown body, trailing punctuation removed
pub fn extract_urls(body: &str) -> BTreeSet<String> {
    URL_PATTERN
        .find_iter(body)
        .map(|m| m.as_str().trim_end_matches(['.', ',', ';', ':', '!', '?']).to_string())
        .collect()
}

/// Every external link in every post answers with a status below 400
pub fn external_links(ctx: &CheckContext) -> Result<Verdict> {
    let documents = ctx.documents()?;
    let urls: BTreeSet<String> = documents
        .iter()
        .flat_map(|(_, doc)| extract_urls(&doc.body))
        .collect();

    if urls.is_empty() {
        return Ok(Verdict::pass("No external links"));
    }

    let cache = ctx.cache().clone();
    let urls: Vec<String> = urls.into_iter().collect();
    let total = urls.len();
    let outcomes = WorkerPool::new(LINK_WORKERS)
        .with_thread_name("link-check")
        .execute(
            urls.clone(),
            move |url: String| match cache.http_get(&url) {
                Ok(response) if response.is_ok_link() => None,
                Ok(response) => Some(format!("{url} ({})", response.status)),
                Err(e) => Some(format!("{url} ({e:#})")),
            },
            |_, _| {},
        )?;

    let broken: Vec<String> = outcomes
        .into_iter()
        .zip(urls)
        .filter_map(|(outcome, url)| match outcome {
            Outcome::Completed(problem) => problem,
            Outcome::Panicked { message, .. } => Some(format!("{url} ({message})")),
            Outcome::TimedOut { .. } => Some(format!("{url} (timed out)")),
        })
        .collect();

    if broken.is_empty() {
        Ok(Verdict::pass(format!("{total} external links reachable")))
    } else {
        Ok(Verdict::fail(summarize("broken links", &broken)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::test_support::context_with;
    use crate::config::ChecksConfig;

    #[test]
    fn test_extract_urls() {
        let urls = extract_urls(concat!(
            "See [docs](https://example.com/docs), or <http://x.org/a?b=1>. ",
            "Also https://example.com/docs!"
        ));
        let urls: Vec<&str> = urls.iter().map(String::as_str).collect();
        assert_eq!(urls, vec!["http://x.org/a?b=1", "https://example.com/docs"]);
    }

    #[test]
    fn test_external_links_reports_broken() {
        let (_dir, ctx) = context_with(
            &[
                (
                    "a.md",
                    "---\ntitle: A\n---\nhttps://ok.example/ and https://missing.example/page",
                ),
                ("b.md", "---\ntitle: B\n---\nhttps://unreachable.example and https://ok.example/"),
            ],
            ChecksConfig::default(),
        );

        let verdict = external_links(&ctx).unwrap();
        assert!(!verdict.success);
        assert!(verdict.message.starts_with("2 broken links: https://missing.example/page (404)"));
        assert!(verdict.message.contains("https://unreachable.example (dns error)"));
        // The shared link was fetched once
        assert_eq!(ctx.cache().stats().http.lookups(), 3);
    }

    #[test]
    fn test_no_links_passes() {
        let (_dir, ctx) =
            context_with(&[("a.md", "---\ntitle: A\n---\nplain")], ChecksConfig::default());
        assert_eq!(external_links(&ctx).unwrap(), Verdict::pass("No external links"));
    }
}
