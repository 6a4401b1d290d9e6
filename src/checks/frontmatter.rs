use anyhow::Result;

use super::{CheckContext, summarize};
use crate::parallel::Verdict;

/// Every post parses and defines each required frontmatter field
pub fn required_fields(ctx: &CheckContext) -> Result<Verdict> {
    let posts = ctx.posts()?;
    let required = &ctx.settings().required_fields;
    let mut offenders = Vec::new();

    for path in posts.iter() {
        let name = ctx.display_path(path);
        match ctx.cache().frontmatter(path) {
            Ok(doc) => {
                let missing: Vec<&str> = required
                    .iter()
                    .filter(|field| !doc.has_value(field))
                    .map(String::as_str)
                    .collect();
                if !missing.is_empty() {
                    offenders.push(format!("{name} (missing {})", missing.join(", ")));
                }
            }
            Err(e) => offenders.push(format!("{name} ({e:#})")),
        }
    }

    if offenders.is_empty() {
        Ok(Verdict::pass(format!("{} posts have valid frontmatter", posts.len())))
    } else {
        Ok(Verdict::fail(summarize("posts with frontmatter problems", &offenders)))
    }
}

/// Every post has some content after its frontmatter
pub fn non_empty_body(ctx: &CheckContext) -> Result<Verdict> {
    let documents = ctx.documents()?;
    let offenders: Vec<String> = documents
        .iter()
        .filter(|(_, doc)| doc.body.trim().is_empty())
        .map(|(path, _)| ctx.display_path(path))
        .collect();

    if offenders.is_empty() {
        Ok(Verdict::pass(format!("{} posts have content", documents.len())))
    } else {
        Ok(Verdict::fail(summarize("posts with an empty body", &offenders)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::test_support::context_with;
    use crate::config::ChecksConfig;

    #[test]
    fn test_required_fields_pass() {
        let (_dir, ctx) = context_with(
            &[("a.md", "---\ntitle: A\ndate: 2024-01-01\n---\nBody")],
            ChecksConfig::default(),
        );
        let verdict = required_fields(&ctx).unwrap();
        assert!(verdict.success);
        assert_eq!(verdict.message, "1 posts have valid frontmatter");
    }

    #[test]
    fn test_required_fields_reports_missing_and_broken() {
        let (_dir, ctx) = context_with(
            &[
                ("a.md", "---\ntitle: A\n---\nBody"),
                ("b.md", "---\n- not\n- a map\n---\nBody"),
                ("c.md", "---\ntitle: C\ndate: 2024-01-01\n---\nBody"),
            ],
            ChecksConfig::default(),
        );
        let verdict = required_fields(&ctx).unwrap();
        assert!(!verdict.success);
        assert!(
            verdict
                .message
                .starts_with("2 posts with frontmatter problems: a.md (missing date), b.md (")
        );
    }

    #[test]
    fn test_non_empty_body() {
        let (_dir, ctx) = context_with(
            &[
                ("full.md", "---\ntitle: Full\n---\nWords"),
                ("empty.md", "---\ntitle: Empty\n---\n   \n"),
            ],
            ChecksConfig::default(),
        );
        let verdict = non_empty_body(&ctx).unwrap();
        assert!(!verdict.success);
        assert_eq!(verdict.message, "1 posts with an empty body: empty.md");
    }
}
