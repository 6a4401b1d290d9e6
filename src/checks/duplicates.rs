use anyhow::Result;
use std::collections::BTreeMap;

use super::{CheckContext, summarize};
use crate::parallel::Verdict;

/// No two posts share a title, ignoring case and surrounding whitespace
pub fn unique_titles(ctx: &CheckContext) -> Result<Verdict> {
    let documents = ctx.documents()?;
    let mut by_title: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for (path, doc) in &documents {
        if let Some(title) = doc.get_str("title") {
            by_title
                .entry(title.trim().to_lowercase())
                .or_default()
                .push(ctx.display_path(path));
        }
    }

    let duplicates: Vec<String> = by_title
        .into_iter()
        .filter(|(_, paths)| paths.len() > 1)
        .map(|(title, paths)| format!("\"{}\" in {}", title, paths.join(" & ")))
        .collect();

    if duplicates.is_empty() {
        Ok(Verdict::pass(format!("{} titles are unique", documents.len())))
    } else {
        Ok(Verdict::fail(summarize("duplicate titles", &duplicates)))
    }
}
