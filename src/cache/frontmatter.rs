//! Frontmatter parsing and the mtime-keyed document cache

use anyhow::{Context, Result};
use serde_yml::Value;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use super::lock;
use super::stats::{CacheKind, CacheStats};

/// A Markdown document split into its YAML frontmatter and body
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub fields: BTreeMap<String, Value>,
    pub body: String,
    pub has_frontmatter: bool,
}

impl Document {
    /// Parse `---` delimited YAML frontmatter followed by a body.
    ///
    /// A document without an opening delimiter, or without a closing one, has
    /// no frontmatter and its whole text is the body.
    pub fn parse(content: &str) -> Result<Self> {
        let Some((yaml, body)) = split_frontmatter(content) else {
            return Ok(Self {
                fields: BTreeMap::new(),
                body: content.trim_start().to_string(),
                has_frontmatter: false,
            });
        };

        let value: Value = serde_yml::from_str(yaml).context("Invalid YAML frontmatter")?;
        let fields = match value {
            Value::Null => BTreeMap::new(),
            Value::Mapping(mapping) => mapping
                .into_iter()
                .map(|(key, value)| (key_to_string(key), value))
                .collect(),
            _ => anyhow::bail!("Frontmatter must be a key-value mapping"),
        };

        Ok(Self {
            fields,
            body: body.trim_start().to_string(),
            has_frontmatter: true,
        })
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// True when the key exists and is not null or an empty string
    pub fn has_value(&self, key: &str) -> bool {
        match self.fields.get(key) {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.trim().is_empty(),
            Some(_) => true,
        }
    }
}

/// Return `(yaml, body)` when the content opens and closes a frontmatter block
fn split_frontmatter(content: &str) -> Option<(&str, &str)> {
    let trimmed = content.trim_start_matches('\u{feff}');
    let rest = trimmed
        .strip_prefix("---\r\n")
        .or_else(|| trimmed.strip_prefix("---\n"))?;

    // The closing delimiter is the first line that is `---` plus optional
    // trailing whitespace; it may be the very first line (empty frontmatter)
    let mut line_start = 0;
    loop {
        let line_end = rest[line_start..].find('\n').map(|i| line_start + i);
        let line = &rest[line_start..line_end.unwrap_or(rest.len())];
        if let Some(tail) = line.strip_prefix("---")
            && tail.trim().is_empty()
        {
            let body = line_end.map_or("", |end| &rest[end + 1..]);
            return Some((&rest[..line_start], body));
        }
        line_start = line_end? + 1;
    }
}

fn key_to_string(key: Value) -> String {
    match key {
        Value::String(s) => s,
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => serde_yml::to_string(&other)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
    }
}

/// File state a cached parse was taken from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fingerprint {
    modified: SystemTime,
    len: u64,
}

impl Fingerprint {
    fn of(path: &Path) -> Result<Self> {
        let metadata = fs::metadata(path)
            .with_context(|| format!("Failed to read metadata for {}", path.display()))?;
        let modified = metadata
            .modified()
            .with_context(|| format!("No modification time for {}", path.display()))?;
        Ok(Self {
            modified,
            len: metadata.len(),
        })
    }
}

/// Parsed documents keyed by canonical path, revalidated against the file's
/// modification time and size on every lookup
pub struct FrontmatterCache {
    entries: Mutex<HashMap<PathBuf, (Fingerprint, Arc<Document>)>>,
    stats: Arc<CacheStats>,
}

impl FrontmatterCache {
    pub fn new(stats: Arc<CacheStats>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            stats,
        }
    }

    pub fn get(&self, path: &Path) -> Result<Arc<Document>> {
        let path = fs::canonicalize(path)
            .with_context(|| format!("Failed to resolve {}", path.display()))?;
        let fingerprint = Fingerprint::of(&path)?;

        {
            let entries = lock(&self.entries);
            if let Some((cached, document)) = entries.get(&path)
                && *cached == fingerprint
            {
                self.stats.record_hit(CacheKind::Frontmatter);
                tracing::trace!("Frontmatter cache hit: {}", path.display());
                return Ok(document.clone());
            }
        }

        self.stats.record_miss(CacheKind::Frontmatter);
        tracing::debug!("Frontmatter cache miss: {}", path.display());

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let document = Arc::new(
            Document::parse(&content)
                .with_context(|| format!("Failed to parse frontmatter in {}", path.display()))?,
        );

        // Re-stat after reading so a write racing the read is seen as a change
        // on the next lookup rather than cached under the newer fingerprint.
        let after = Fingerprint::of(&path)?;
        if after == fingerprint {
            lock(&self.entries).insert(path, (fingerprint, document.clone()));
        }

        Ok(document)
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        lock(&self.entries).clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::time::Duration;
    use tempfile::TempDir;

    fn title(value: &str) -> Value {
        Value::String(value.to_string())
    }

    #[test]
    fn test_parse_frontmatter_and_body() {
        let doc = Document::parse("---\ntitle: X\n---\nBody").unwrap();
        assert!(doc.has_frontmatter);
        assert_eq!(doc.fields, BTreeMap::from([("title".to_string(), title("X"))]));
        assert_eq!(doc.body, "Body");
    }

    #[test]
    fn test_parse_without_frontmatter() {
        let doc = Document::parse("# Just a heading\n\ntext").unwrap();
        assert!(!doc.has_frontmatter);
        assert!(doc.fields.is_empty());
        assert_eq!(doc.body, "# Just a heading\n\ntext");
    }

    #[test]
    fn test_parse_empty_frontmatter() {
        let doc = Document::parse("---\n---\nBody").unwrap();
        assert!(doc.has_frontmatter);
        assert!(doc.fields.is_empty());
        assert_eq!(doc.body, "Body");
    }

    #[test]
    fn test_closing_delimiter_must_stand_alone() {
        for content in ["---\n----\nBody", "---\n---more\nBody"] {
            let doc = Document::parse(content).unwrap();
            assert!(!doc.has_frontmatter, "{content:?}");
            assert_eq!(doc.body, content);
        }

        let doc = Document::parse("---\n---").unwrap();
        assert!(doc.has_frontmatter);
        assert!(doc.fields.is_empty());
        assert_eq!(doc.body, "");

        let doc = Document::parse("---\r\ntitle: X\r\n---\r\nBody").unwrap();
        assert_eq!(doc.get_str("title"), Some("X"));
        assert_eq!(doc.body, "Body");
    }

    #[test]
    fn test_unclosed_frontmatter_is_body() {
        let doc = Document::parse("---\ntitle: X\nno closing").unwrap();
        assert!(!doc.has_frontmatter);
        assert!(doc.body.starts_with("---"));
    }

    #[test]
    fn test_horizontal_rule_in_body_is_not_a_delimiter() {
        let doc = Document::parse("---\ntitle: X\n---\nIntro\n\n---\n\nMore").unwrap();
        assert_eq!(doc.get_str("title"), Some("X"));
        assert_eq!(doc.body, "Intro\n\n---\n\nMore");
    }

    #[test]
    fn test_non_mapping_frontmatter_is_error() {
        assert!(Document::parse("---\n- a\n- b\n---\nBody").is_err());
        assert!(Document::parse("---\ntitle: [unclosed\n---\nBody").is_err());
    }

    #[test]
    fn test_has_value() {
        let doc =
            Document::parse("---\ntitle: ''\ndate: 2024-01-01\ndraft: false\nempty:\n---\n")
                .unwrap();
        assert!(!doc.has_value("title"));
        assert!(doc.has_value("date"));
        assert!(doc.has_value("draft"));
        assert!(!doc.has_value("empty"));
        assert!(!doc.has_value("missing"));
    }

    #[test]
    fn test_cache_hit_and_mtime_invalidation() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("post.md");
        fs::write(&path, "---\ntitle: X\n---\nBody").unwrap();

        let stats = Arc::new(CacheStats::default());
        let cache = FrontmatterCache::new(stats.clone());

        assert_eq!(cache.get(&path).unwrap().get_str("title"), Some("X"));
        assert_eq!(cache.get(&path).unwrap().get_str("title"), Some("X"));
        assert_eq!(stats.snapshot().frontmatter.hits, 1);

        // Same length, so only the modification time tells the versions apart
        fs::write(&path, "---\ntitle: Y\n---\nBody").unwrap();
        let later = SystemTime::now() + Duration::from_secs(5);
        File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(later)
            .unwrap();

        assert_eq!(cache.get(&path).unwrap().get_str("title"), Some("Y"));
        assert_eq!(stats.snapshot().frontmatter.misses, 2);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_parse_errors_are_not_cached() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.md");
        fs::write(&path, "---\n- not a map\n---\n").unwrap();

        let cache = FrontmatterCache::new(Arc::new(CacheStats::default()));
        assert!(cache.get(&path).is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_missing_file_is_error() {
        let cache = FrontmatterCache::new(Arc::new(CacheStats::default()));
        assert!(cache.get(Path::new("/definitely/not/here.md")).is_err());
    }
}
