//! Failure-isolating dispatch over registered sources.

use std::any::Any;
use std::collections::HashSet;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{debug, instrument, warn};
use url::Url;

use super::{CollectOptions, Source};
use crate::entry::UrlEntry;
use crate::{Error, Result};

/// Why a source contributed nothing.
#[derive(Debug, thiserror::Error)]
pub enum SourceFailure {
    /// The source name is empty or not URL-safe.
    #[error("invalid source name '{0}'")]
    InvalidName(String),
    /// `collect` returned an error.
    #[error("collect failed: {0}")]
    Failed(#[source] Error),
    /// `collect` or `is_enabled` panicked.
    #[error("collect panicked: {0}")]
    Panicked(String),
}

/// A non-fatal problem reported alongside collected entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceWarning {
    /// Name of the source the warning concerns.
    pub source: String,
    /// Human-readable description.
    pub message: String,
}

impl SourceWarning {
    /// Create a warning.
    pub fn new(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for SourceWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.source, self.message)
    }
}

/// Entries from one or more sources plus the warnings raised collecting them.
#[derive(Debug, Clone, Default)]
pub struct Collected {
    /// Valid entries, in collection order.
    pub entries: Vec<UrlEntry>,
    /// Warnings, in collection order.
    pub warnings: Vec<SourceWarning>,
}

impl Collected {
    /// Append another collection.
    pub fn merge(&mut self, other: Self) {
        self.entries.extend(other.entries);
        self.warnings.extend(other.warnings);
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entries were collected.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Source names are non-empty and limited to `[A-Za-z0-9_-]`.
pub fn is_valid_source_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

fn loc_is_absolute(loc: &str) -> bool {
    Url::parse(loc)
        .is_ok_and(|url| matches!(url.scheme(), "http" | "https") && url.host().is_some())
}

/// Collect from one source, reporting failures as values.
///
/// Disabled sources yield an empty collection unless `options.force` is set.
/// Entries whose `loc` is not an absolute http(s) URL are dropped with a
/// warning. Every entry is stamped with the producing source's name,
/// replacing whatever `source` the source set itself.
pub async fn try_collect(
    source: &dyn Source,
    options: &CollectOptions,
) -> std::result::Result<Collected, SourceFailure> {
    let name = source.source_name();
    if !is_valid_source_name(name) {
        return Err(SourceFailure::InvalidName(name.to_string()));
    }

    if !options.force {
        if options.is_disabled(name) {
            debug!(source = %name, "Source disabled by configuration, skipping");
            return Ok(Collected::default());
        }
        let enabled = std::panic::catch_unwind(AssertUnwindSafe(|| source.is_enabled()))
            .map_err(|payload| SourceFailure::Panicked(panic_message(payload.as_ref())))?;
        if !enabled {
            debug!(source = %name, "Source disabled, skipping");
            return Ok(Collected::default());
        }
    }

    let entries = AssertUnwindSafe(source.collect(options))
        .catch_unwind()
        .await
        .map_err(|payload| SourceFailure::Panicked(panic_message(payload.as_ref())))?
        .map_err(SourceFailure::Failed)?;

    let mut collected = Collected::default();
    for mut entry in entries {
        if !loc_is_absolute(&entry.loc) {
            collected.warnings.push(SourceWarning::new(
                name,
                format!("dropped entry with invalid loc '{}'", entry.loc),
            ));
            continue;
        }
        if entry.source.as_deref().is_some_and(|s| s != name) {
            debug!(source = %name, stamp = ?entry.source, loc = %entry.loc, "Restamping entry source");
        }
        entry.source = Some(name.to_string());
        collected.entries.push(entry);
    }

    if !collected.warnings.is_empty() {
        warn!(
            source = %name,
            dropped = collected.warnings.len(),
            "Dropped entries with invalid loc"
        );
    }
    Ok(collected)
}

/// Collect from one source; any failure becomes an empty contribution plus
/// a warning.
pub async fn safe_collect(source: &dyn Source, options: &CollectOptions) -> Collected {
    match try_collect(source, options).await {
        Ok(collected) => collected,
        Err(failure) => {
            let name = source.source_name();
            warn!(source = %name, error = %failure, "Source failed, contributing no entries");
            Collected {
                entries: Vec::new(),
                warnings: vec![SourceWarning::new(name, failure.to_string())],
            }
        },
    }
}

/// The set of sources a site registered, in registration order.
#[derive(Clone, Default)]
pub struct SourceRegistry {
    sources: Vec<Arc<dyn Source>>,
}

impl fmt::Debug for SourceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceRegistry")
            .field("sources", &self.names().collect::<Vec<_>>())
            .finish()
    }
}

impl SourceRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a source. Names must be valid and unique.
    pub fn register(&mut self, source: Arc<dyn Source>) -> Result<()> {
        let name = source.source_name().to_string();
        if !is_valid_source_name(&name) {
            return Err(Error::source_failed(name, "name must match [A-Za-z0-9_-]+"));
        }
        if self.get(&name).is_some() {
            return Err(Error::source_failed(name, "a source with this name is already registered"));
        }
        debug!(source = %name, "Registered sitemap source");
        self.sources.push(source);
        Ok(())
    }

    /// Builder form of [`register`](Self::register).
    pub fn with(mut self, source: Arc<dyn Source>) -> Result<Self> {
        self.register(source)?;
        Ok(self)
    }

    /// Look up a source by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Source>> {
        self.sources
            .iter()
            .find(|s| s.source_name() == name)
            .cloned()
    }

    /// All sources, in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Source>> {
        self.sources.iter()
    }

    /// Names of all sources.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sources.iter().map(|s| s.source_name())
    }

    /// Number of registered sources.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Run [`safe_collect`] over every source in order.
    #[instrument(skip_all, fields(language = %options.language_code()))]
    pub async fn collect_all(&self, options: &CollectOptions) -> Collected {
        let mut collected = Collected::default();
        for source in &self.sources {
            collected.merge(safe_collect(source.as_ref(), options).await);
        }
        debug!(
            entries = collected.len(),
            warnings = collected.warnings.len(),
            "Collected entries from sources"
        );
        collected
    }
}

/// Drop duplicate `loc` values keeping the first occurrence.
pub(crate) fn dedup_by_loc(entries: Vec<UrlEntry>) -> Vec<UrlEntry> {
    let mut seen = HashSet::with_capacity(entries.len());
    entries
        .into_iter()
        .filter(|e| seen.insert(e.loc.clone()))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::language::LanguageSettings;

    struct FixedSource {
        name: &'static str,
        enabled: bool,
        locs: Vec<&'static str>,
    }

    #[async_trait]
    impl Source for FixedSource {
        fn source_name(&self) -> &str {
            self.name
        }

        fn is_enabled(&self) -> bool {
            self.enabled
        }

        async fn collect(&self, _options: &CollectOptions) -> Result<Vec<UrlEntry>> {
            Ok(self.locs.iter().map(|l| UrlEntry::new(*l)).collect())
        }
    }

    struct ErrorSource;

    #[async_trait]
    impl Source for ErrorSource {
        fn source_name(&self) -> &str {
            "broken"
        }

        fn is_enabled(&self) -> bool {
            true
        }

        async fn collect(&self, _options: &CollectOptions) -> Result<Vec<UrlEntry>> {
            Err(Error::Other("database unavailable".to_string()))
        }
    }

    struct PanicSource;

    #[async_trait]
    impl Source for PanicSource {
        fn source_name(&self) -> &str {
            "panicky"
        }

        fn is_enabled(&self) -> bool {
            true
        }

        async fn collect(&self, _options: &CollectOptions) -> Result<Vec<UrlEntry>> {
            panic!("boom")
        }
    }

    fn fixed(name: &'static str, locs: Vec<&'static str>) -> FixedSource {
        FixedSource {
            name,
            enabled: true,
            locs,
        }
    }

    fn options() -> CollectOptions {
        CollectOptions::new("https://example.com", LanguageSettings::single("en"))
    }

    #[test]
    fn test_source_name_validation() {
        assert!(is_valid_source_name("blog_posts-2"));
        assert!(!is_valid_source_name(""));
        assert!(!is_valid_source_name("blog posts"));
        assert!(!is_valid_source_name("blog/posts"));
    }

    #[tokio::test]
    async fn test_error_becomes_failure() {
        let failure = try_collect(&ErrorSource, &options()).await.unwrap_err();
        assert!(matches!(failure, SourceFailure::Failed(_)));

        let collected = safe_collect(&ErrorSource, &options()).await;
        assert!(collected.is_empty());
        assert_eq!(collected.warnings.len(), 1);
        assert_eq!(collected.warnings[0].source, "broken");
    }

    #[tokio::test]
    async fn test_panic_is_contained() {
        let failure = try_collect(&PanicSource, &options()).await.unwrap_err();
        match failure {
            SourceFailure::Panicked(message) => assert_eq!(message, "boom"),
            other => panic!("Expected panic failure, got {other:?}"),
        }
        assert!(safe_collect(&PanicSource, &options()).await.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_name_is_rejected() {
        let source = fixed("bad name", vec!["https://example.com/a"]);
        let failure = try_collect(&source, &options()).await.unwrap_err();
        assert!(matches!(failure, SourceFailure::InvalidName(_)));
    }

    #[tokio::test]
    async fn test_disabled_source_skipped_unless_forced() {
        let source = FixedSource {
            name: "drafts",
            enabled: false,
            locs: vec!["https://example.com/draft"],
        };
        assert!(safe_collect(&source, &options()).await.is_empty());
        let forced = safe_collect(&source, &options().forced()).await;
        assert_eq!(forced.len(), 1);
    }

    #[tokio::test]
    async fn test_configured_off_source_skipped() {
        let source = fixed("posts", vec!["https://example.com/posts/a"]);
        let options = options().with_disabled(["posts"]);
        assert!(safe_collect(&source, &options).await.is_empty());
        assert_eq!(safe_collect(&source, &options.forced()).await.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_locs_dropped_with_warning() {
        let source = fixed(
            "pages",
            vec![
                "https://example.com/about",
                "/relative/path",
                "",
                "mailto:hi@example.com",
            ],
        );
        let collected = safe_collect(&source, &options()).await;
        assert_eq!(collected.len(), 1);
        assert_eq!(collected.entries[0].source.as_deref(), Some("pages"));
        assert_eq!(collected.warnings.len(), 3);
    }

    struct SelfStamped;

    #[async_trait]
    impl Source for SelfStamped {
        fn source_name(&self) -> &str {
            "posts"
        }

        fn is_enabled(&self) -> bool {
            true
        }

        async fn collect(&self, _options: &CollectOptions) -> Result<Vec<UrlEntry>> {
            Ok(vec![
                UrlEntry::new("https://example.com/blog/a").with_source("blog"),
                UrlEntry::new("https://example.com/blog/b"),
            ])
        }
    }

    #[tokio::test]
    async fn test_entries_stamped_with_producing_source() {
        let collected = safe_collect(&SelfStamped, &options()).await;
        let stamps: Vec<_> = collected
            .entries
            .iter()
            .map(|e| e.source.as_deref())
            .collect();
        assert_eq!(stamps, vec![Some("posts"), Some("posts")]);
    }

    #[tokio::test]
    async fn test_registry_rejects_duplicates() {
        let mut registry = SourceRegistry::new();
        registry.register(Arc::new(fixed("pages", vec![]))).unwrap();
        assert!(registry.register(Arc::new(fixed("pages", vec![]))).is_err());
        assert!(registry.register(Arc::new(fixed("no way", vec![]))).is_err());
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_collect_all_isolates_failures() {
        let registry = SourceRegistry::new()
            .with(Arc::new(fixed("pages", vec!["https://example.com/a"])))
            .unwrap()
            .with(Arc::new(ErrorSource))
            .unwrap()
            .with(Arc::new(fixed("posts", vec!["https://example.com/b"])))
            .unwrap();

        let collected = registry.collect_all(&options()).await;
        let locs: Vec<_> = collected.entries.iter().map(|e| e.loc.as_str()).collect();
        assert_eq!(locs, vec!["https://example.com/a", "https://example.com/b"]);
        assert_eq!(collected.warnings.len(), 1);
    }

    #[test]
    fn test_dedup_keeps_first() {
        let entries = vec![
            UrlEntry::new("https://example.com/a").with_title("first"),
            UrlEntry::new("https://example.com/b"),
            UrlEntry::new("https://example.com/a").with_title("second"),
        ];
        let deduped = dedup_by_loc(entries);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].title.as_deref(), Some("first"));
    }
}
