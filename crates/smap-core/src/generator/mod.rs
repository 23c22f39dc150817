//! Sitemap generation: collect, deduplicate, group translations and render.
//!
//! The [`Generator`] owns no state beyond its configuration; generated output
//! lives in the [`SitemapCache`] it was given.
//!
//! ```rust,no_run
//! use smap_core::{EngineConfig, Generator, GenerateOptions, SitemapCache, SourceRegistry};
//!
//! # async fn example() -> smap_core::Result<()> {
//! let config = EngineConfig::from_toml(r#"
//!     [site]
//!     base_url = "https://example.com"
//! "#)?;
//! let generator = Generator::new(config, SourceRegistry::new(), SitemapCache::open());
//! let output = generator.generate_xml(GenerateOptions::default()).await?;
//! println!("{}", output.document());
//! # Ok(())
//! # }
//! ```

mod collect;
mod hreflang;
mod html;
mod xml;

pub use collect::language_concurrency;
pub use hreflang::{X_DEFAULT, attach_alternates};
pub use html::{HtmlLayout, render_html};
pub use xml::{
    ParsedDocument, STYLESHEETS, SitemapPart, SitemapRef, XML_DECLARATION, max_lastmod,
    parse_document, part_filename, render_sitemap_index, render_urlset, split_into_parts,
    stylesheet_href, stylesheet_instruction,
};

use std::collections::{HashMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::cache::{CacheKey, CacheValue, SitemapCache};
use crate::config::EngineConfig;
use crate::entry::UrlEntry;
use crate::source::{
    CollectOptions, Collected, Source, SourceRegistry, SourceWarning, SubSitemap,
    is_valid_source_name,
};
use crate::Result;

/// Per-call generation switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerateOptions {
    /// Ignore cached output and recollect. The fresh result is still cached.
    pub skip_cache: bool,
}

impl GenerateOptions {
    /// Options that bypass the cache read.
    pub const fn fresh() -> Self {
        Self { skip_cache: true }
    }
}

/// The main sitemap: a single `<urlset>` or an index plus numbered parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SitemapOutput {
    /// Everything fits in one document.
    Single(String),
    /// A `<sitemapindex>` and the parts it references.
    Index {
        /// The index document.
        index: String,
        /// Parts, ordered by index.
        parts: Arc<Vec<SitemapPart>>,
    },
}

impl SitemapOutput {
    /// The document served at the main sitemap location.
    pub fn document(&self) -> &str {
        match self {
            Self::Single(xml) | Self::Index { index: xml, .. } => xml,
        }
    }

    /// Parts, empty for single-document output.
    pub fn parts(&self) -> &[SitemapPart] {
        match self {
            Self::Single(_) => &[],
            Self::Index { parts, .. } => parts,
        }
    }

    /// Whether the output was split.
    pub const fn is_index(&self) -> bool {
        matches!(self, Self::Index { .. })
    }

    /// Part by 1-based index.
    pub fn part(&self, index: usize) -> Option<&SitemapPart> {
        index
            .checked_sub(1)
            .and_then(|i| self.parts().get(i))
    }
}

/// One per-source (or per-group) sitemap file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceSitemap {
    /// Producing source.
    pub source: String,
    /// Group name for sources that split their output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    /// File name (`sitemap-posts.xml`, `sitemap-posts-news.xml`).
    pub filename: String,
    /// Absolute URL of the file.
    pub loc: String,
    /// Newest entry lastmod, or generation time.
    pub lastmod: DateTime<Utc>,
    /// Serialized `<urlset>`.
    pub body: String,
    /// Entries in the file.
    pub url_count: usize,
}

/// Per-source sitemaps plus the index referencing them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSitemapSet {
    /// `<sitemapindex>` over every file.
    pub index: String,
    /// Files in source registration order.
    pub sitemaps: Vec<SourceSitemap>,
}

/// Output of a full regeneration plus what was learned collecting it.
#[derive(Debug, Clone)]
pub struct GenerationReport<T> {
    /// The generated output.
    pub output: T,
    /// Distinct URLs after deduplication.
    pub url_count: usize,
    /// Non-fatal problems raised by sources.
    pub warnings: Vec<SourceWarning>,
}

/// Orchestrates collection and rendering.
#[derive(Debug, Clone)]
pub struct Generator {
    config: Arc<EngineConfig>,
    sources: SourceRegistry,
    cache: SitemapCache,
}

impl Generator {
    /// Create a generator over registered sources and a cache service.
    pub fn new(config: EngineConfig, sources: SourceRegistry, cache: SitemapCache) -> Self {
        Self {
            config: Arc::new(config),
            sources,
            cache,
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Registered sources.
    pub const fn sources(&self) -> &SourceRegistry {
        &self.sources
    }

    /// The cache service output is written to.
    pub const fn cache(&self) -> &SitemapCache {
        &self.cache
    }

    fn stylesheet(&self, base_url: &str) -> Option<String> {
        stylesheet_href(self.config.generator.style.as_deref(), base_url)
    }

    fn max_urls(&self) -> usize {
        self.config.generator.max_urls_per_file.max(1)
    }

    fn use_cache(&self, options: GenerateOptions) -> bool {
        self.config.generator.cache_enabled && !options.skip_cache
    }

    fn collect_options(&self) -> Result<CollectOptions> {
        let base_url = self.config.base_url()?;
        let disabled = self
            .sources
            .names()
            .filter(|name| !self.config.source_enabled(name))
            .map(String::from)
            .collect::<Vec<_>>();
        Ok(CollectOptions::new(base_url, self.config.languages.clone()).with_disabled(disabled))
    }

    async fn store(&self, key: CacheKey, value: CacheValue) {
        if !self.config.generator.cache_enabled {
            return;
        }
        if let Err(e) = self.cache.put(key, value).await {
            warn!(%key, error = %e, "Failed to cache sitemap output");
        }
    }

    /// Collect every enabled source: deduplicated by `loc`, sorted by `loc`,
    /// with hreflang alternates on multilingual sites.
    ///
    /// Fails only when no base URL is configured.
    #[instrument(skip(self))]
    pub async fn collect_entries(&self) -> Result<Collected> {
        let options = self.collect_options()?;
        let collected =
            collect::collect_entries(&self.sources, &options, self.config.generator.task_timeout())
                .await;
        for warning in &collected.warnings {
            debug!(%warning, "Source warning");
        }
        Ok(collected)
    }

    /// Build (or fetch from cache) the main XML sitemap.
    #[instrument(skip(self))]
    pub async fn generate_xml(&self, options: GenerateOptions) -> Result<SitemapOutput> {
        if self.use_cache(options) {
            if let Some(output) = self.cached_xml().await {
                debug!("Serving sitemap from cache");
                return Ok(output);
            }
        }
        Ok(self.regenerate_xml().await?.output)
    }

    /// Recollect and rebuild the main XML sitemap, replacing cached output.
    pub async fn regenerate_xml(&self) -> Result<GenerationReport<SitemapOutput>> {
        let collected = self.collect_entries().await?;
        let base_url = self.config.base_url()?;
        let output = self.render_output(&collected.entries, &base_url);

        match &output {
            SitemapOutput::Single(xml) => {
                self.cache.delete(&CacheKey::Parts).await;
                self.store(CacheKey::Xml, CacheValue::Xml(xml.clone())).await;
            },
            SitemapOutput::Index { index, parts } => {
                self.store(CacheKey::Parts, CacheValue::Parts(Arc::clone(parts)))
                    .await;
                self.store(CacheKey::Xml, CacheValue::Xml(index.clone())).await;
            },
        }

        info!(
            urls = collected.entries.len(),
            parts = output.parts().len(),
            warnings = collected.warnings.len(),
            "Generated sitemap"
        );
        Ok(GenerationReport {
            output,
            url_count: collected.entries.len(),
            warnings: collected.warnings,
        })
    }

    fn render_output(&self, entries: &[UrlEntry], base_url: &str) -> SitemapOutput {
        let max = self.max_urls();
        let stylesheet = self.stylesheet(base_url);
        if entries.len() <= max {
            return SitemapOutput::Single(render_urlset(entries, stylesheet.as_deref()));
        }

        let parts = split_into_parts(entries, max, base_url, stylesheet.as_deref(), Utc::now());
        let index = render_sitemap_index(&xml::part_refs(&parts), stylesheet.as_deref());
        debug!(parts = parts.len(), max, "Split sitemap into parts");
        SitemapOutput::Index {
            index,
            parts: Arc::new(parts),
        }
    }

    async fn cached_xml(&self) -> Option<SitemapOutput> {
        let xml = self.cache.get(&CacheKey::Xml).await?;
        let xml = xml.as_text()?.to_string();
        match self.cache.get(&CacheKey::Parts).await {
            Some(CacheValue::Parts(parts)) => Some(SitemapOutput::Index { index: xml, parts }),
            _ => Some(SitemapOutput::Single(xml)),
        }
    }

    /// A part of a split sitemap by 1-based index.
    ///
    /// Reads the cache first and generates on a miss. Returns `None` when the
    /// sitemap is not split or `index` is out of range.
    pub async fn get_part(&self, index: usize) -> Result<Option<SitemapPart>> {
        if self.config.generator.cache_enabled {
            if let Some(value) = self.cache.get(&CacheKey::Parts).await {
                if let Some(parts) = value.as_parts() {
                    return Ok(index.checked_sub(1).and_then(|i| parts.get(i)).cloned());
                }
            }
        }
        let output = self.generate_xml(GenerateOptions::default()).await?;
        Ok(output.part(index).cloned())
    }

    /// Build (or fetch from cache) an HTML sitemap.
    #[instrument(skip(self))]
    pub async fn generate_html(&self, layout: HtmlLayout, options: GenerateOptions) -> Result<String> {
        let key = CacheKey::Html(layout);
        if self.use_cache(options) {
            if let Some(html) = self.cache.get(&key).await.and_then(|v| v.as_text().map(String::from)) {
                return Ok(html);
            }
        }

        let collected = self.collect_entries().await?;
        let lang = self.config.languages.default_base_code();
        let html = render_html(&collected.entries, layout, &lang);
        self.store(key, CacheValue::Html(html.clone())).await;
        Ok(html)
    }

    /// Build (or fetch from cache) one sitemap per source plus an index.
    ///
    /// Sources with the grouping capability get one file per group. Entries
    /// are assigned to the source that produced them after site-wide
    /// deduplication.
    #[instrument(skip(self))]
    pub async fn generate_source_index(
        &self,
        options: GenerateOptions,
    ) -> Result<Arc<SourceSitemapSet>> {
        if self.use_cache(options) {
            if let Some(CacheValue::SourceSitemaps(set)) =
                self.cache.get(&CacheKey::SourceSitemaps).await
            {
                return Ok(set);
            }
        }
        Ok(self.regenerate_source_index().await?.output)
    }

    /// Recollect and rebuild per-source sitemaps, replacing cached output.
    pub async fn regenerate_source_index(&self) -> Result<GenerationReport<Arc<SourceSitemapSet>>> {
        let collect_options = self.collect_options()?;
        let collected = self.collect_entries().await?;
        let url_count = collected.entries.len();
        let mut warnings = collected.warnings;
        let base_url = collect_options.base_url.clone();
        let stylesheet = self.stylesheet(&base_url);
        let files = FileContext {
            base_url: &base_url,
            stylesheet: stylesheet.as_deref(),
            max_urls: self.max_urls(),
            now: Utc::now(),
        };

        let mut by_source: HashMap<String, Vec<UrlEntry>> = HashMap::new();
        for entry in collected.entries {
            let source = entry.source.clone().unwrap_or_default();
            by_source.entry(source).or_default().push(entry);
        }

        let mut sitemaps = Vec::new();
        for source in self.sources.iter() {
            let entries = by_source.remove(source.source_name()).unwrap_or_default();
            if entries.is_empty() {
                continue;
            }
            let name = source.source_name();
            let stem = source.sitemap_filename();
            match self
                .source_groups(source.as_ref(), &collect_options, &entries, &mut warnings)
                .await
            {
                Some(groups) => {
                    let grouped: HashSet<&str> = groups
                        .iter()
                        .flat_map(|g| g.entries.iter().map(|e| e.loc.as_str()))
                        .collect();
                    let ungrouped: Vec<UrlEntry> = entries
                        .iter()
                        .filter(|e| !grouped.contains(e.loc.as_str()))
                        .cloned()
                        .collect();
                    if !ungrouped.is_empty() {
                        sitemaps.extend(files.build(name, None, &stem, &ungrouped));
                    }
                    for group in &groups {
                        let group_stem = format!("{stem}-{}", group.group);
                        sitemaps.extend(files.build(name, Some(&group.group), &group_stem, &group.entries));
                    }
                },
                None => sitemaps.extend(files.build(name, None, &stem, &entries)),
            }
        }
        rename_colliding_files(&mut sitemaps, &base_url, &mut warnings);

        let refs: Vec<SitemapRef> = sitemaps
            .iter()
            .map(|s| SitemapRef {
                loc: s.loc.clone(),
                lastmod: Some(s.lastmod),
            })
            .collect();
        let set = Arc::new(SourceSitemapSet {
            index: render_sitemap_index(&refs, stylesheet.as_deref()),
            sitemaps,
        });
        self.store(CacheKey::SourceSitemaps, CacheValue::SourceSitemaps(Arc::clone(&set)))
            .await;
        info!(files = set.sitemaps.len(), urls = url_count, "Generated per-source sitemaps");
        Ok(GenerationReport {
            output: set,
            url_count,
            warnings,
        })
    }

    /// Groups for a source with the grouping capability, aligned with the
    /// finalized entries so alternates and deduplication carry over.
    ///
    /// Each language's `sub_sitemaps` call runs under the task timeout. Any
    /// error, panic or timeout falls back to a single file for the source.
    async fn source_groups(
        &self,
        source: &dyn Source,
        options: &CollectOptions,
        finalized: &[UrlEntry],
        warnings: &mut Vec<SourceWarning>,
    ) -> Option<Vec<SubSitemap>> {
        let grouped = source.grouped()?;
        let name = source.source_name();
        let task_timeout = self.config.generator.task_timeout();

        let languages: Vec<CollectOptions> = if options.languages.is_multilingual() {
            options
                .languages
                .enabled
                .iter()
                .map(|l| options.for_language(l))
                .collect()
        } else {
            vec![options.clone()]
        };

        let results: Vec<std::result::Result<Option<Vec<SubSitemap>>, String>> =
            stream::iter(languages.iter())
                .map(|opts| async move {
                    let call = AssertUnwindSafe(grouped.sub_sitemaps(opts)).catch_unwind();
                    match tokio::time::timeout(task_timeout, call).await {
                        Ok(Ok(Ok(groups))) => Ok(groups),
                        Ok(Ok(Err(e))) => Err(format!("sub_sitemaps failed: {e}")),
                        Ok(Err(_)) => Err("sub_sitemaps panicked".to_string()),
                        Err(_) => Err(format!("sub_sitemaps timed out after {task_timeout:?}")),
                    }
                })
                .buffered(language_concurrency())
                .collect()
                .await;

        let mut merged: Vec<SubSitemap> = Vec::new();
        for result in results {
            let groups = match result {
                Ok(Some(groups)) => groups,
                Ok(None) => return None,
                Err(message) => {
                    warn!(source = %name, %message, "Writing a single file for grouped source");
                    warnings.push(SourceWarning::new(
                        name,
                        format!("{message}, writing a single file"),
                    ));
                    return None;
                },
            };
            for group in groups {
                if !is_valid_source_name(&group.group) {
                    warn!(source = %name, group = %group.group, "Skipping sub-sitemap with invalid name");
                    continue;
                }
                match merged.iter_mut().find(|g| g.group == group.group) {
                    Some(existing) => existing.entries.extend(group.entries),
                    None => merged.push(group),
                }
            }
        }

        let by_loc: HashMap<&str, &UrlEntry> = finalized.iter().map(|e| (e.loc.as_str(), e)).collect();
        for group in &mut merged {
            let mut seen = HashSet::new();
            let mut entries: Vec<UrlEntry> = group
                .entries
                .iter()
                .filter_map(|e| by_loc.get(e.loc.as_str()).map(|f| (*f).clone()))
                .filter(|e| seen.insert(e.loc.clone()))
                .collect();
            entries.sort_by(|a, b| a.loc.cmp(&b.loc));
            group.entries = entries;
        }
        merged.retain(|g| !g.entries.is_empty());
        merged.sort_by(|a, b| a.group.cmp(&b.group));
        Some(merged)
    }

    /// Purge all cached output.
    pub async fn invalidate(&self) -> usize {
        self.cache.invalidate().await
    }
}

/// Shared settings for rendering per-source files.
struct FileContext<'a> {
    base_url: &'a str,
    stylesheet: Option<&'a str>,
    max_urls: usize,
    now: DateTime<Utc>,
}

impl FileContext<'_> {
    /// One file per chunk of at most `max_urls` entries; chunks get a
    /// `-{n}` suffix when there is more than one.
    fn build(&self, source: &str, group: Option<&str>, stem: &str, entries: &[UrlEntry]) -> Vec<SourceSitemap> {
        let chunks: Vec<&[UrlEntry]> = entries.chunks(self.max_urls).collect();
        let split = chunks.len() > 1;
        chunks
            .into_iter()
            .enumerate()
            .map(|(i, chunk)| {
                let filename = if split {
                    format!("{stem}-{}.xml", i + 1)
                } else {
                    format!("{stem}.xml")
                };
                SourceSitemap {
                    source: source.to_string(),
                    group: group.map(String::from),
                    loc: format!("{}/{filename}", self.base_url),
                    filename,
                    lastmod: max_lastmod(chunk).unwrap_or(self.now),
                    body: render_urlset(chunk, self.stylesheet),
                    url_count: chunk.len(),
                }
            })
            .collect()
    }
}

/// Give every file a distinct name.
///
/// A file whose name was already taken by an earlier one is renamed to
/// `{stem}-{k}.xml`, skipping every name any file was originally given.
fn rename_colliding_files(
    sitemaps: &mut [SourceSitemap],
    base_url: &str,
    warnings: &mut Vec<SourceWarning>,
) {
    let original: HashSet<String> = sitemaps.iter().map(|s| s.filename.clone()).collect();
    let mut taken: HashSet<String> = HashSet::with_capacity(sitemaps.len());
    for sitemap in sitemaps.iter_mut() {
        if taken.insert(sitemap.filename.clone()) {
            continue;
        }
        let stem = sitemap
            .filename
            .strip_suffix(".xml")
            .unwrap_or(&sitemap.filename)
            .to_string();
        let mut k = 2;
        let renamed = loop {
            let candidate = format!("{stem}-{k}.xml");
            if !original.contains(&candidate) && !taken.contains(&candidate) {
                break candidate;
            }
            k += 1;
        };
        warn!(
            source = %sitemap.source,
            from = %sitemap.filename,
            to = %renamed,
            "Sitemap file name already in use, renaming"
        );
        warnings.push(SourceWarning::new(
            sitemap.source.clone(),
            format!("file name {} already in use, wrote {renamed}", sitemap.filename),
        ));
        taken.insert(renamed.clone());
        sitemap.loc = format!("{base_url}/{renamed}");
        sitemap.filename = renamed;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::Error;
    use crate::language::{Language, LanguageSettings};
    use crate::source::Source;

    struct Pages {
        name: &'static str,
        count: usize,
    }

    #[async_trait]
    impl Source for Pages {
        fn source_name(&self) -> &str {
            self.name
        }

        fn is_enabled(&self) -> bool {
            true
        }

        async fn collect(&self, options: &CollectOptions) -> Result<Vec<UrlEntry>> {
            Ok((0..self.count)
                .map(|i| {
                    let path = format!("/{}/{i:03}", self.name);
                    UrlEntry::new(options.absolute_url(&path))
                        .with_canonical_path(path)
                        .with_category(if i % 2 == 0 { "even" } else { "odd" })
                })
                .collect())
        }
    }

    struct Categorized;

    #[async_trait]
    impl Source for Categorized {
        fn source_name(&self) -> &str {
            "posts"
        }

        fn is_enabled(&self) -> bool {
            true
        }

        async fn collect(&self, options: &CollectOptions) -> Result<Vec<UrlEntry>> {
            Pages { name: "posts", count: 4 }.collect(options).await
        }

        fn grouped(&self) -> Option<&dyn crate::source::GroupedSource> {
            Some(self)
        }
    }

    #[async_trait]
    impl crate::source::GroupedSource for Categorized {
        async fn sub_sitemaps(&self, options: &CollectOptions) -> Result<Option<Vec<SubSitemap>>> {
            let entries = self.collect(options).await?;
            let (even, odd): (Vec<_>, Vec<_>) = entries
                .into_iter()
                .partition(|e| e.category.as_deref() == Some("even"));
            Ok(Some(vec![SubSitemap::new("even", even), SubSitemap::new("odd", odd)]))
        }
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

        async fn collect(&self, options: &CollectOptions) -> Result<Vec<UrlEntry>> {
            Ok(vec![
                UrlEntry::new(options.absolute_url("/blog/a")).with_source("blog"),
                UrlEntry::new(options.absolute_url("/blog/b")),
            ])
        }
    }

    struct SlowGroups;

    #[async_trait]
    impl Source for SlowGroups {
        fn source_name(&self) -> &str {
            "slow"
        }

        fn is_enabled(&self) -> bool {
            true
        }

        async fn collect(&self, options: &CollectOptions) -> Result<Vec<UrlEntry>> {
            Pages { name: "slow", count: 3 }.collect(options).await
        }

        fn grouped(&self) -> Option<&dyn crate::source::GroupedSource> {
            Some(self)
        }
    }

    #[async_trait]
    impl crate::source::GroupedSource for SlowGroups {
        async fn sub_sitemaps(&self, _options: &CollectOptions) -> Result<Option<Vec<SubSitemap>>> {
            tokio::time::sleep(std::time::Duration::from_secs(30)).await;
            Ok(None)
        }
    }

    fn files_total(set: &SourceSitemapSet) -> usize {
        set.sitemaps.iter().map(|s| s.url_count).sum()
    }

    fn config(max_urls: usize) -> EngineConfig {
        let mut config = EngineConfig::default();
        config.site.base_url = Some("https://example.com".to_string());
        config.generator.max_urls_per_file = max_urls;
        config
    }

    fn generator(config: EngineConfig, sources: Vec<Arc<dyn Source>>) -> Generator {
        let mut registry = SourceRegistry::new();
        for source in sources {
            registry.register(source).unwrap();
        }
        Generator::new(config, registry, SitemapCache::open())
    }

    #[tokio::test]
    async fn test_missing_base_url_is_hard_stop() {
        let gen_ = generator(EngineConfig::default(), vec![Arc::new(Pages { name: "a", count: 1 })]);
        let err = gen_.generate_xml(GenerateOptions::default()).await.unwrap_err();
        assert!(matches!(err, Error::MissingBaseUrl));
        assert!(gen_.collect_entries().await.is_err());
    }

    #[tokio::test]
    async fn test_single_document_is_cached() {
        let gen_ = generator(config(100), vec![Arc::new(Pages { name: "a", count: 3 })]);
        let output = gen_.generate_xml(GenerateOptions::default()).await.unwrap();
        assert!(!output.is_index());
        assert_eq!(output.document().matches("<url>").count(), 3);
        assert!(gen_.cache().has(&CacheKey::Xml).await);
        assert!(!gen_.cache().has(&CacheKey::Parts).await);

        let again = gen_.generate_xml(GenerateOptions::default()).await.unwrap();
        assert_eq!(again, output);
        assert!(gen_.cache().stats().await.hits >= 1);
    }

    #[tokio::test]
    async fn test_split_output_and_parts() {
        let gen_ = generator(config(2), vec![Arc::new(Pages { name: "a", count: 5 })]);
        let output = gen_.generate_xml(GenerateOptions::default()).await.unwrap();
        assert!(output.is_index());
        assert_eq!(output.parts().len(), 3);
        assert!(output.document().contains("<sitemapindex"));
        assert!(output.document().contains("https://example.com/sitemap-3.xml"));

        let part = gen_.get_part(3).await.unwrap().unwrap();
        assert_eq!(part.url_count, 1);
        assert!(gen_.get_part(0).await.unwrap().is_none());
        assert!(gen_.get_part(4).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_skip_cache_recollects() {
        let gen_ = generator(config(100), vec![Arc::new(Pages { name: "a", count: 1 })]);
        gen_.cache()
            .put(CacheKey::Xml, CacheValue::Xml("stale".to_string()))
            .await
            .unwrap();
        let cached = gen_.generate_xml(GenerateOptions::default()).await.unwrap();
        assert_eq!(cached.document(), "stale");
        let fresh = gen_.generate_xml(GenerateOptions::fresh()).await.unwrap();
        assert!(fresh.document().contains("<urlset"));
    }

    #[tokio::test]
    async fn test_html_uses_same_entries() {
        let gen_ = generator(
            config(100),
            vec![
                Arc::new(Pages { name: "a", count: 2 }),
                Arc::new(Pages { name: "b", count: 2 }),
            ],
        );
        let html = gen_.generate_html(HtmlLayout::Flat, GenerateOptions::default()).await.unwrap();
        assert_eq!(html.matches("<li>").count(), 4);
        assert!(gen_.cache().has(&CacheKey::Html(HtmlLayout::Flat)).await);
    }

    #[tokio::test]
    async fn test_source_index_with_groups() {
        let gen_ = generator(
            config(100),
            vec![Arc::new(Pages { name: "pages", count: 2 }), Arc::new(Categorized)],
        );
        let set = gen_.generate_source_index(GenerateOptions::default()).await.unwrap();
        let names: Vec<_> = set.sitemaps.iter().map(|s| s.filename.as_str()).collect();
        assert_eq!(
            names,
            vec!["sitemap-pages.xml", "sitemap-posts-even.xml", "sitemap-posts-odd.xml"]
        );
        assert_eq!(set.sitemaps[1].url_count, 2);
        assert_eq!(set.sitemaps[1].group.as_deref(), Some("even"));
        assert!(set.index.contains("https://example.com/sitemap-posts-odd.xml"));
    }

    #[tokio::test]
    async fn test_source_index_multilingual_carries_alternates() {
        let mut config = config(100);
        config.languages =
            LanguageSettings::multilingual([Language::new("en"), Language::new("et")]);
        let gen_ = generator(config, vec![Arc::new(Categorized)]);

        let set = gen_.generate_source_index(GenerateOptions::default()).await.unwrap();
        let even = &set.sitemaps[0];
        assert_eq!(even.filename, "sitemap-posts-even.xml");
        assert_eq!(even.url_count, 4);
        assert!(even.body.contains(r#"hreflang="x-default""#));
    }

    #[tokio::test]
    async fn test_source_index_ignores_source_set_stamps() {
        let gen_ = generator(config(100), vec![Arc::new(SelfStamped)]);
        let report = gen_.regenerate_source_index().await.unwrap();
        assert_eq!(report.url_count, 2);
        assert_eq!(files_total(&report.output), 2);
        assert_eq!(report.output.sitemaps[0].filename, "sitemap-posts.xml");
    }

    #[tokio::test]
    async fn test_slow_sub_sitemaps_fall_back_to_single_file() {
        let mut config = config(100);
        config.generator.task_timeout_secs = 1;
        let gen_ = generator(config, vec![Arc::new(SlowGroups)]);

        let report = tokio::time::timeout(
            std::time::Duration::from_secs(10),
            gen_.regenerate_source_index(),
        )
        .await
        .expect("per-source generation should not hang")
        .unwrap();

        let names: Vec<_> = report.output.sitemaps.iter().map(|s| s.filename.as_str()).collect();
        assert_eq!(names, vec!["sitemap-slow.xml"]);
        assert_eq!(files_total(&report.output), 3);
        assert!(report
            .warnings
            .iter()
            .any(|w| w.source == "slow" && w.message.contains("timed out")));
    }

    #[tokio::test]
    async fn test_colliding_file_names_are_renamed() {
        let gen_ = generator(
            config(100),
            vec![Arc::new(Categorized), Arc::new(Pages { name: "posts-even", count: 2 })],
        );
        let report = gen_.regenerate_source_index().await.unwrap();
        let set = &report.output;

        let names: Vec<_> = set.sitemaps.iter().map(|s| s.filename.as_str()).collect();
        assert_eq!(
            names,
            vec!["sitemap-posts-even.xml", "sitemap-posts-odd.xml", "sitemap-posts-even-2.xml"]
        );
        assert_eq!(set.sitemaps[2].source, "posts-even");
        assert_eq!(set.sitemaps[2].loc, "https://example.com/sitemap-posts-even-2.xml");
        assert_eq!(files_total(set), report.url_count);
        assert_eq!(set.index.matches("<loc>").count(), 3);
        assert!(report.warnings.iter().any(|w| w.source == "posts-even"));
    }

    #[test]
    fn test_renamed_file_avoids_other_original_names() {
        let file = |source: &str, filename: &str| SourceSitemap {
            source: source.to_string(),
            group: None,
            filename: filename.to_string(),
            loc: format!("https://example.com/{filename}"),
            lastmod: Utc::now(),
            body: String::new(),
            url_count: 1,
        };
        let mut sitemaps = vec![
            file("posts", "sitemap-posts-1.xml"),
            file("posts", "sitemap-posts-1-2.xml"),
            file("posts", "sitemap-posts-1.xml"),
        ];
        let mut warnings = Vec::new();
        rename_colliding_files(&mut sitemaps, "https://example.com", &mut warnings);

        assert_eq!(sitemaps[2].filename, "sitemap-posts-1-3.xml");
        assert_eq!(sitemaps[1].filename, "sitemap-posts-1-2.xml");
        assert_eq!(warnings.len(), 1);
    }

    #[tokio::test]
    async fn test_stylesheet_follows_url_prefix() {
        let mut config = config(100);
        config.site.url_prefix = "shop".to_string();
        config.generator.style = Some("table".to_string());
        let gen_ = generator(config, vec![Arc::new(Pages { name: "a", count: 1 })]);

        let output = gen_.generate_xml(GenerateOptions::default()).await.unwrap();
        assert!(output
            .document()
            .contains(r#"href="https://example.com/shop/sitemaps/table.xsl""#));
    }

    #[test]
    fn test_output_part_lookup() {
        let output = SitemapOutput::Single("<urlset/>".to_string());
        assert!(output.part(1).is_none());
        assert!(output.parts().is_empty());
    }
}
