//! Built-in source over published content records.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::{CollectOptions, GroupedSource, Source, SubSitemap};
use crate::Result;
use crate::entry::{ChangeFrequency, Priority, UrlEntry};
use crate::routes::{RouteResolver, build_path};

/// Group name for records with no category.
const UNCATEGORIZED: &str = "uncategorized";

/// A published content record as exposed by the host's content store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRecord {
    /// Stable identifier.
    pub id: String,
    /// URL slug.
    pub slug: String,
    /// Display title.
    #[serde(default)]
    pub title: Option<String>,
    /// Last modification time.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    /// Hide this record from sitemaps.
    #[serde(default)]
    pub exclude_from_sitemap: bool,
    /// Language of this translation. `None` means the record is served in
    /// every enabled language.
    #[serde(default)]
    pub language: Option<String>,
    /// Display category; also the grouping key for sub-sitemaps.
    #[serde(default)]
    pub category: Option<String>,
}

impl ContentRecord {
    /// A record with only an id and slug.
    pub fn new(id: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            slug: slug.into(),
            title: None,
            updated_at: None,
            exclude_from_sitemap: false,
            language: None,
            category: None,
        }
    }

    /// Set the title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the update time.
    #[must_use]
    pub const fn with_updated_at(mut self, updated_at: DateTime<Utc>) -> Self {
        self.updated_at = Some(updated_at);
        self
    }

    /// Mark as belonging to one language.
    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Set the category.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Hide from sitemaps.
    #[must_use]
    pub const fn excluded(mut self) -> Self {
        self.exclude_from_sitemap = true;
        self
    }

    fn served_in(&self, language: &str) -> bool {
        self.language
            .as_deref()
            .is_none_or(|l| l.eq_ignore_ascii_case(language))
    }
}

/// Read access to a store of published content.
#[async_trait]
pub trait ContentProvider: Send + Sync {
    /// All published records, every language.
    async fn published(&self) -> Result<Vec<ContentRecord>>;
}

/// A provider over a fixed list of records.
#[derive(Debug, Clone, Default)]
pub struct StaticContentProvider {
    records: Vec<ContentRecord>,
}

impl StaticContentProvider {
    /// Wrap a list of records.
    pub const fn new(records: Vec<ContentRecord>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl ContentProvider for StaticContentProvider {
    async fn published(&self) -> Result<Vec<ContentRecord>> {
        Ok(self.records.clone())
    }
}

/// Turns published records of one content type into sitemap entries.
///
/// The URL pattern comes from the host router (`/blog/:slug`); when the
/// router has none, paths are built as `/{path_prefix}/{slug}`.
pub struct ContentSource<P> {
    name: String,
    content_type: String,
    path_prefix: String,
    provider: P,
    resolver: RouteResolver,
    enabled: bool,
    changefreq: Option<ChangeFrequency>,
    priority: Option<Priority>,
    group_by_category: bool,
}

impl<P> std::fmt::Debug for ContentSource<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentSource")
            .field("name", &self.name)
            .field("content_type", &self.content_type)
            .field("path_prefix", &self.path_prefix)
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

impl<P: ContentProvider> ContentSource<P> {
    /// Create a source named `name` for records of `content_type`.
    ///
    /// The fallback path prefix defaults to the source name.
    pub fn new(
        name: impl Into<String>,
        content_type: impl Into<String>,
        provider: P,
        resolver: RouteResolver,
    ) -> Self {
        let name = name.into();
        Self {
            path_prefix: name.clone(),
            name,
            content_type: content_type.into(),
            provider,
            resolver,
            enabled: true,
            changefreq: None,
            priority: None,
            group_by_category: false,
        }
    }

    /// Prefix used when the router has no pattern for this content type.
    #[must_use]
    pub fn with_path_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.path_prefix = prefix.into().trim_matches('/').to_string();
        self
    }

    /// Feature toggle combined with any per-source override.
    #[must_use]
    pub const fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Change frequency for every entry; invalid tokens are ignored.
    #[must_use]
    pub fn with_changefreq(mut self, changefreq: &str) -> Self {
        self.changefreq = changefreq.parse().ok();
        self
    }

    /// Priority for every entry.
    #[must_use]
    pub fn with_priority(mut self, priority: impl Into<Priority>) -> Self {
        self.priority = Some(priority.into());
        self
    }

    /// Split per-source sitemaps by record category.
    #[must_use]
    pub const fn with_category_groups(mut self, enabled: bool) -> Self {
        self.group_by_category = enabled;
        self
    }

    fn record_path(&self, pattern: Option<&str>, record: &ContentRecord) -> String {
        pattern
            .and_then(|p| build_path(p, &[("slug", record.slug.as_str()), ("id", record.id.as_str())]))
            .unwrap_or_else(|| {
                let slug = record.slug.trim_matches('/');
                if self.path_prefix.is_empty() {
                    format!("/{slug}")
                } else {
                    format!("/{}/{slug}", self.path_prefix)
                }
            })
    }

    fn to_entry(&self, record: ContentRecord, path: String, options: &CollectOptions) -> UrlEntry {
        let mut entry = UrlEntry::new(options.absolute_url(&path))
            .with_source(self.name.clone())
            .with_canonical_path(path);
        entry.lastmod = record.updated_at;
        entry.changefreq = self.changefreq;
        entry.priority = self.priority;
        entry.title = record.title;
        entry.category = record.category;
        entry
    }
}

#[async_trait]
impl<P: ContentProvider> Source for ContentSource<P> {
    fn source_name(&self) -> &str {
        &self.name
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[instrument(skip_all, fields(source = %self.name, language = %options.language_code()))]
    async fn collect(&self, options: &CollectOptions) -> Result<Vec<UrlEntry>> {
        let pattern = self.resolver.find_content_route(&self.content_type);
        if pattern.is_none() {
            debug!(prefix = %self.path_prefix, "No content route found, using path prefix");
        }

        let language = options.language_code();
        let records = self.provider.published().await?;
        let entries = records
            .into_iter()
            .filter(|r| !r.exclude_from_sitemap && r.served_in(language))
            .map(|record| {
                let path = self.record_path(pattern.as_deref(), &record);
                self.to_entry(record, path, options)
            })
            .collect::<Vec<_>>();

        debug!(count = entries.len(), "Collected content entries");
        Ok(entries)
    }

    fn grouped(&self) -> Option<&dyn GroupedSource> {
        if self.group_by_category {
            Some(self)
        } else {
            None
        }
    }
}

#[async_trait]
impl<P: ContentProvider> GroupedSource for ContentSource<P> {
    async fn sub_sitemaps(&self, options: &CollectOptions) -> Result<Option<Vec<SubSitemap>>> {
        if !self.group_by_category {
            return Ok(None);
        }

        let mut groups: BTreeMap<String, Vec<UrlEntry>> = BTreeMap::new();
        for entry in self.collect(options).await? {
            let group = entry
                .category
                .as_deref()
                .map(group_slug)
                .filter(|g| !g.is_empty())
                .unwrap_or_else(|| UNCATEGORIZED.to_string());
            groups.entry(group).or_default().push(entry);
        }

        Ok(Some(
            groups
                .into_iter()
                .map(|(group, entries)| SubSitemap::new(group, entries))
                .collect(),
        ))
    }
}

/// Lowercase, with every run of non-alphanumerics collapsed to `-`.
fn group_slug(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_string()
}
