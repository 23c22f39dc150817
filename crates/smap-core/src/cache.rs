//! Invalidate-on-write store for generated sitemap output.
//!
//! [`SitemapCache`] is an explicit service instance: it is opened once at
//! process start, handed to the [`Generator`](crate::Generator) and any
//! readers, and closed on shutdown. Cloning is cheap and every clone shares
//! the same table.
//!
//! There is a single writer role (the regeneration job) and any number of
//! readers. Writes replace whole values, so readers never observe a
//! half-written document; they eventually see the newest `put`.
//!
//! ```rust
//! use smap_core::cache::{CacheKey, CacheValue, SitemapCache};
//!
//! # async fn example() -> smap_core::Result<()> {
//! let cache = SitemapCache::open();
//! cache.put(CacheKey::Xml, CacheValue::Xml("<urlset/>".into())).await?;
//! assert!(cache.has(&CacheKey::Xml).await);
//!
//! cache.invalidate().await;
//! assert!(cache.get(&CacheKey::Xml).await.is_none());
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::RwLock;
use tracing::debug;

use crate::generator::{HtmlLayout, SitemapPart, SourceSitemapSet};
use crate::{Error, Result};

/// Symbolic names under which generated output is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// The main document: a `<urlset>` or, when split, the `<sitemapindex>`.
    Xml,
    /// The numbered parts of a split sitemap.
    Parts,
    /// Per-source sitemap files plus their index.
    SourceSitemaps,
    /// A rendered HTML sitemap in the given layout.
    Html(HtmlLayout),
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Xml => f.write_str("sitemap:xml"),
            Self::Parts => f.write_str("sitemap:parts"),
            Self::SourceSitemaps => f.write_str("sitemap:sources"),
            Self::Html(layout) => write!(f, "sitemap:html:{layout}"),
        }
    }
}

/// A cached value. Large payloads are shared behind `Arc`.
#[derive(Debug, Clone)]
pub enum CacheValue {
    /// A serialized XML document.
    Xml(String),
    /// Parts of a split sitemap, ordered by index.
    Parts(Arc<Vec<SitemapPart>>),
    /// Per-source sitemap files and their index.
    SourceSitemaps(Arc<SourceSitemapSet>),
    /// A rendered HTML document.
    Html(String),
}

impl CacheValue {
    /// The text payload, for `Xml` and `Html` values.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Xml(s) | Self::Html(s) => Some(s),
            Self::Parts(_) | Self::SourceSitemaps(_) => None,
        }
    }

    /// The parts payload, for `Parts` values.
    pub fn as_parts(&self) -> Option<&Arc<Vec<SitemapPart>>> {
        match self {
            Self::Parts(parts) => Some(parts),
            _ => None,
        }
    }
}

/// Counters describing cache usage.
#[derive(Debug, Default)]
struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    puts: AtomicU64,
    invalidations: AtomicU64,
}

/// Point-in-time snapshot of cache counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStatsSummary {
    /// Lookups that found a value.
    pub hits: u64,
    /// Lookups that found nothing.
    pub misses: u64,
    /// Successful writes.
    pub puts: u64,
    /// Calls to [`SitemapCache::invalidate`].
    pub invalidations: u64,
    /// Entries currently stored.
    pub entries: usize,
}

struct CacheInner {
    /// `None` while closed.
    table: RwLock<Option<HashMap<CacheKey, CacheValue>>>,
    stats: CacheStats,
}

/// Process-wide store for generated sitemap output.
#[derive(Clone)]
pub struct SitemapCache {
    inner: Arc<CacheInner>,
}

impl fmt::Debug for SitemapCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SitemapCache").finish_non_exhaustive()
    }
}

impl Default for SitemapCache {
    fn default() -> Self {
        Self::open()
    }
}

impl SitemapCache {
    /// Open a new, empty cache.
    pub fn open() -> Self {
        Self {
            inner: Arc::new(CacheInner {
                table: RwLock::new(Some(HashMap::new())),
                stats: CacheStats::default(),
            }),
        }
    }

    /// Ensure the backing table exists. Idempotent; reopens a closed cache.
    pub async fn init(&self) {
        let mut table = self.inner.table.write().await;
        if table.is_none() {
            debug!("Initializing sitemap cache table");
            *table = Some(HashMap::new());
        }
    }

    /// Drop the backing table. Reads return `None` and writes fail until
    /// [`init`](Self::init) is called again.
    pub async fn close(&self) {
        let mut table = self.inner.table.write().await;
        *table = None;
        debug!("Closed sitemap cache");
    }

    /// Whether the cache is currently open.
    pub async fn is_open(&self) -> bool {
        self.inner.table.read().await.is_some()
    }

    /// Look up a value.
    pub async fn get(&self, key: &CacheKey) -> Option<CacheValue> {
        let value = {
            let table = self.inner.table.read().await;
            table.as_ref().and_then(|t| t.get(key).cloned())
        };

        let counter = if value.is_some() {
            &self.inner.stats.hits
        } else {
            &self.inner.stats.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        value
    }

    /// Store a value, replacing any previous one.
    pub async fn put(&self, key: CacheKey, value: CacheValue) -> Result<()> {
        let mut table = self.inner.table.write().await;
        let table = table
            .as_mut()
            .ok_or_else(|| Error::Storage("sitemap cache is closed".to_string()))?;
        table.insert(key, value);
        self.inner.stats.puts.fetch_add(1, Ordering::Relaxed);
        debug!(%key, "Cached sitemap output");
        Ok(())
    }

    /// Whether a value is stored under `key`.
    pub async fn has(&self, key: &CacheKey) -> bool {
        let table = self.inner.table.read().await;
        table.as_ref().is_some_and(|t| t.contains_key(key))
    }

    /// Remove a single key. Returns `true` if something was removed.
    pub async fn delete(&self, key: &CacheKey) -> bool {
        let mut table = self.inner.table.write().await;
        table.as_mut().is_some_and(|t| t.remove(key).is_some())
    }

    /// Purge every stored key in one call. Returns the number removed.
    ///
    /// This is the only path by which stale output leaves the cache.
    pub async fn invalidate(&self) -> usize {
        let removed = {
            let mut table = self.inner.table.write().await;
            table.as_mut().map_or(0, |t| {
                let n = t.len();
                t.clear();
                n
            })
        };
        self.inner.stats.invalidations.fetch_add(1, Ordering::Relaxed);
        debug!(removed, "Invalidated sitemap cache");
        removed
    }

    /// Snapshot usage counters.
    pub async fn stats(&self) -> CacheStatsSummary {
        let entries = self
            .inner
            .table
            .read()
            .await
            .as_ref()
            .map_or(0, HashMap::len);
        let stats = &self.inner.stats;
        CacheStatsSummary {
            hits: stats.hits.load(Ordering::Relaxed),
            misses: stats.misses.load(Ordering::Relaxed),
            puts: stats.puts.load(Ordering::Relaxed),
            invalidations: stats.invalidations.load(Ordering::Relaxed),
            entries,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_has_delete() {
        let cache = SitemapCache::open();
        assert!(!cache.has(&CacheKey::Xml).await);

        cache
            .put(CacheKey::Xml, CacheValue::Xml("<urlset/>".to_string()))
            .await
            .unwrap();
        assert!(cache.has(&CacheKey::Xml).await);
        let value = cache.get(&CacheKey::Xml).await.unwrap();
        assert_eq!(value.as_text(), Some("<urlset/>"));

        assert!(cache.delete(&CacheKey::Xml).await);
        assert!(!cache.delete(&CacheKey::Xml).await);
        assert!(cache.get(&CacheKey::Xml).await.is_none());
    }

    #[tokio::test]
    async fn test_put_replaces_whole_value() {
        let cache = SitemapCache::open();
        cache
            .put(CacheKey::Xml, CacheValue::Xml("old".to_string()))
            .await
            .unwrap();
        cache
            .put(CacheKey::Xml, CacheValue::Xml("new".to_string()))
            .await
            .unwrap();
        let value = cache.get(&CacheKey::Xml).await.unwrap();
        assert_eq!(value.as_text(), Some("new"));
    }

    #[tokio::test]
    async fn test_invalidate_clears_every_key() {
        let cache = SitemapCache::open();
        cache
            .put(CacheKey::Xml, CacheValue::Xml("x".to_string()))
            .await
            .unwrap();
        cache
            .put(CacheKey::Parts, CacheValue::Parts(Arc::new(Vec::new())))
            .await
            .unwrap();
        cache
            .put(
                CacheKey::Html(HtmlLayout::Flat),
                CacheValue::Html("<ul></ul>".to_string()),
            )
            .await
            .unwrap();

        assert_eq!(cache.invalidate().await, 3);
        assert!(!cache.has(&CacheKey::Xml).await);
        assert!(!cache.has(&CacheKey::Parts).await);
        assert!(!cache.has(&CacheKey::Html(HtmlLayout::Flat)).await);
        assert_eq!(cache.stats().await.invalidations, 1);
    }

    #[tokio::test]
    async fn test_clones_share_table() {
        let writer = SitemapCache::open();
        let reader = writer.clone();
        writer
            .put(CacheKey::Xml, CacheValue::Xml("shared".to_string()))
            .await
            .unwrap();
        assert!(reader.has(&CacheKey::Xml).await);
    }

    #[tokio::test]
    async fn test_close_and_reinit() {
        let cache = SitemapCache::open();
        cache
            .put(CacheKey::Xml, CacheValue::Xml("x".to_string()))
            .await
            .unwrap();

        cache.close().await;
        assert!(!cache.is_open().await);
        assert!(cache.get(&CacheKey::Xml).await.is_none());
        assert!(
            cache
                .put(CacheKey::Xml, CacheValue::Xml("y".to_string()))
                .await
                .is_err()
        );

        cache.init().await;
        cache.init().await;
        assert!(cache.is_open().await);
        assert!(!cache.has(&CacheKey::Xml).await);
    }

    #[tokio::test]
    async fn test_stats_track_hits_and_misses() {
        let cache = SitemapCache::open();
        let _ = cache.get(&CacheKey::Xml).await;
        cache
            .put(CacheKey::Xml, CacheValue::Xml("x".to_string()))
            .await
            .unwrap();
        let _ = cache.get(&CacheKey::Xml).await;

        let stats = cache.stats().await;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.puts, 1);
        assert_eq!(stats.entries, 1);
    }

    #[test]
    fn test_key_names() {
        assert_eq!(CacheKey::Xml.to_string(), "sitemap:xml");
        assert_eq!(
            CacheKey::Html(HtmlLayout::Grouped).to_string(),
            "sitemap:html:grouped"
        );
    }
}
