//! The source protocol.
//!
//! A [`Source`] enumerates sitemap-worthy URLs for one content domain. Sources
//! are registered with a [`SourceRegistry`] and always invoked through
//! [`safe_collect`], which isolates a failing source from the rest of the run.
//!
//! Sources that split their own output into named groups additionally
//! implement [`GroupedSource`] and return it from [`Source::grouped`].

mod content;
mod registry;
mod static_routes;

pub use content::{ContentProvider, ContentRecord, ContentSource, StaticContentProvider};
pub use registry::{
    Collected, SourceFailure, SourceRegistry, SourceWarning, is_valid_source_name, safe_collect,
    try_collect,
};
pub use static_routes::StaticRoutesSource;

pub(crate) use registry::dedup_by_loc;

use async_trait::async_trait;

use crate::Result;
use crate::entry::UrlEntry;
use crate::language::{Language, LanguageSettings};

/// Per-call collection parameters.
#[derive(Debug, Clone)]
pub struct CollectOptions {
    /// Requested language code. `None` means "the default language".
    pub language: Option<String>,
    /// Whether `language` is the site default.
    pub is_default_language: bool,
    /// Site base URL, prefix applied, no trailing slash.
    pub base_url: String,
    /// All enabled languages.
    pub languages: LanguageSettings,
    /// Collect even if the source reports itself disabled.
    pub force: bool,
    /// Sources switched off by configuration.
    pub disabled: Vec<String>,
}

impl CollectOptions {
    /// Options for a single-language run.
    pub fn new(base_url: impl Into<String>, languages: LanguageSettings) -> Self {
        Self {
            language: None,
            is_default_language: true,
            base_url: base_url.into(),
            languages,
            force: false,
            disabled: Vec::new(),
        }
    }

    /// Switch off sources by name, on top of their own toggles.
    #[must_use]
    pub fn with_disabled<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.disabled = names.into_iter().map(Into::into).collect();
        self
    }

    /// Whether configuration switched `name` off.
    pub fn is_disabled(&self, name: &str) -> bool {
        self.disabled.iter().any(|d| d == name)
    }

    /// Options for collecting one specific language.
    #[must_use]
    pub fn for_language(&self, language: &Language) -> Self {
        Self {
            language: Some(language.code.clone()),
            is_default_language: self.languages.is_default(&language.code),
            ..self.clone()
        }
    }

    /// Bypass `is_enabled` checks.
    #[must_use]
    pub const fn forced(mut self) -> Self {
        self.force = true;
        self
    }

    /// Effective language code.
    pub fn language_code(&self) -> &str {
        self.language
            .as_deref()
            .unwrap_or(self.languages.default.as_str())
    }

    /// URL path prefix for the requested language: empty for the default
    /// language, `/et` otherwise.
    pub fn language_prefix(&self) -> String {
        if self.is_default_language {
            return String::new();
        }
        self.languages
            .url_segment(self.language_code())
            .map(|segment| format!("/{segment}"))
            .unwrap_or_default()
    }

    /// Absolute URL for a site path, language prefix applied.
    pub fn absolute_url(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        let prefix = self.language_prefix();
        if path.is_empty() {
            if prefix.is_empty() {
                format!("{}/", self.base_url)
            } else {
                format!("{}{prefix}", self.base_url)
            }
        } else {
            format!("{}{prefix}/{path}", self.base_url)
        }
    }
}

/// A named group of entries produced by [`GroupedSource::sub_sitemaps`].
#[derive(Debug, Clone, PartialEq)]
pub struct SubSitemap {
    /// Group name, used in the file name (`sitemap-posts-news.xml`).
    pub group: String,
    /// Entries in the group.
    pub entries: Vec<UrlEntry>,
}

impl SubSitemap {
    /// Create a group.
    pub fn new(group: impl Into<String>, entries: Vec<UrlEntry>) -> Self {
        Self {
            group: group.into(),
            entries,
        }
    }
}

/// A pluggable collector of sitemap entries.
#[async_trait]
pub trait Source: Send + Sync {
    /// Stable, URL-safe identifier.
    fn source_name(&self) -> &str;

    /// Whether the source should run. Must not fail.
    fn is_enabled(&self) -> bool;

    /// Enumerate entries for the requested language.
    async fn collect(&self, options: &CollectOptions) -> Result<Vec<UrlEntry>>;

    /// File name stem for per-source sitemaps.
    fn sitemap_filename(&self) -> String {
        format!("sitemap-{}", self.source_name())
    }

    /// The grouping capability, if this source has one.
    fn grouped(&self) -> Option<&dyn GroupedSource> {
        None
    }
}

/// Optional capability: split a source's output into named groups.
#[async_trait]
pub trait GroupedSource: Send + Sync {
    /// Named groups, or `None` to fall back to a single file.
    async fn sub_sitemaps(&self, options: &CollectOptions) -> Result<Option<Vec<SubSitemap>>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> CollectOptions {
        CollectOptions::new(
            "https://example.com",
            LanguageSettings::multilingual([Language::new("en"), Language::new("et")]),
        )
    }

    #[test]
    fn test_default_language_has_no_prefix() {
        let opts = options();
        assert_eq!(opts.language_code(), "en");
        assert_eq!(opts.language_prefix(), "");
        assert_eq!(opts.absolute_url("/blog/hello"), "https://example.com/blog/hello");
        assert_eq!(opts.absolute_url("/"), "https://example.com/");
    }

    #[test]
    fn test_non_default_language_prefix() {
        let opts = options().for_language(&Language::new("et"));
        assert!(!opts.is_default_language);
        assert_eq!(opts.language_prefix(), "/et");
        assert_eq!(opts.absolute_url("blog/tere"), "https://example.com/et/blog/tere");
        assert_eq!(opts.absolute_url("/"), "https://example.com/et");
    }

    #[test]
    fn test_for_default_language_stays_unprefixed() {
        let opts = options().for_language(&Language::new("en"));
        assert!(opts.is_default_language);
        assert_eq!(opts.language_code(), "en");
        assert_eq!(opts.language_prefix(), "");
    }
}
