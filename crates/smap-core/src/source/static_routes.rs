//! Built-in source over the router's public index routes.

use async_trait::async_trait;
use tracing::debug;

use super::{CollectOptions, Source};
use crate::Result;
use crate::entry::{ChangeFrequency, Priority, UrlEntry};
use crate::routes::RouteResolver;

/// Emits one entry per public, parameterless GET route (`/`, `/about`).
#[derive(Debug, Clone)]
pub struct StaticRoutesSource {
    name: String,
    resolver: RouteResolver,
    enabled: bool,
    exclude: Vec<String>,
    changefreq: Option<ChangeFrequency>,
    priority: Option<Priority>,
}

impl StaticRoutesSource {
    /// Source name used when none is given.
    pub const DEFAULT_NAME: &'static str = "pages";

    /// Create a source reading routes through `resolver`.
    pub fn new(resolver: RouteResolver) -> Self {
        Self {
            name: Self::DEFAULT_NAME.to_string(),
            resolver,
            enabled: true,
            exclude: Vec::new(),
            changefreq: None,
            priority: None,
        }
    }

    /// Override the source name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Feature toggle combined with any per-source override.
    #[must_use]
    pub const fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Skip paths starting with any of these prefixes (`/api`, `/dev`).
    #[must_use]
    pub fn with_excluded_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude = prefixes.into_iter().map(Into::into).collect();
        self
    }

    /// Change frequency for every entry.
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

    fn is_excluded(&self, path: &str) -> bool {
        self.exclude.iter().any(|prefix| {
            path == prefix
                || path
                    .strip_prefix(prefix.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }
}

#[async_trait]
impl Source for StaticRoutesSource {
    fn source_name(&self) -> &str {
        &self.name
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    async fn collect(&self, options: &CollectOptions) -> Result<Vec<UrlEntry>> {
        let entries: Vec<UrlEntry> = self
            .resolver
            .public_index_routes()
            .into_iter()
            .filter(|path| !self.is_excluded(path))
            .map(|path| {
                let mut entry = UrlEntry::new(options.absolute_url(&path))
                    .with_source(self.name.clone())
                    .with_canonical_path(path);
                entry.changefreq = self.changefreq;
                entry.priority = self.priority;
                entry
            })
            .collect();
        debug!(source = %self.name, count = entries.len(), "Collected static routes");
        Ok(entries)
    }
}
