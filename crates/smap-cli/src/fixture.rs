//! Site fixtures: a host application's routes and published content as JSON.
//!
//! ```json
//! {
//!   "router": "ShopWeb.Router",
//!   "routes": [
//!     { "verb": "GET", "path": "/", "handler": "PageController.home" },
//!     { "verb": "GET", "path": "/blog/:slug", "handler": "PostController.show" }
//!   ],
//!   "pages": { "exclude": ["/dev"] },
//!   "sources": [
//!     {
//!       "name": "posts",
//!       "contentType": "post",
//!       "records": [{ "id": "1", "slug": "hello", "updatedAt": "2024-05-01T00:00:00Z" }]
//!     }
//!   ]
//! }
//! ```

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Deserialize;
use smap_core::{
    ContentRecord, ContentSource, EngineConfig, RouteDescriptor, RouteResolver, RouterRegistry,
    SourceRegistry, StaticContentProvider, StaticRouteTable, StaticRoutesSource,
};

/// Router name used when the fixture does not give one.
pub const DEFAULT_ROUTER_NAME: &str = "App.Router";

/// Everything the engine needs to know about a site.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SiteFixture {
    /// Name the route table is registered under.
    #[serde(default = "default_router_name")]
    pub router: String,
    /// The host router's route table.
    #[serde(default)]
    pub routes: Vec<RouteDescriptor>,
    /// Settings for the built-in static pages source.
    #[serde(default)]
    pub pages: PagesFixture,
    /// Content sources in registration order.
    #[serde(default)]
    pub sources: Vec<SourceFixture>,
}

/// Static pages source settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PagesFixture {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub changefreq: Option<String>,
    #[serde(default)]
    pub priority: Option<f64>,
}

/// One content source and its published records.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SourceFixture {
    pub name: String,
    /// Entity name matched against route paths; defaults to the source name.
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub path_prefix: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub group_by_category: bool,
    #[serde(default)]
    pub changefreq: Option<String>,
    #[serde(default)]
    pub priority: Option<f64>,
    #[serde(default)]
    pub records: Vec<ContentRecord>,
}

const fn default_true() -> bool {
    true
}

fn default_router_name() -> String {
    DEFAULT_ROUTER_NAME.to_string()
}

impl Default for SiteFixture {
    fn default() -> Self {
        Self {
            router: default_router_name(),
            routes: Vec::new(),
            pages: PagesFixture::default(),
            sources: Vec::new(),
        }
    }
}

impl Default for PagesFixture {
    fn default() -> Self {
        Self {
            enabled: true,
            exclude: Vec::new(),
            changefreq: None,
            priority: None,
        }
    }
}

impl SiteFixture {
    /// Read a fixture file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read fixture {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid fixture {}", path.display()))
    }

    /// Parse fixture JSON.
    pub fn parse(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// A resolver over the fixture's route table.
    ///
    /// The table is registered under the fixture's router name, which is also
    /// used as the configured router unless the config names one.
    pub fn resolver(&self, config: &EngineConfig) -> RouteResolver {
        let mut registry = RouterRegistry::new();
        let mut settings = config.router.clone();
        if !self.routes.is_empty() {
            registry.register(
                self.router.clone(),
                Arc::new(StaticRouteTable::new(self.routes.clone())),
            );
            if settings.router.is_none() {
                settings.router = Some(self.router.clone());
            }
        }
        RouteResolver::new(settings, registry)
    }

    /// Register the static pages source and every content source.
    pub fn sources(&self, resolver: &RouteResolver) -> Result<SourceRegistry> {
        let mut registry = SourceRegistry::new();

        let mut pages = StaticRoutesSource::new(resolver.clone())
            .with_enabled(self.pages.enabled)
            .with_excluded_prefixes(self.pages.exclude.iter().cloned());
        if let Some(changefreq) = &self.pages.changefreq {
            pages = pages.with_changefreq(changefreq);
        }
        if let Some(priority) = self.pages.priority {
            pages = pages.with_priority(priority);
        }
        registry.register(Arc::new(pages))?;

        for source in &self.sources {
            let content_type = source.content_type.as_deref().unwrap_or(&source.name);
            let mut content = ContentSource::new(
                source.name.clone(),
                content_type,
                StaticContentProvider::new(source.records.clone()),
                resolver.clone(),
            )
            .with_enabled(source.enabled)
            .with_category_groups(source.group_by_category);
            if let Some(prefix) = &source.path_prefix {
                content = content.with_path_prefix(prefix.clone());
            }
            if let Some(changefreq) = &source.changefreq {
                content = content.with_changefreq(changefreq);
            }
            if let Some(priority) = source.priority {
                content = content.with_priority(priority);
            }
            registry
                .register(Arc::new(content))
                .with_context(|| format!("Cannot register source '{}'", source.name))?;
        }

        Ok(registry)
    }
}
