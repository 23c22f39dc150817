//! # smap-core
//!
//! Core functionality for smap - a pluggable, multilingual XML sitemap engine.
//!
//! The engine aggregates URL listings from registered content sources,
//! resolves route patterns against the host application's router,
//! deduplicates entries, groups translations into hreflang alternates and
//! emits sitemaps.org documents, splitting into an index plus parts when a
//! site outgrows a single file.
//!
//! ## Architecture
//!
//! - **Entries**: [`UrlEntry`] and its protocol-legal serialization
//! - **Routes**: router discovery, route classification and auth-protection detection
//! - **Sources**: the [`Source`] protocol and failure-isolating [`SourceRegistry`]
//! - **Generator**: collection, fan-out per language, XML/HTML rendering
//! - **Cache**: the explicit [`SitemapCache`] service generated output lives in
//! - **Job**: [`RegenerationJob`], the single writer of cached and on-disk output
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use smap_core::{
//!     ContentRecord, ContentSource, EngineConfig, Generator, GenerateOptions, RouteResolver,
//!     SitemapCache, SourceRegistry, StaticContentProvider,
//! };
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> smap_core::Result<()> {
//! let config = EngineConfig::from_toml(r#"
//!     [site]
//!     base_url = "https://example.com"
//! "#)?;
//!
//! let posts = ContentSource::new(
//!     "posts",
//!     "post",
//!     StaticContentProvider::new(vec![ContentRecord::new("1", "hello-world")]),
//!     RouteResolver::unavailable(),
//! );
//! let sources = SourceRegistry::new().with(Arc::new(posts))?;
//!
//! let generator = Generator::new(config, sources, SitemapCache::open());
//! let output = generator.generate_xml(GenerateOptions::default()).await?;
//! assert!(output.document().contains("<loc>https://example.com/posts/hello-world</loc>"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Source and router failures never abort generation; they degrade to empty
//! contributions and [`SourceWarning`]s. The only hard stop is a missing base
//! URL:
//!
//! ```rust
//! use smap_core::{EngineConfig, Error};
//!
//! let config = EngineConfig::default();
//! match config.base_url() {
//!     Err(Error::MissingBaseUrl) => eprintln!("configure site.base_url first"),
//!     Err(e) if e.is_recoverable() => eprintln!("Recoverable error: {e}"),
//!     Err(e) => eprintln!("Fatal error: {e}"),
//!     Ok(url) => println!("Generating for {url}"),
//! }
//! ```

/// Invalidate-on-write store for generated output
pub mod cache;
/// Engine configuration
pub mod config;
/// Sitemap entries and their XML serialization
pub mod entry;
/// Error types and result aliases
pub mod error;
/// Collection, hreflang grouping and document rendering
pub mod generator;
/// Regeneration job and completion events
pub mod job;
/// Enabled languages and URL language segments
pub mod language;
/// Host-router introspection
pub mod routes;
/// The source protocol and registry
pub mod source;
/// Atomic output-directory writes
pub mod storage;

// Re-export commonly used types
pub use cache::{CacheKey, CacheStatsSummary, CacheValue, SitemapCache};
pub use config::{EngineConfig, GeneratorSettings, RouterSettings, SiteSettings, SourceSettings};
pub use entry::{Alternate, ChangeFrequency, DEFAULT_PRIORITY, IntoLastmod, Priority, UrlEntry};
pub use error::{Error, Result};
pub use generator::{
    GenerateOptions, GenerationReport, Generator, HtmlLayout, SitemapOutput, SitemapPart,
    SourceSitemap, SourceSitemapSet,
};
pub use job::{GenerationEvent, GenerationSummary, OutputMode, RegenerationJob};
pub use language::{Language, LanguageSettings};
pub use routes::{
    Endpoint, RouteDescriptor, RouteMetadata, RouteResolver, RouteTable, RouterRegistry,
    StaticRouteTable,
};
pub use source::{
    CollectOptions, Collected, ContentProvider, ContentRecord, ContentSource, GroupedSource,
    Source, SourceFailure, SourceRegistry, SourceWarning, StaticContentProvider,
    StaticRoutesSource, SubSitemap, safe_collect,
};
pub use storage::SitemapWriter;
