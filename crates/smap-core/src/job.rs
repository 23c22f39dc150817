//! The regeneration job: the single writer of sitemap output.
//!
//! A run invalidates the cache, regenerates, writes files (when an output
//! directory is configured) and publishes a [`GenerationEvent`]. Scheduling
//! and retries belong to whoever calls [`RegenerationJob::run`].

use std::path::PathBuf;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{error, info, instrument};

use crate::Result;
use crate::generator::{GenerateOptions, Generator};
use crate::source::SourceWarning;
use crate::storage::SitemapWriter;

/// Capacity of the event channel; slow subscribers miss older events.
const EVENT_CAPACITY: usize = 16;

/// Which documents a run produces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputMode {
    /// One sitemap (or index plus numbered parts) over every source.
    #[default]
    Combined,
    /// One sitemap per source plus an index.
    PerSource,
}

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationSummary {
    /// Distinct URLs emitted.
    pub url_count: usize,
    /// Sitemap files behind the main document (parts or per-source files).
    pub file_count: usize,
    /// Files written to disk, if an output directory is configured.
    pub written: Vec<PathBuf>,
    /// Cache entries purged before regenerating.
    pub invalidated: usize,
    /// Source warnings, as `source: message`.
    pub warnings: Vec<String>,
    /// Wall-clock duration.
    pub duration_ms: u64,
    /// Completion time.
    pub finished_at: DateTime<Utc>,
}

/// Published after every run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GenerationEvent {
    /// The run finished and output is fresh.
    Completed(GenerationSummary),
    /// The run stopped on a hard error.
    Failed {
        /// Error category (`config`, `storage`, ...).
        category: String,
        /// Error message.
        message: String,
    },
}

/// Regenerates sitemaps on demand.
#[derive(Debug)]
pub struct RegenerationJob {
    generator: Generator,
    writer: Option<SitemapWriter>,
    mode: OutputMode,
    events: broadcast::Sender<GenerationEvent>,
}

impl RegenerationJob {
    /// Create a job; files go to the configured output directory, if any.
    pub fn new(generator: Generator) -> Self {
        let writer = SitemapWriter::from_config(generator.config());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            generator,
            writer,
            mode: OutputMode::default(),
            events,
        }
    }

    /// Write files with an explicit writer.
    #[must_use]
    pub fn with_writer(mut self, writer: SitemapWriter) -> Self {
        self.writer = Some(writer);
        self
    }

    /// Choose combined or per-source output.
    #[must_use]
    pub const fn with_mode(mut self, mode: OutputMode) -> Self {
        self.mode = mode;
        self
    }

    /// The generator this job drives.
    pub const fn generator(&self) -> &Generator {
        &self.generator
    }

    /// Receive an event after every run.
    pub fn subscribe(&self) -> broadcast::Receiver<GenerationEvent> {
        self.events.subscribe()
    }

    /// Invalidate, regenerate, write and notify.
    #[instrument(skip(self), fields(mode = ?self.mode))]
    pub async fn run(&self) -> Result<GenerationSummary> {
        let started = Instant::now();
        let invalidated = self.generator.invalidate().await;

        match self.regenerate(invalidated, started).await {
            Ok(summary) => {
                info!(
                    urls = summary.url_count,
                    files = summary.file_count,
                    duration_ms = summary.duration_ms,
                    "Sitemap regeneration completed"
                );
                // No subscribers is fine.
                let _ = self.events.send(GenerationEvent::Completed(summary.clone()));
                Ok(summary)
            },
            Err(e) => {
                error!(error = %e, "Sitemap regeneration failed");
                let _ = self.events.send(GenerationEvent::Failed {
                    category: e.category().to_string(),
                    message: e.to_string(),
                });
                Err(e)
            },
        }
    }

    async fn regenerate(&self, invalidated: usize, started: Instant) -> Result<GenerationSummary> {
        let (url_count, file_count, written, warnings) = match self.mode {
            OutputMode::Combined => {
                let report = self.generator.regenerate_xml().await?;
                let written = match &self.writer {
                    Some(writer) => writer.write_output(&report.output)?,
                    None => Vec::new(),
                };
                (report.url_count, report.output.parts().len(), written, report.warnings)
            },
            OutputMode::PerSource => {
                let report = self.generator.regenerate_source_index().await?;
                let written = match &self.writer {
                    Some(writer) => writer.write_source_set(&report.output)?,
                    None => Vec::new(),
                };
                (report.url_count, report.output.sitemaps.len(), written, report.warnings)
            },
        };

        Ok(GenerationSummary {
            url_count,
            file_count,
            written,
            invalidated,
            warnings: warnings.iter().map(SourceWarning::to_string).collect(),
            duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            finished_at: Utc::now(),
        })
    }

    /// Request a fresh copy of the main sitemap without writing files.
    pub async fn preview(&self) -> Result<String> {
        let output = self.generator.generate_xml(GenerateOptions::fresh()).await?;
        Ok(output.document().to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use tempfile::TempDir;

    use super::*;
    use crate::cache::{CacheKey, CacheValue, SitemapCache};
    use crate::config::EngineConfig;
    use crate::entry::UrlEntry;
    use crate::source::{CollectOptions, Source, SourceRegistry};

    struct Pages;

    #[async_trait]
    impl Source for Pages {
        fn source_name(&self) -> &str {
            "pages"
        }

        fn is_enabled(&self) -> bool {
            true
        }

        async fn collect(&self, options: &CollectOptions) -> crate::Result<Vec<UrlEntry>> {
            Ok(vec![
                UrlEntry::new(options.absolute_url("/")),
                UrlEntry::new(options.absolute_url("/about")),
                UrlEntry::new(options.absolute_url("/contact")),
            ])
        }
    }

    fn generator(base_url: Option<&str>, max_urls: usize) -> Generator {
        let mut config = EngineConfig::default();
        config.site.base_url = base_url.map(String::from);
        config.generator.max_urls_per_file = max_urls;
        let registry = SourceRegistry::new().with(Arc::new(Pages)).unwrap();
        Generator::new(config, registry, SitemapCache::open())
    }

    #[tokio::test]
    async fn test_run_invalidates_writes_and_notifies() {
        let temp = TempDir::new().unwrap();
        let gen_ = generator(Some("https://example.com"), 2);
        gen_.cache()
            .put(CacheKey::Xml, CacheValue::Xml("stale".to_string()))
            .await
            .unwrap();

        let job = RegenerationJob::new(gen_).with_writer(SitemapWriter::new(temp.path(), "sitemap.xml"));
        let mut events = job.subscribe();

        let summary = job.run().await.unwrap();
        assert_eq!(summary.url_count, 3);
        assert_eq!(summary.file_count, 2);
        assert_eq!(summary.invalidated, 1);
        assert_eq!(summary.written.len(), 3);
        assert!(temp.path().join("sitemap-2.xml").exists());

        match events.recv().await.unwrap() {
            GenerationEvent::Completed(s) => assert_eq!(s, summary),
            other => panic!("Expected completion, got {other:?}"),
        }

        let cached = job.generator().cache().get(&CacheKey::Xml).await.unwrap();
        assert!(cached.as_text().unwrap().contains("<sitemapindex"));
    }

    #[tokio::test]
    async fn test_per_source_mode() {
        let temp = TempDir::new().unwrap();
        let job = RegenerationJob::new(generator(Some("https://example.com"), 100))
            .with_writer(SitemapWriter::new(temp.path(), "sitemap.xml"))
            .with_mode(OutputMode::PerSource);

        let summary = job.run().await.unwrap();
        assert_eq!(summary.file_count, 1);
        assert!(temp.path().join("sitemap-pages.xml").exists());
    }

    #[tokio::test]
    async fn test_missing_base_url_publishes_failure() {
        let job = RegenerationJob::new(generator(None, 100));
        let mut events = job.subscribe();

        assert!(job.run().await.is_err());
        match events.recv().await.unwrap() {
            GenerationEvent::Failed { category, .. } => assert_eq!(category, "config"),
            other => panic!("Expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_preview_does_not_need_writer() {
        let job = RegenerationJob::new(generator(Some("https://example.com"), 100));
        let xml = job.preview().await.unwrap();
        assert_eq!(xml.matches("<url>").count(), 3);
    }
}
