//! Command implementations for the smap CLI
//!
//! Each command lives in its own submodule.

mod generate;
mod html;
mod part;
mod routes;
mod schedule;

pub use generate::execute as generate;
pub use html::execute as render_html;
pub use part::execute as show_part;
pub use routes::execute as list_routes;
pub use schedule::execute as schedule;

use std::path::PathBuf;

use anyhow::Result;
use smap_core::{
    EngineConfig, Generator, OutputMode, RegenerationJob, SitemapCache, SitemapWriter,
};

use crate::fixture::SiteFixture;

/// Build a generator over the fixture's sources.
pub fn build_generator(config: EngineConfig, site: &SiteFixture) -> Result<Generator> {
    let resolver = site.resolver(&config);
    let sources = site.sources(&resolver)?;
    Ok(Generator::new(config, sources, SitemapCache::open()))
}

/// Build a regeneration job; `output` overrides the configured directory.
pub fn build_job(
    config: EngineConfig,
    site: &SiteFixture,
    mode: OutputMode,
    output: Option<PathBuf>,
) -> Result<RegenerationJob> {
    let index_filename = config.generator.index_filename.clone();
    let job = RegenerationJob::new(build_generator(config, site)?).with_mode(mode);
    Ok(match output {
        Some(dir) => job.with_writer(SitemapWriter::new(dir, index_filename)),
        None => job,
    })
}
