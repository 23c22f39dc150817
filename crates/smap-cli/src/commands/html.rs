//! HTML command implementation

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use smap_core::{EngineConfig, GenerateOptions, HtmlLayout};

use super::build_generator;
use crate::fixture::SiteFixture;

/// Execute the html command
pub async fn execute(
    config: EngineConfig,
    site: &SiteFixture,
    layout: HtmlLayout,
    output: Option<&Path>,
) -> Result<()> {
    let generator = build_generator(config, site)?;
    let html = generator
        .generate_html(layout, GenerateOptions::fresh())
        .await?;

    match output {
        Some(path) => {
            fs::write(path, &html)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Wrote {layout} HTML sitemap to {}", path.display());
        },
        None => print!("{html}"),
    }
    Ok(())
}
