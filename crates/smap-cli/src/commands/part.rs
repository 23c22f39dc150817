//! Part command implementation

use anyhow::{Result, bail};
use smap_core::EngineConfig;

use super::build_generator;
use crate::fixture::SiteFixture;

/// Execute the part command
pub async fn execute(config: EngineConfig, site: &SiteFixture, index: usize) -> Result<()> {
    let generator = build_generator(config, site)?;
    match generator.get_part(index).await? {
        Some(part) => {
            print!("{}", part.body);
            Ok(())
        },
        None => bail!("Sitemap part {index} does not exist"),
    }
}
