//! smap CLI - generate XML and HTML sitemaps for a site
//!
//! This is the main entry point for the smap command-line interface.
//! Command implementations live in their own modules under `commands`.

use anyhow::{Context, Result};
use clap::Parser;
use smap_core::EngineConfig;

mod cli;
mod commands;
mod fixture;
mod output;
mod utils;

use cli::{Cli, Commands};
use fixture::SiteFixture;
use utils::initialize_logging;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    initialize_logging(&cli)?;

    let config = load_config(&cli)?;
    let site = match &cli.fixture {
        Some(path) => SiteFixture::load(path)?,
        None => SiteFixture::default(),
    };

    execute_command(cli, config, site).await
}

fn load_config(cli: &Cli) -> Result<EngineConfig> {
    let mut config = match &cli.config {
        Some(path) => EngineConfig::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => EngineConfig::load().context("Failed to load config")?,
    };
    if let Some(base_url) = &cli.base_url {
        config.site.base_url = Some(base_url.clone());
        config.validate()?;
    }
    Ok(config)
}

async fn execute_command(cli: Cli, config: EngineConfig, site: SiteFixture) -> Result<()> {
    match cli.command {
        Commands::Generate {
            mode,
            output,
            print,
            format,
        } => {
            commands::generate(config, &site, mode.into(), output, print, format).await?;
        },

        Commands::Html { layout, output } => {
            commands::render_html(config, &site, layout, output.as_deref()).await?;
        },

        Commands::Part { index } => {
            commands::show_part(config, &site, index).await?;
        },

        Commands::Routes { filter, format } => {
            commands::list_routes(&config, &site, filter.as_deref(), format)?;
        },

        Commands::Schedule {
            interval,
            runs,
            mode,
            output,
        } => {
            commands::schedule(config, &site, interval, runs, mode.into(), output).await?;
        },
    }

    Ok(())
}
