//! # CLI Structure and Argument Parsing
//!
//! This module defines the command-line interface for `smap`. The CLI is
//! built using `clap` with derive macros.
//!
//! ## Usage Patterns
//!
//! ```bash
//! # Write sitemap.xml (and parts) for the site described by a fixture
//! smap --fixture site.json generate --output public/
//!
//! # One sitemap per source
//! smap --fixture site.json generate --mode per-source --output public/
//!
//! # HTML sitemap
//! smap --fixture site.json html --layout grouped
//!
//! # Inspect what the router exposes
//! smap --fixture site.json routes --filter '^/blog'
//!
//! # Regenerate every 10 minutes
//! smap --fixture site.json schedule --interval 600 --output public/
//! ```
//!
//! ## Configuration
//!
//! Settings come from `--config` (or `SMAP_CONFIG`), else the platform config
//! directory. `--base-url` overrides `site.base_url`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use smap_core::{HtmlLayout, OutputMode};

use crate::output::OutputFormat;

/// Main CLI structure for the `smap` command
#[derive(Parser, Clone, Debug)]
#[command(name = "smap")]
#[command(version)]
#[command(about = "smap - Pluggable, multilingual XML sitemap generation", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging output
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Suppress informational messages (only show errors)
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    /// Show debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Path to configuration file (overrides autodiscovery). Also via `SMAP_CONFIG`.
    #[arg(long, global = true, value_name = "FILE", env = "SMAP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Site base URL (overrides `site.base_url`)
    #[arg(long, global = true, value_name = "URL")]
    pub base_url: Option<String>,

    /// JSON file describing the site's routes and published content
    #[arg(long, global = true, value_name = "FILE")]
    pub fixture: Option<PathBuf>,
}

/// Available subcommands
#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Regenerate sitemaps once
    Generate {
        /// Combined sitemap or one sitemap per source
        #[arg(long, value_enum, default_value = "combined")]
        mode: ModeArg,

        /// Directory to write sitemap files into (defaults to `generator.output_dir`)
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        /// Print the main document to stdout
        #[arg(long)]
        print: bool,

        /// Output format for the run summary
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Render an HTML sitemap
    Html {
        /// Link arrangement: flat, grouped or hierarchical
        #[arg(short, long, default_value = "flat")]
        layout: HtmlLayout,

        /// Write to this file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Print one part of a split sitemap
    Part {
        /// 1-based part number
        index: usize,
    },

    /// List router routes and their protection status
    Routes {
        /// Only show routes whose path matches this regular expression
        #[arg(long, value_name = "REGEX")]
        filter: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Regenerate on a fixed interval
    Schedule {
        /// Seconds between runs
        #[arg(long, default_value_t = 3600, value_parser = clap::value_parser!(u64).range(1..))]
        interval: u64,

        /// Stop after this many runs (runs until Ctrl-C when omitted)
        #[arg(long)]
        runs: Option<u32>,

        /// Combined sitemap or one sitemap per source
        #[arg(long, value_enum, default_value = "combined")]
        mode: ModeArg,

        /// Directory to write sitemap files into (defaults to `generator.output_dir`)
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,
    },
}

/// `--mode` values
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModeArg {
    /// One sitemap (or index plus parts) over every source
    Combined,
    /// One sitemap per source plus an index
    PerSource,
}

impl From<ModeArg> for OutputMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Combined => Self::Combined,
            ModeArg::PerSource => Self::PerSource,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_generate_flags() {
        let cli = Cli::try_parse_from([
            "smap",
            "--base-url",
            "https://example.com",
            "generate",
            "--mode",
            "per-source",
            "--output",
            "public",
        ])
        .unwrap();
        match cli.command {
            Commands::Generate { mode, output, .. } => {
                assert_eq!(mode, ModeArg::PerSource);
                assert_eq!(output, Some(PathBuf::from("public")));
            },
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parses_html_layout() {
        let cli = Cli::try_parse_from(["smap", "html", "--layout", "tree"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Html {
                layout: HtmlLayout::Hierarchical,
                ..
            }
        ));
        assert!(Cli::try_parse_from(["smap", "html", "--layout", "cards"]).is_err());
    }

    #[test]
    fn test_schedule_rejects_zero_interval() {
        assert!(Cli::try_parse_from(["smap", "schedule", "--interval", "0"]).is_err());
    }
}
