//! Generate command implementation

use std::path::PathBuf;

use anyhow::Result;
use smap_core::{EngineConfig, GenerateOptions, GenerationSummary, OutputMode};

use super::build_job;
use crate::fixture::SiteFixture;
use crate::output::OutputFormat;

/// Execute the generate command
pub async fn execute(
    config: EngineConfig,
    site: &SiteFixture,
    mode: OutputMode,
    output: Option<PathBuf>,
    print: bool,
    format: OutputFormat,
) -> Result<()> {
    let job = build_job(config, site, mode, output)?;
    let summary = job.run().await?;

    if print {
        // The run just filled the cache, so this does not recollect.
        let document = match mode {
            OutputMode::Combined => job
                .generator()
                .generate_xml(GenerateOptions::default())
                .await?
                .document()
                .to_string(),
            OutputMode::PerSource => job
                .generator()
                .generate_source_index(GenerateOptions::default())
                .await?
                .index
                .clone(),
        };
        print!("{document}");
        for warning in &summary.warnings {
            eprintln!("warning: {warning}");
        }
        return Ok(());
    }

    match format {
        OutputFormat::Text => print_text(&summary),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
    }
    Ok(())
}

fn print_text(summary: &GenerationSummary) {
    println!(
        "Generated {} URLs in {} ({} ms)",
        summary.url_count,
        describe_files(summary.file_count),
        summary.duration_ms
    );
    for path in &summary.written {
        println!("  wrote {}", path.display());
    }
    if !summary.warnings.is_empty() {
        println!("{} warning(s):", summary.warnings.len());
        for warning in &summary.warnings {
            println!("  {warning}");
        }
    }
}

fn describe_files(count: usize) -> String {
    match count {
        0 => "a single sitemap".to_string(),
        1 => "1 file".to_string(),
        n => format!("{n} files"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_files() {
        assert_eq!(describe_files(0), "a single sitemap");
        assert_eq!(describe_files(1), "1 file");
        assert_eq!(describe_files(3), "3 files");
    }
}
