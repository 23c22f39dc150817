//! Schedule command implementation

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use smap_core::{EngineConfig, GenerationEvent, OutputMode};
use tokio::time::{self, MissedTickBehavior};
use tracing::{info, warn};

use super::build_job;
use crate::fixture::SiteFixture;

/// Execute the schedule command
///
/// The first run starts immediately. A failed run is reported and the
/// schedule continues; Ctrl-C stops it.
pub async fn execute(
    config: EngineConfig,
    site: &SiteFixture,
    interval_secs: u64,
    runs: Option<u32>,
    mode: OutputMode,
    output: Option<PathBuf>,
) -> Result<()> {
    let job = build_job(config, site, mode, output)?;
    let mut events = job.subscribe();

    let mut interval = time::interval(Duration::from_secs(interval_secs));
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut completed = 0u32;
    loop {
        tokio::select! {
            _ = interval.tick() => {},
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping schedule");
                break;
            },
        }

        if let Err(e) = job.run().await {
            warn!(error = %e, "Scheduled regeneration failed");
        }
        while let Ok(event) = events.try_recv() {
            report(&event);
        }

        completed += 1;
        if runs.is_some_and(|limit| completed >= limit) {
            break;
        }
    }
    Ok(())
}

fn report(event: &GenerationEvent) {
    match event {
        GenerationEvent::Completed(summary) => println!(
            "[{}] {} URLs, {} files, {} warning(s)",
            summary.finished_at.format("%Y-%m-%d %H:%M:%S"),
            summary.url_count,
            summary.file_count,
            summary.warnings.len()
        ),
        GenerationEvent::Failed { category, message } => {
            eprintln!("[{category}] {message}");
        },
    }
}
