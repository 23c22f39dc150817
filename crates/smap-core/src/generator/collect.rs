//! Entry collection: sequential for single-language sites, one task per
//! language otherwise.

use std::num::NonZeroUsize;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tracing::{debug, instrument, warn};

use super::hreflang::attach_alternates;
use crate::source::{CollectOptions, Collected, SourceRegistry, SourceWarning, dedup_by_loc};

/// Upper bound on concurrent per-language tasks.
pub fn language_concurrency() -> usize {
    let cores = std::thread::available_parallelism().map_or(1, NonZeroUsize::get);
    (cores * 2).max(1)
}

/// Collect, deduplicate and sort entries; multilingual sites also get
/// hreflang alternates.
#[instrument(skip_all, fields(multilingual = options.languages.is_multilingual()))]
pub async fn collect_entries(
    registry: &SourceRegistry,
    options: &CollectOptions,
    task_timeout: Duration,
) -> Collected {
    let collected = if options.languages.is_multilingual() {
        collect_per_language(registry, options, task_timeout).await
    } else {
        registry.collect_all(options).await
    };
    finalize(collected, options)
}

fn finalize(collected: Collected, options: &CollectOptions) -> Collected {
    let Collected { mut entries, warnings } = collected;
    // Stable sort first so grouping and dedup are independent of task order.
    entries.sort_by(|a, b| a.loc.cmp(&b.loc));
    if options.languages.is_multilingual() {
        entries = attach_alternates(entries, &options.languages);
    }
    let entries = dedup_by_loc(entries);
    debug!(entries = entries.len(), warnings = warnings.len(), "Finalized sitemap entries");
    Collected { entries, warnings }
}

async fn collect_per_language(
    registry: &SourceRegistry,
    options: &CollectOptions,
    task_timeout: Duration,
) -> Collected {
    let concurrency = language_concurrency();
    let languages = options.languages.enabled.clone();
    debug!(languages = languages.len(), concurrency, "Fanning out collection per language");

    let results: Vec<Collected> = stream::iter(languages)
        .map(|language| {
            let registry = registry.clone();
            let opts = options.for_language(&language);
            async move {
                let code = language.code;
                let handle = tokio::spawn(async move { registry.collect_all(&opts).await });
                let abort = handle.abort_handle();
                match tokio::time::timeout(task_timeout, handle).await {
                    Ok(Ok(collected)) => collected,
                    Ok(Err(e)) => {
                        warn!(language = %code, error = %e, "Language collection task failed");
                        language_failure(&code, &format!("collection task failed: {e}"))
                    },
                    Err(_) => {
                        abort.abort();
                        warn!(language = %code, timeout = ?task_timeout, "Language collection timed out");
                        language_failure(&code, &format!("collection timed out after {task_timeout:?}"))
                    },
                }
            }
        })
        .buffer_unordered(concurrency)
        .collect()
        .await;

    let mut merged = Collected::default();
    for collected in results {
        merged.merge(collected);
    }
    merged
}

fn language_failure(code: &str, message: &str) -> Collected {
    Collected {
        entries: Vec::new(),
        warnings: vec![SourceWarning::new(format!("language:{code}"), message)],
    }
}
