//! Routes command implementation

use anyhow::{Context, Result};
use regex::Regex;
use serde::Serialize;
use smap_core::EngineConfig;

use crate::fixture::SiteFixture;
use crate::output::OutputFormat;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RouteInfo {
    verb: String,
    path: String,
    handler: String,
    protected: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RoutesReport {
    router: Option<String>,
    routes: Vec<RouteInfo>,
    public_index_routes: Vec<String>,
}

/// Execute the routes command
pub fn execute(
    config: &EngineConfig,
    site: &SiteFixture,
    filter: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let filter = filter
        .map(Regex::new)
        .transpose()
        .context("Invalid --filter expression")?;
    let keep = |path: &str| filter.as_ref().is_none_or(|re| re.is_match(path));

    let resolver = site.resolver(config);
    let report = match (resolver.discover(), resolver.resolve()) {
        (Some((strategy, _)), Some(resolved)) => RoutesReport {
            router: Some(strategy.to_string()),
            routes: resolved
                .classified()
                .filter(|(route, _)| keep(&route.path))
                .map(|(route, protected)| RouteInfo {
                    verb: route.verb.clone(),
                    path: route.path.clone(),
                    handler: route.handler.clone(),
                    protected,
                })
                .collect(),
            public_index_routes: resolved
                .public_index_routes()
                .into_iter()
                .filter(|path| keep(path))
                .collect(),
        },
        _ => RoutesReport {
            router: None,
            routes: Vec::new(),
            public_index_routes: Vec::new(),
        },
    };

    match format {
        OutputFormat::Text => print_text(&report),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}

fn print_text(report: &RoutesReport) {
    let Some(router) = &report.router else {
        println!("No router found. Content paths fall back to source prefixes.");
        return;
    };

    println!("Using {router}");
    let width = report.routes.iter().map(|r| r.path.len()).max().unwrap_or(0);
    for route in &report.routes {
        let flag = if route.protected { "  [protected]" } else { "" };
        println!(
            "  {:<6} {:<width$}  {}{flag}",
            route.verb, route.path, route.handler
        );
    }
    if !report.public_index_routes.is_empty() {
        println!("Public pages: {}", report.public_index_routes.join(", "));
    }
}
