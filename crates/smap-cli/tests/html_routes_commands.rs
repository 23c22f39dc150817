#![allow(missing_docs)]

mod common;

use anyhow::Result;
use common::{shop_cmd, smap_cmd};
use predicates::prelude::*;
use serde_json::Value;
use tempfile::tempdir;

#[test]
fn html_grouped_layout() -> Result<()> {
    let config_dir = tempdir()?;

    shop_cmd(config_dir.path())
        .args(["html", "--layout", "grouped"])
        .assert()
        .success()
        .stdout(predicate::str::contains("<!DOCTYPE html>"))
        .stdout(predicate::str::contains("<h2>Chairs</h2>"))
        .stdout(predicate::str::contains("<h2>pages</h2>"))
        .stdout(predicate::str::contains(
            r#"<a href="https://shop.example/blog/hello-world">Hello world</a>"#,
        ));
    Ok(())
}

#[test]
fn html_writes_to_file() -> Result<()> {
    let config_dir = tempdir()?;
    let out = tempdir()?;
    let path = out.path().join("sitemap.html");

    shop_cmd(config_dir.path())
        .args(["html", "--layout", "hierarchical", "--output"])
        .arg(&path)
        .assert()
        .success();

    let html = std::fs::read_to_string(&path)?;
    assert!(html.contains("<span>products</span>"));
    Ok(())
}

#[test]
fn html_rejects_unknown_layout() -> Result<()> {
    let config_dir = tempdir()?;

    shop_cmd(config_dir.path())
        .args(["html", "--layout", "cards"])
        .assert()
        .failure();
    Ok(())
}

#[test]
fn routes_lists_protection() -> Result<()> {
    let config_dir = tempdir()?;

    shop_cmd(config_dir.path())
        .arg("routes")
        .assert()
        .success()
        .stdout(predicate::str::contains("configured router ShopWeb.Router"))
        .stdout(predicate::str::is_match(r"/account\s+AccountLive\s+\[protected\]")?)
        .stdout(predicate::str::contains("Public pages: /, /about, /blog"));
    Ok(())
}

#[test]
fn routes_json_with_filter() -> Result<()> {
    let config_dir = tempdir()?;

    let output = shop_cmd(config_dir.path())
        .args(["routes", "--format", "json", "--filter", "^/(blog|admin)"])
        .output()?;
    assert!(output.status.success());

    let report: Value = serde_json::from_slice(&output.stdout)?;
    let paths: Vec<&str> = report["routes"]
        .as_array()
        .map(Vec::as_slice)
        .unwrap_or(&[])
        .iter()
        .filter_map(|r| r["path"].as_str())
        .collect();
    assert_eq!(paths, vec!["/blog", "/blog/:slug", "/admin/orders"]);
    assert_eq!(report["routes"][2]["protected"], true);
    assert_eq!(report["publicIndexRoutes"], serde_json::json!(["/blog"]));
    Ok(())
}

#[test]
fn routes_without_router_reports_fallback() -> Result<()> {
    let config_dir = tempdir()?;

    smap_cmd(config_dir.path())
        .arg("routes")
        .assert()
        .success()
        .stdout(predicate::str::contains("No router found"));
    Ok(())
}

#[test]
fn routes_rejects_invalid_filter() -> Result<()> {
    let config_dir = tempdir()?;

    shop_cmd(config_dir.path())
        .args(["routes", "--filter", "("])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid --filter expression"));
    Ok(())
}

#[test]
fn schedule_runs_requested_number_of_times() -> Result<()> {
    let config_dir = tempdir()?;
    let out = tempdir()?;

    shop_cmd(config_dir.path())
        .args(["schedule", "--interval", "1", "--runs", "2", "--output"])
        .arg(out.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("7 URLs").count(2));

    assert!(out.path().join("sitemap.xml").exists());
    Ok(())
}
