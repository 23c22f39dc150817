#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[allow(dead_code)]
pub const CMD_TIMEOUT: Duration = Duration::from_secs(15);

#[allow(dead_code)]
pub const BASE_URL: &str = "https://shop.example";

/// The sample shop fixture shipped with the crate.
#[allow(dead_code)]
pub fn shop_fixture() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/shop.json")
}

/// Create a configured `smap` command suitable for integration tests.
///
/// Points config discovery at an empty file so the developer's own config
/// never leaks into a test.
#[allow(dead_code)]
pub fn smap_cmd(config_dir: &Path) -> Command {
    let config = config_dir.join("smap.toml");
    if !config.exists() {
        std::fs::write(&config, "").expect("failed to write empty test config");
    }

    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("smap"));
    cmd.timeout(CMD_TIMEOUT);
    cmd.env("SMAP_CONFIG", &config);
    cmd.env_remove("SMAP_BASE_URL");
    cmd.env_remove("SMAP_MAX_URLS");
    cmd.env("NO_COLOR", "1");
    cmd
}

/// A `smap` command over the shop fixture with a base URL set.
#[allow(dead_code)]
pub fn shop_cmd(config_dir: &Path) -> Command {
    let mut cmd = smap_cmd(config_dir);
    cmd.arg("--fixture").arg(shop_fixture());
    cmd.args(["--base-url", BASE_URL]);
    cmd
}
