//! Configuration for the sitemap engine.
//!
//! Configuration is stored in TOML and layered as:
//!
//! 1. **Built-in defaults** (`EngineConfig::default()`)
//! 2. **Config file**: an explicit path, `$SMAP_CONFIG`, or the platform config
//!    directory (`~/.config/smap/smap.toml` on Linux)
//! 3. **Environment variables**: `SMAP_BASE_URL`, `SMAP_MAX_URLS`
//!
//! ## Example Configuration File
//!
//! ```toml
//! [site]
//! base_url = "https://example.com"
//!
//! [languages]
//! default = "en"
//! enabled = [{ code = "en" }, { code = "et" }, { code = "pt-BR", base_code = "pt" }]
//!
//! [generator]
//! max_urls_per_file = 50000
//! style = "table"
//!
//! [router]
//! router = "ShopWeb.Router"
//! protected_pipelines = ["require_authenticated_user", "admin"]
//!
//! [sources.posts]
//! enabled = false
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::language::LanguageSettings;
use crate::{Error, Result};

/// Default number of URLs per sitemap file (sitemaps.org limit).
pub const DEFAULT_MAX_URLS_PER_FILE: usize = 50_000;

/// Default per-language collection timeout.
pub const DEFAULT_TASK_TIMEOUT_SECS: u64 = 60;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "SMAP_CONFIG";

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Site URL settings.
    #[serde(default)]
    pub site: SiteSettings,
    /// Enabled languages.
    #[serde(default)]
    pub languages: LanguageSettings,
    /// Output and collection settings.
    #[serde(default)]
    pub generator: GeneratorSettings,
    /// Router discovery and protection settings.
    #[serde(default)]
    pub router: RouterSettings,
    /// Per-source overrides keyed by source name.
    #[serde(default)]
    pub sources: BTreeMap<String, SourceSettings>,
}

/// Site URL settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteSettings {
    /// Absolute base URL, e.g. `https://example.com`. Required to generate.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Path prefix the site is mounted under, e.g. `/shop`.
    #[serde(default)]
    pub url_prefix: String,
    /// Feature toggle for sitemap generation as a whole.
    #[serde(default = "default_true")]
    pub sitemaps_enabled: bool,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            base_url: None,
            url_prefix: String::new(),
            sitemaps_enabled: true,
        }
    }
}

/// Output and collection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorSettings {
    /// Split into an index plus parts above this many URLs.
    #[serde(default = "default_max_urls")]
    pub max_urls_per_file: usize,
    /// Serve repeated requests from the cache.
    #[serde(default = "default_true")]
    pub cache_enabled: bool,
    /// XSL stylesheet name; unknown names emit no stylesheet line.
    #[serde(default)]
    pub style: Option<String>,
    /// Per-language collection timeout in seconds.
    #[serde(default = "default_task_timeout")]
    pub task_timeout_secs: u64,
    /// Directory sitemap files are written to.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    /// File name of the main document.
    #[serde(default = "default_index_filename")]
    pub index_filename: String,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            max_urls_per_file: DEFAULT_MAX_URLS_PER_FILE,
            cache_enabled: true,
            style: None,
            task_timeout_secs: DEFAULT_TASK_TIMEOUT_SECS,
            output_dir: None,
            index_filename: default_index_filename(),
        }
    }
}

impl GeneratorSettings {
    /// The per-language timeout as a `Duration`.
    pub const fn task_timeout(&self) -> Duration {
        Duration::from_secs(self.task_timeout_secs)
    }
}

/// Router discovery and auth-protection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterSettings {
    /// Name of a registered router to use directly.
    #[serde(default)]
    pub router: Option<String>,
    /// Enable naming-convention discovery over `app_namespaces`.
    #[serde(default)]
    pub auto_discover: bool,
    /// Application namespaces probed by naming-convention discovery.
    #[serde(default)]
    pub app_namespaces: Vec<String>,
    /// Infrastructure namespaces never probed.
    #[serde(default = "default_namespace_blocklist")]
    pub namespace_blocklist: Vec<String>,
    /// Pipeline names that mark a route as requiring authentication.
    #[serde(default = "default_protected_pipelines")]
    pub protected_pipelines: Vec<String>,
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            router: None,
            auto_discover: false,
            app_namespaces: Vec::new(),
            namespace_blocklist: default_namespace_blocklist(),
            protected_pipelines: default_protected_pipelines(),
        }
    }
}

/// Per-source override.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSettings {
    /// Force the source on or off; `None` follows the site toggle.
    #[serde(default)]
    pub enabled: Option<bool>,
}

const fn default_true() -> bool {
    true
}

const fn default_max_urls() -> usize {
    DEFAULT_MAX_URLS_PER_FILE
}

const fn default_task_timeout() -> u64 {
    DEFAULT_TASK_TIMEOUT_SECS
}

fn default_index_filename() -> String {
    "sitemap.xml".to_string()
}

fn default_namespace_blocklist() -> Vec<String> {
    ["Runtime", "Telemetry", "Logger", "Test", "Support"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_protected_pipelines() -> Vec<String> {
    [
        "authenticated",
        "require_authenticated_user",
        "require_authenticated",
        "auth",
        "admin",
        "require_admin",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl EngineConfig {
    /// Load from `$SMAP_CONFIG`, else the platform config directory, else defaults.
    ///
    /// Environment overrides are applied and the result is validated.
    pub fn load() -> Result<Self> {
        let path = match std::env::var_os(CONFIG_ENV) {
            Some(path) => Some(PathBuf::from(path)),
            None => Self::default_path().filter(|p| p.exists()),
        };

        let mut config = match path {
            Some(path) => Self::read(&path)?,
            None => Self::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load from an explicit file, then apply environment overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = Self::read(path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML string without environment overrides.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    fn read(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config {}: {e}", path.display()))
        })?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {e}")))
    }

    /// Platform-specific config file location.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("dev", "outfitter", "smap")
            .map(|dirs| dirs.config_dir().join("smap.toml"))
    }

    /// Apply `SMAP_BASE_URL` and `SMAP_MAX_URLS` from `lookup`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(base_url) = lookup("SMAP_BASE_URL").filter(|v| !v.trim().is_empty()) {
            self.site.base_url = Some(base_url);
        }
        if let Some(max) = lookup("SMAP_MAX_URLS") {
            self.generator.max_urls_per_file = max
                .trim()
                .parse()
                .map_err(|e| Error::Config(format!("Invalid SMAP_MAX_URLS '{max}': {e}")))?;
        }
        Ok(())
    }

    /// Reject settings that cannot produce a valid sitemap.
    ///
    /// A missing base URL is not rejected here; generation reports it.
    pub fn validate(&self) -> Result<()> {
        if self.generator.max_urls_per_file == 0 {
            return Err(Error::Config(
                "generator.max_urls_per_file must be greater than zero".to_string(),
            ));
        }
        if !self.languages.enabled.is_empty() && self.languages.default_language().is_none() {
            return Err(Error::Config(format!(
                "default language '{}' is not among the enabled languages",
                self.languages.default
            )));
        }
        if let Some(base) = self.site.base_url.as_deref().filter(|b| !b.trim().is_empty()) {
            let url = Url::parse(base)?;
            if url.cannot_be_a_base() {
                return Err(Error::InvalidUrl(format!("{base} cannot be a base URL")));
            }
        }
        Ok(())
    }

    /// The site base URL with the URL prefix applied and no trailing slash.
    pub fn base_url(&self) -> Result<String> {
        let base = self
            .site
            .base_url
            .as_deref()
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .ok_or(Error::MissingBaseUrl)?;
        Url::parse(base)?;

        let prefix = self.site.url_prefix.trim_matches('/');
        let base = base.trim_end_matches('/');
        if prefix.is_empty() {
            Ok(base.to_string())
        } else {
            Ok(format!("{base}/{prefix}"))
        }
    }

    /// Whether a source should run: the site toggle and any per-source override.
    pub fn source_enabled(&self, name: &str) -> bool {
        self.site.sitemaps_enabled
            && self
                .sources
                .get(name)
                .and_then(|s| s.enabled)
                .unwrap_or(true)
    }
}
