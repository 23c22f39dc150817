//! Enabled-language settings and URL language-segment detection.
//!
//! Non-default languages live under a path prefix (`/et/blog/hello`), the
//! default language has none (`/blog/hello`). The generator relies on that
//! convention to pick the `x-default` entry of a translation group and to
//! derive each entry's `hreflang`.

use serde::{Deserialize, Serialize};
use url::Url;

/// One enabled language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    /// Full code, possibly a dialect (`en-US`, `pt-BR`, `et`).
    pub code: String,
    /// Base code used in URLs and hreflang (`en`, `pt`). Derived from
    /// `code` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_code: Option<String>,
}

impl Language {
    /// Create a language whose base code is derived from `code`.
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            base_code: None,
        }
    }

    /// Create a dialect with an explicit base code.
    pub fn with_base(code: impl Into<String>, base_code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            base_code: Some(base_code.into()),
        }
    }

    /// The base code, lowercased.
    pub fn base(&self) -> String {
        self.base_code
            .as_deref()
            .unwrap_or_else(|| self.code.split(['-', '_']).next().unwrap_or(&self.code))
            .to_lowercase()
    }

    fn matches_segment(&self, segment: &str) -> bool {
        segment.eq_ignore_ascii_case(&self.code) || segment.eq_ignore_ascii_case(&self.base())
    }
}

/// The site's enabled languages and which one is the default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageSettings {
    /// Code of the default language; must match one of `enabled`.
    pub default: String,
    /// All enabled languages, default included.
    #[serde(default)]
    pub enabled: Vec<Language>,
}

impl Default for LanguageSettings {
    fn default() -> Self {
        Self::single("en")
    }
}

impl LanguageSettings {
    /// A single-language site.
    pub fn single(code: impl Into<String>) -> Self {
        let code = code.into();
        Self {
            enabled: vec![Language::new(code.clone())],
            default: code,
        }
    }

    /// A multilingual site; the first language is the default.
    pub fn multilingual(languages: impl IntoIterator<Item = Language>) -> Self {
        let enabled: Vec<Language> = languages.into_iter().collect();
        let default = enabled
            .first()
            .map_or_else(|| "en".to_string(), |l| l.code.clone());
        Self { default, enabled }
    }

    /// More than one language is enabled.
    pub fn is_multilingual(&self) -> bool {
        self.enabled.len() > 1
    }

    /// The default language, if it is among the enabled ones.
    pub fn default_language(&self) -> Option<&Language> {
        self.enabled
            .iter()
            .find(|l| l.code.eq_ignore_ascii_case(&self.default))
    }

    /// Base code of the default language (used for un-prefixed URLs).
    pub fn default_base_code(&self) -> String {
        self.default_language()
            .map_or_else(|| Language::new(self.default.clone()).base(), Language::base)
    }

    /// Whether `code` names the default language.
    pub fn is_default(&self, code: &str) -> bool {
        code.eq_ignore_ascii_case(&self.default)
    }

    /// Enabled languages other than the default.
    pub fn non_default(&self) -> impl Iterator<Item = &Language> {
        self.enabled.iter().filter(|l| !self.is_default(&l.code))
    }

    /// URL prefix segment for `code`: `None` for the default language.
    pub fn url_segment(&self, code: &str) -> Option<String> {
        if self.is_default(code) {
            return None;
        }
        let segment = self
            .enabled
            .iter()
            .find(|l| l.code.eq_ignore_ascii_case(code))
            .map_or_else(|| code.to_lowercase(), Language::base);
        Some(segment)
    }

    /// The first path segment of `url` naming a non-default language.
    ///
    /// Returns the segment lowercased, as it appears in the URL.
    pub fn language_segment_in(&self, url: &str) -> Option<String> {
        let parsed = Url::parse(url).ok()?;
        let segments = parsed.path_segments()?;
        for segment in segments {
            if segment.is_empty() {
                continue;
            }
            if self.non_default().any(|l| l.matches_segment(segment)) {
                return Some(segment.to_lowercase());
            }
        }
        None
    }

    /// Remove a leading non-default language segment from a path.
    pub fn strip_language_prefix(&self, path: &str) -> String {
        let trimmed = path.trim_start_matches('/');
        let (first, rest) = trimmed.split_once('/').unwrap_or((trimmed, ""));
        if !first.is_empty() && self.non_default().any(|l| l.matches_segment(first)) {
            format!("/{rest}")
        } else {
            format!("/{trimmed}")
        }
    }
}
