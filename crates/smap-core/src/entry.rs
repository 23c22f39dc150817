//! Sitemap entry value object and its XML serialization rules.
//!
//! A [`UrlEntry`] is produced by a source inside `collect`, enriched with
//! hreflang [`Alternate`]s by the generator, and rendered as a `<url>` element.
//! Normalization happens at construction time so that anything that reaches
//! the serializer is already protocol-legal:
//!
//! - `priority` is clamped to `0.0..=1.0` and rounded to one decimal
//! - `changefreq` values outside the seven legal tokens are dropped
//! - every supported timestamp flavour becomes a `DateTime<Utc>`
//!
//! ```rust
//! use smap_core::UrlEntry;
//!
//! let entry = UrlEntry::new("https://example.com/blog/hello")
//!     .with_changefreq("weekly")
//!     .with_priority("0.83")
//!     .with_lastmod("2024-01-15");
//!
//! let xml = entry.to_xml();
//! assert!(xml.contains("<changefreq>weekly</changefreq>"));
//! assert!(xml.contains("<priority>0.8</priority>"));
//! assert!(xml.contains("<lastmod>2024-01-15T00:00:00Z</lastmod>"));
//! ```

use std::fmt::{self, Write as _};

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use quick_xml::escape::escape;
use serde::{Deserialize, Serialize};

use crate::Error;

/// Priority used when a supplied value cannot be interpreted as a number.
pub const DEFAULT_PRIORITY: Priority = Priority(5);

/// Change frequency hints for the `<changefreq>` element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeFrequency {
    /// The page changes every time it is accessed.
    Always,
    /// The page changes hourly.
    Hourly,
    /// The page changes daily.
    Daily,
    /// The page changes weekly.
    Weekly,
    /// The page changes monthly.
    Monthly,
    /// The page changes yearly.
    Yearly,
    /// The page is archived and will not change.
    Never,
}

impl ChangeFrequency {
    /// The protocol token for this frequency.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Always => "always",
            Self::Hourly => "hourly",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
            Self::Never => "never",
        }
    }
}

impl fmt::Display for ChangeFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ChangeFrequency {
    type Err = Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "always" => Ok(Self::Always),
            "hourly" => Ok(Self::Hourly),
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            "never" => Ok(Self::Never),
            _ => Err(Error::Parse(format!("Invalid changefreq value: {s}"))),
        }
    }
}

/// A sitemap priority, stored in tenths so it is always in `0.0..=1.0`
/// with exactly one decimal digit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct Priority(u8);

impl Priority {
    /// Normalize a numeric priority: clamp to `0.0..=1.0`, round to tenths.
    ///
    /// `NaN` yields [`DEFAULT_PRIORITY`].
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_f64(value: f64) -> Self {
        if value.is_nan() {
            return DEFAULT_PRIORITY;
        }
        // Clamped to 0..=10 before the cast, so truncation cannot occur.
        Self((value.clamp(0.0, 1.0) * 10.0).round() as u8)
    }

    /// Parse a textual priority, falling back to [`DEFAULT_PRIORITY`].
    #[must_use]
    pub fn parse(value: &str) -> Self {
        value
            .trim()
            .parse::<f64>()
            .map_or(DEFAULT_PRIORITY, Self::from_f64)
    }

    /// The priority as a floating point value.
    #[must_use]
    pub fn value(self) -> f64 {
        f64::from(self.0) / 10.0
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.0 / 10, self.0 % 10)
    }
}

impl From<f64> for Priority {
    fn from(value: f64) -> Self {
        Self::from_f64(value)
    }
}

impl From<i64> for Priority {
    #[allow(clippy::cast_precision_loss)]
    fn from(value: i64) -> Self {
        Self::from_f64(value as f64)
    }
}

impl From<i32> for Priority {
    fn from(value: i32) -> Self {
        Self::from_f64(f64::from(value))
    }
}

impl From<&str> for Priority {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl From<String> for Priority {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<Priority> for f64 {
    fn from(value: Priority) -> Self {
        value.value()
    }
}

/// Conversion of source-native timestamp types into the canonical instant.
pub trait IntoLastmod {
    /// Normalize into a UTC instant, `None` when the value is unusable.
    fn into_lastmod(self) -> Option<DateTime<Utc>>;
}

impl IntoLastmod for DateTime<Utc> {
    fn into_lastmod(self) -> Option<DateTime<Utc>> {
        Some(self)
    }
}

impl IntoLastmod for DateTime<FixedOffset> {
    fn into_lastmod(self) -> Option<DateTime<Utc>> {
        Some(self.with_timezone(&Utc))
    }
}

impl IntoLastmod for NaiveDateTime {
    fn into_lastmod(self) -> Option<DateTime<Utc>> {
        Some(self.and_utc())
    }
}

impl IntoLastmod for NaiveDate {
    fn into_lastmod(self) -> Option<DateTime<Utc>> {
        Some(self.and_hms_opt(0, 0, 0)?.and_utc())
    }
}

impl IntoLastmod for &str {
    fn into_lastmod(self) -> Option<DateTime<Utc>> {
        parse_lastmod(self)
    }
}

impl IntoLastmod for String {
    fn into_lastmod(self) -> Option<DateTime<Utc>> {
        parse_lastmod(&self)
    }
}

impl<T: IntoLastmod> IntoLastmod for Option<T> {
    fn into_lastmod(self) -> Option<DateTime<Utc>> {
        self.and_then(IntoLastmod::into_lastmod)
    }
}

/// Parse a lastmod date string into a `DateTime<Utc>`.
///
/// Supports:
/// - `2024-01-15` (date only)
/// - `2024-01-15T10:30:00Z` / `2024-01-15T10:30:00+02:00` (RFC 3339)
/// - `2024-01-15T10:30:00` and `2024-01-15T10:30:00.123` (assumed UTC)
pub fn parse_lastmod(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc());
    }

    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt.and_utc());
    }

    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt.and_utc());
    }

    tracing::debug!(date_str = %s, "Could not parse lastmod date");
    None
}

/// Render a timestamp the way it appears in `<lastmod>`.
pub fn format_lastmod(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// An hreflang alternate link attached to a translated entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Alternate {
    /// Language code, or `x-default`.
    pub hreflang: String,
    /// Absolute URL of the translated page.
    pub href: String,
}

impl Alternate {
    /// Create a new alternate link.
    pub fn new(hreflang: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            hreflang: hreflang.into(),
            href: href.into(),
        }
    }
}

/// One sitemap entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlEntry {
    /// Absolute URL; unique after deduplication.
    pub loc: String,
    /// Last modification instant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lastmod: Option<DateTime<Utc>>,
    /// Change frequency hint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changefreq: Option<ChangeFrequency>,
    /// Normalized priority.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    /// Display title (HTML sitemaps only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Display category (HTML sitemaps only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Name of the source that produced this entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Path without a language prefix, shared by translations of one page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canonical_path: Option<String>,
    /// hreflang alternates, filled in by the generator.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternates: Vec<Alternate>,
}

impl UrlEntry {
    /// Create an entry with only a location.
    pub fn new(loc: impl Into<String>) -> Self {
        Self {
            loc: loc.into(),
            lastmod: None,
            changefreq: None,
            priority: None,
            title: None,
            category: None,
            source: None,
            canonical_path: None,
            alternates: Vec::new(),
        }
    }

    /// Set the last modification time from any supported timestamp type.
    #[must_use]
    pub fn with_lastmod(mut self, lastmod: impl IntoLastmod) -> Self {
        self.lastmod = lastmod.into_lastmod();
        self
    }

    /// Set the change frequency; invalid tokens clear it.
    #[must_use]
    pub fn with_changefreq(mut self, changefreq: &str) -> Self {
        self.changefreq = changefreq.parse().ok();
        self
    }

    /// Set the priority from a number or numeric string.
    #[must_use]
    pub fn with_priority(mut self, priority: impl Into<Priority>) -> Self {
        self.priority = Some(priority.into());
        self
    }

    /// Set the display title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the display category.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Tag the producing source.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Set the language-independent path used for hreflang grouping.
    #[must_use]
    pub fn with_canonical_path(mut self, path: impl Into<String>) -> Self {
        self.canonical_path = Some(path.into());
        self
    }

    /// Render this entry as a `<url>` element (two-space indented).
    pub fn to_xml(&self) -> String {
        let mut out = String::with_capacity(128);
        self.write_xml(&mut out);
        out
    }

    /// Append this entry's `<url>` element to `out`.
    pub fn write_xml(&self, out: &mut String) {
        out.push_str("  <url>\n");
        // Writing into a String cannot fail.
        let _ = writeln!(out, "    <loc>{}</loc>", escape(self.loc.as_str()));
        if let Some(lastmod) = &self.lastmod {
            let _ = writeln!(out, "    <lastmod>{}</lastmod>", format_lastmod(lastmod));
        }
        if let Some(changefreq) = self.changefreq {
            let _ = writeln!(out, "    <changefreq>{changefreq}</changefreq>");
        }
        if let Some(priority) = self.priority {
            let _ = writeln!(out, "    <priority>{priority}</priority>");
        }
        for alt in &self.alternates {
            let _ = writeln!(
                out,
                r#"    <xhtml:link rel="alternate" hreflang="{}" href="{}"/>"#,
                escape(alt.hreflang.as_str()),
                escape(alt.href.as_str())
            );
        }
        out.push_str("  </url>\n");
    }
}
