//! sitemaps.org document rendering, splitting and read-back.
//!
//! Documents are always emitted as: XML declaration, optional stylesheet
//! processing instruction, root element. Index documents reference parts by
//! `<loc>` and `<lastmod>` only.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use quick_xml::Reader;
use quick_xml::escape::escape;
use quick_xml::events::Event;
use serde::{Deserialize, Serialize};

use crate::entry::{Alternate, Priority, UrlEntry, format_lastmod, parse_lastmod};
use crate::{Error, Result};

/// The XML declaration every document starts with.
pub const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// sitemaps.org namespace.
pub const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

/// XHTML namespace for `xhtml:link` alternates.
pub const XHTML_NS: &str = "http://www.w3.org/1999/xhtml";

/// Stylesheet names that resolve to a bundled XSL file.
pub const STYLESHEETS: &[&str] = &["default", "table", "minimal"];

/// One numbered part of a split sitemap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SitemapPart {
    /// 1-based position.
    pub index: usize,
    /// Absolute URL of the part file.
    pub loc: String,
    /// Newest entry lastmod, or generation time when none is set.
    pub lastmod: DateTime<Utc>,
    /// Serialized `<urlset>` document.
    pub body: String,
    /// Entries in this part.
    pub url_count: usize,
}

impl SitemapPart {
    /// File name of this part (`sitemap-2.xml`).
    pub fn filename(&self) -> String {
        part_filename(self.index)
    }
}

/// A reference from a `<sitemapindex>` to one sitemap file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SitemapRef {
    /// Absolute URL of the referenced file.
    pub loc: String,
    /// Last modification of the referenced file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lastmod: Option<DateTime<Utc>>,
}

/// A document read back with [`parse_document`].
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedDocument {
    /// A `<urlset>` and its entries.
    Urlset(Vec<UrlEntry>),
    /// A `<sitemapindex>` and its references.
    Index(Vec<SitemapRef>),
}

/// File name of the `index`-th part.
pub fn part_filename(index: usize) -> String {
    format!("sitemap-{index}.xml")
}

/// Absolute URL of the bundled XSL file for `style`, served under the site
/// base URL (prefix included). `None` for unknown names.
pub fn stylesheet_href(style: Option<&str>, base_url: &str) -> Option<String> {
    let style = style?.trim();
    STYLESHEETS
        .contains(&style)
        .then(|| format!("{}/sitemaps/{style}.xsl", base_url.trim_end_matches('/')))
}

/// The stylesheet processing instruction for a resolved href.
pub fn stylesheet_instruction(href: Option<&str>) -> Option<String> {
    let href = href?;
    Some(format!(
        r#"<?xml-stylesheet type="text/xsl" href="{}"?>"#,
        escape(href)
    ))
}

fn write_prologue(out: &mut String, stylesheet: Option<&str>) {
    out.push_str(XML_DECLARATION);
    out.push('\n');
    if let Some(pi) = stylesheet_instruction(stylesheet) {
        out.push_str(&pi);
        out.push('\n');
    }
}

/// Render a `<urlset>` document, referencing `stylesheet` (an href from
/// [`stylesheet_href`]) when given.
pub fn render_urlset(entries: &[UrlEntry], stylesheet: Option<&str>) -> String {
    let mut out = String::with_capacity(256 + entries.len() * 160);
    write_prologue(&mut out, stylesheet);
    let _ = writeln!(out, r#"<urlset xmlns="{SITEMAP_NS}" xmlns:xhtml="{XHTML_NS}">"#);
    for entry in entries {
        entry.write_xml(&mut out);
    }
    out.push_str("</urlset>\n");
    out
}

/// Render a `<sitemapindex>` document.
pub fn render_sitemap_index(refs: &[SitemapRef], stylesheet: Option<&str>) -> String {
    let mut out = String::with_capacity(256 + refs.len() * 120);
    write_prologue(&mut out, stylesheet);
    let _ = writeln!(out, r#"<sitemapindex xmlns="{SITEMAP_NS}">"#);
    for r in refs {
        out.push_str("  <sitemap>\n");
        let _ = writeln!(out, "    <loc>{}</loc>", escape(r.loc.as_str()));
        if let Some(lastmod) = &r.lastmod {
            let _ = writeln!(out, "    <lastmod>{}</lastmod>", format_lastmod(lastmod));
        }
        out.push_str("  </sitemap>\n");
    }
    out.push_str("</sitemapindex>\n");
    out
}

/// Newest lastmod among `entries`.
pub fn max_lastmod(entries: &[UrlEntry]) -> Option<DateTime<Utc>> {
    entries.iter().filter_map(|e| e.lastmod).max()
}

/// Split `entries` into parts of at most `max_urls` each.
///
/// `max_urls` of zero is treated as one.
pub fn split_into_parts(
    entries: &[UrlEntry],
    max_urls: usize,
    base_url: &str,
    stylesheet: Option<&str>,
    now: DateTime<Utc>,
) -> Vec<SitemapPart> {
    entries
        .chunks(max_urls.max(1))
        .enumerate()
        .map(|(i, chunk)| {
            let index = i + 1;
            SitemapPart {
                index,
                loc: format!("{}/{}", base_url.trim_end_matches('/'), part_filename(index)),
                lastmod: max_lastmod(chunk).unwrap_or(now),
                body: render_urlset(chunk, stylesheet),
                url_count: chunk.len(),
            }
        })
        .collect()
}

/// Index references for a list of parts.
pub fn part_refs(parts: &[SitemapPart]) -> Vec<SitemapRef> {
    parts
        .iter()
        .map(|p| SitemapRef {
            loc: p.loc.clone(),
            lastmod: Some(p.lastmod),
        })
        .collect()
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Field {
    Loc,
    Lastmod,
    Changefreq,
    Priority,
}

/// Parse a `<urlset>` or `<sitemapindex>` document.
pub fn parse_document(xml: &str) -> Result<ParsedDocument> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut is_index = None;
    let mut entries = Vec::new();
    let mut refs = Vec::new();
    let mut current: Option<UrlEntry> = None;
    let mut field: Option<Field> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"urlset" => is_index = Some(false),
                b"sitemapindex" => is_index = Some(true),
                b"url" | b"sitemap" => current = Some(UrlEntry::new("")),
                b"loc" => field = Some(Field::Loc),
                b"lastmod" => field = Some(Field::Lastmod),
                b"changefreq" => field = Some(Field::Changefreq),
                b"priority" => field = Some(Field::Priority),
                _ => {},
            },
            Ok(Event::Empty(e)) if e.local_name().as_ref() == b"link" => {
                let mut hreflang = None;
                let mut href = None;
                for attr in e.attributes() {
                    let attr = attr.map_err(|e| Error::Parse(format!("XML attribute error: {e}")))?;
                    let value = attr
                        .unescape_value()
                        .map_err(|e| Error::Parse(e.to_string()))?
                        .into_owned();
                    match attr.key.local_name().as_ref() {
                        b"hreflang" => hreflang = Some(value),
                        b"href" => href = Some(value),
                        _ => {},
                    }
                }
                if let (Some(entry), Some(hreflang), Some(href)) = (current.as_mut(), hreflang, href) {
                    entry.alternates.push(Alternate::new(hreflang, href));
                }
            },
            Ok(Event::Text(e)) => {
                if let (Some(entry), Some(f)) = (current.as_mut(), field) {
                    let text = e.unescape().map_err(|e| Error::Parse(e.to_string()))?;
                    let text = text.trim();
                    match f {
                        Field::Loc => entry.loc = text.to_string(),
                        Field::Lastmod => entry.lastmod = parse_lastmod(text),
                        Field::Changefreq => entry.changefreq = text.parse().ok(),
                        Field::Priority => entry.priority = Some(Priority::parse(text)),
                    }
                }
            },
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"url" => entries.extend(current.take()),
                b"sitemap" => {
                    if let Some(entry) = current.take() {
                        refs.push(SitemapRef {
                            loc: entry.loc,
                            lastmod: entry.lastmod,
                        });
                    }
                },
                _ => field = None,
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Parse(format!("XML parse error: {e}"))),
            _ => {},
        }
        buf.clear();
    }

    match is_index {
        Some(false) => Ok(ParsedDocument::Urlset(entries)),
        Some(true) => Ok(ParsedDocument::Index(refs)),
        None => Err(Error::Parse(
            "document has no <urlset> or <sitemapindex> root".to_string(),
        )),
    }
}
