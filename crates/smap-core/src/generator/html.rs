//! HTML sitemap layouts.
//!
//! All layouts render the same deduplicated, sorted entry list the XML
//! output uses; they differ only in how links are arranged.

use std::collections::BTreeMap;
use std::fmt::{self, Write as _};
use std::str::FromStr;

use html_escape::{encode_double_quoted_attribute, encode_text};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::Error;
use crate::entry::UrlEntry;

/// Group heading for entries with neither a category nor a source.
const OTHER_GROUP: &str = "Other";

/// Arrangement of links in an HTML sitemap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HtmlLayout {
    /// One list of every link.
    #[default]
    Flat,
    /// One section per category (or source).
    Grouped,
    /// Nested lists following URL path segments.
    Hierarchical,
}

impl HtmlLayout {
    /// Lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Flat => "flat",
            Self::Grouped => "grouped",
            Self::Hierarchical => "hierarchical",
        }
    }
}

impl fmt::Display for HtmlLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HtmlLayout {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "flat" => Ok(Self::Flat),
            "grouped" => Ok(Self::Grouped),
            "hierarchical" | "tree" => Ok(Self::Hierarchical),
            other => Err(Error::Parse(format!("unknown HTML layout '{other}'"))),
        }
    }
}

/// Render a complete HTML document.
pub fn render_html(entries: &[UrlEntry], layout: HtmlLayout, lang: &str) -> String {
    let mut out = String::with_capacity(512 + entries.len() * 96);
    let _ = writeln!(out, "<!DOCTYPE html>");
    let _ = writeln!(out, r#"<html lang="{}">"#, encode_double_quoted_attribute(lang));
    out.push_str("<head>\n<meta charset=\"utf-8\">\n<title>Sitemap</title>\n</head>\n");
    let _ = writeln!(out, r#"<body class="sitemap sitemap-{layout}">"#);
    out.push_str("<h1>Sitemap</h1>\n");
    match layout {
        HtmlLayout::Flat => render_list(&mut out, entries.iter()),
        HtmlLayout::Grouped => render_grouped(&mut out, entries),
        HtmlLayout::Hierarchical => render_tree(&mut out, entries),
    }
    out.push_str("</body>\n</html>\n");
    out
}

fn url_path(loc: &str) -> String {
    Url::parse(loc).map_or_else(|_| loc.to_string(), |u| u.path().to_string())
}

fn label(entry: &UrlEntry) -> String {
    entry
        .title
        .clone()
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| url_path(&entry.loc))
}

fn write_link(out: &mut String, entry: &UrlEntry, text: &str) {
    let _ = write!(
        out,
        r#"<a href="{}">{}</a>"#,
        encode_double_quoted_attribute(&entry.loc),
        encode_text(text)
    );
}

fn render_list<'a>(out: &mut String, entries: impl Iterator<Item = &'a UrlEntry>) {
    out.push_str("<ul>\n");
    for entry in entries {
        out.push_str("<li>");
        write_link(out, entry, &label(entry));
        out.push_str("</li>\n");
    }
    out.push_str("</ul>\n");
}

fn render_grouped(out: &mut String, entries: &[UrlEntry]) {
    let mut groups: BTreeMap<&str, Vec<&UrlEntry>> = BTreeMap::new();
    for entry in entries {
        let key = entry
            .category
            .as_deref()
            .or(entry.source.as_deref())
            .unwrap_or(OTHER_GROUP);
        groups.entry(key).or_default().push(entry);
    }

    for (name, members) in groups {
        out.push_str("<section>\n");
        let _ = writeln!(out, "<h2>{}</h2>", encode_text(name));
        render_list(out, members.into_iter());
        out.push_str("</section>\n");
    }
}

#[derive(Default)]
struct Node<'a> {
    entry: Option<&'a UrlEntry>,
    children: BTreeMap<String, Node<'a>>,
}

impl<'a> Node<'a> {
    fn insert(&mut self, segments: &[&str], entry: &'a UrlEntry) {
        match segments.split_first() {
            None => {
                if self.entry.is_none() {
                    self.entry = Some(entry);
                }
            },
            Some((first, rest)) => self
                .children
                .entry((*first).to_string())
                .or_default()
                .insert(rest, entry),
        }
    }

    fn render(&self, out: &mut String) {
        if self.children.is_empty() {
            return;
        }
        out.push_str("<ul>\n");
        for (segment, child) in &self.children {
            out.push_str("<li>");
            match child.entry {
                Some(entry) => {
                    let text = entry.title.clone().unwrap_or_else(|| segment.clone());
                    write_link(out, entry, &text);
                },
                None => {
                    let _ = write!(out, "<span>{}</span>", encode_text(segment));
                },
            }
            if !child.children.is_empty() {
                out.push('\n');
                child.render(out);
            }
            out.push_str("</li>\n");
        }
        out.push_str("</ul>\n");
    }
}

fn render_tree(out: &mut String, entries: &[UrlEntry]) {
    let mut root = Node::default();
    for entry in entries {
        let path = url_path(&entry.loc);
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        root.insert(&segments, entry);
    }

    if let Some(home) = root.entry {
        out.push_str("<p>");
        write_link(out, home, &label(home));
        out.push_str("</p>\n");
    }
    root.render(out);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn entries() -> Vec<UrlEntry> {
        vec![
            UrlEntry::new("https://example.com/").with_title("Home"),
            UrlEntry::new("https://example.com/blog/hello")
                .with_title("Hello <World>")
                .with_category("Blog"),
            UrlEntry::new("https://example.com/blog/second").with_category("Blog"),
            UrlEntry::new("https://example.com/shop/chairs/oak").with_source("products"),
        ]
    }

    #[test]
    fn test_layout_parse_and_display() {
        assert_eq!("Grouped".parse::<HtmlLayout>().unwrap(), HtmlLayout::Grouped);
        assert_eq!("tree".parse::<HtmlLayout>().unwrap(), HtmlLayout::Hierarchical);
        assert!("cards".parse::<HtmlLayout>().is_err());
        assert_eq!(HtmlLayout::Hierarchical.to_string(), "hierarchical");
    }

    #[test]
    fn test_flat_escapes_titles() {
        let html = render_html(&entries(), HtmlLayout::Flat, "en");
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains(r#"<a href="https://example.com/blog/hello">Hello &lt;World&gt;</a>"#));
        assert!(html.contains(r#"<a href="https://example.com/blog/second">/blog/second</a>"#));
        assert_eq!(html.matches("<li>").count(), 4);
    }

    #[test]
    fn test_grouped_sections() {
        let html = render_html(&entries(), HtmlLayout::Grouped, "en");
        let blog = html.find("<h2>Blog</h2>").unwrap();
        let other = html.find("<h2>Other</h2>").unwrap();
        let products = html.find("<h2>products</h2>").unwrap();
        assert!(blog < other && other < products);
    }

    #[test]
    fn test_hierarchical_nests_by_path() {
        let html = render_html(&entries(), HtmlLayout::Hierarchical, "en");
        assert!(html.contains(r#"<p><a href="https://example.com/">Home</a></p>"#));
        assert!(html.contains("<span>shop</span>"));
        assert!(html.contains("<span>chairs</span>"));
        assert!(html.contains(r#"<a href="https://example.com/shop/chairs/oak">oak</a>"#));
    }
}
