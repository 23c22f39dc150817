#![allow(missing_docs, clippy::unwrap_used)]

use std::sync::Arc;

use pretty_assertions::assert_eq;
use smap_core::generator::X_DEFAULT;
use smap_core::{
    Alternate, ContentRecord, ContentSource, EngineConfig, GenerateOptions, Generator, Language,
    LanguageSettings, RouteResolver, SitemapCache, SourceRegistry, StaticContentProvider, UrlEntry,
};

fn multilingual_generator(records: Vec<ContentRecord>) -> Generator {
    let mut config = EngineConfig::default();
    config.site.base_url = Some("https://example.com".to_string());
    config.languages = LanguageSettings::multilingual([Language::new("en"), Language::new("et")]);

    let posts = ContentSource::new(
        "posts",
        "post",
        StaticContentProvider::new(records),
        RouteResolver::unavailable(),
    )
    .with_path_prefix("blog");
    let registry = SourceRegistry::new().with(Arc::new(posts)).unwrap();
    Generator::new(config, registry, SitemapCache::open())
}

fn entry<'a>(entries: &'a [UrlEntry], loc: &str) -> &'a UrlEntry {
    entries.iter().find(|e| e.loc == loc).unwrap()
}

#[tokio::test]
async fn translations_reference_each_other() {
    let generator = multilingual_generator(vec![ContentRecord::new("1", "hello")]);
    let collected = generator.collect_entries().await.unwrap();

    let locs: Vec<&str> = collected.entries.iter().map(|e| e.loc.as_str()).collect();
    assert_eq!(
        locs,
        vec!["https://example.com/blog/hello", "https://example.com/et/blog/hello"]
    );

    let expected = vec![
        Alternate::new("en", "https://example.com/blog/hello"),
        Alternate::new("et", "https://example.com/et/blog/hello"),
        Alternate::new(X_DEFAULT, "https://example.com/blog/hello"),
    ];
    let en = entry(&collected.entries, "https://example.com/blog/hello");
    let et = entry(&collected.entries, "https://example.com/et/blog/hello");
    assert_eq!(en.alternates, expected);
    assert_eq!(et.alternates, expected);
}

#[tokio::test]
async fn language_specific_records_get_no_alternates() {
    let generator = multilingual_generator(vec![
        ContentRecord::new("1", "tere").with_language("et"),
        ContentRecord::new("2", "hello").with_language("en"),
    ]);
    let collected = generator.collect_entries().await.unwrap();

    assert_eq!(collected.entries.len(), 2);
    assert!(collected.entries.iter().all(|e| e.alternates.is_empty()));
    entry(&collected.entries, "https://example.com/et/blog/tere");
    entry(&collected.entries, "https://example.com/blog/hello");
}

#[tokio::test]
async fn alternates_are_serialized_as_xhtml_links() {
    let generator = multilingual_generator(vec![ContentRecord::new("1", "hello")]);
    let output = generator.generate_xml(GenerateOptions::default()).await.unwrap();
    let xml = output.document();

    assert!(xml.contains(r#"xmlns:xhtml="http://www.w3.org/1999/xhtml""#));
    assert_eq!(xml.matches("<url>").count(), 2);
    assert_eq!(xml.matches(r#"hreflang="x-default""#).count(), 2);
    assert!(xml.contains(
        r#"<xhtml:link rel="alternate" hreflang="et" href="https://example.com/et/blog/hello"/>"#
    ));
}
