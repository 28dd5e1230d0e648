//! Computed-field resolution.
//!
//! Every document gets the same fixed set of derived fields, each a pure
//! function of its validated front-matter and body text:
//!
//! | Field | Source |
//! |-------|--------|
//! | `slug`, `path`, `filePath` | [`crate::paths::derive_paths`] |
//! | `readingTime` | [`reading_time`] over the raw body |
//! | `toc` | [`Toc`] over the raw body |
//! | `structuredData` | [`structured_data`], posts only |
//!
//! [`resolve`] evaluates them once; the result is stored on the document and
//! never recomputed.
//!
//! ## Reading time
//!
//! Words are whitespace-separated tokens containing at least one alphanumeric
//! character; each CJK ideograph, kana or hangul syllable counts as a word on
//! its own. `minutes = words / words_per_minute`. The display text rounds
//! minutes to two decimals and then up to a whole minute, so any non-empty
//! body reads as at least "1 min read".
//!
//! ## Table of contents
//!
//! Anchor ids come from the same text extraction and the same
//! [`AnchorSlugger`] the `heading-ids` render stage uses, so `#id` links in
//! the toc always resolve inside the rendered body.

use crate::config::SiteConfig;
use crate::document::{ComputedFields, DocumentType, PostFields, PublishDate};
use crate::paths::{AnchorSlugger, DocumentPaths};
use crate::render::heading_text;
use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};
use serde::Serialize;

/// Reading-time estimate for a body of text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadingTime {
    /// Human-readable estimate, e.g. `"3 min read"`.
    pub text: String,
    pub minutes: f64,
    /// Milliseconds.
    pub time: u64,
    pub words: u64,
}

/// One heading in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TocEntry {
    /// Heading depth, 1–6.
    pub level: u8,
    pub text: String,
    /// Anchor id assigned to the heading in the rendered body.
    pub id: String,
}

/// schema.org `BlogPosting` record for search-engine rich results.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredData {
    #[serde(rename = "@context")]
    pub context: String,
    #[serde(rename = "@type")]
    pub schema_type: String,
    pub headline: String,
    pub date_published: PublishDate,
    pub date_modified: PublishDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub image: String,
    pub url: String,
}

/// Inputs shared by every resolution in one build.
#[derive(Debug, Clone, Copy)]
pub struct ResolveContext<'a> {
    pub site: &'a SiteConfig,
    /// Parser options of the render pipeline, so headings are seen the same way.
    pub options: Options,
}

/// Derive every computed field for one document.
pub fn resolve<F: DocumentType>(
    fields: &F,
    paths: DocumentPaths,
    body: &str,
    ctx: &ResolveContext<'_>,
) -> ComputedFields {
    let reading_time = reading_time(body, ctx.site.markdown.words_per_minute);
    let toc = Toc::new(body, ctx.options).iter().collect();
    let structured_data = fields.structured_data(&paths, ctx.site);
    ComputedFields {
        paths,
        reading_time,
        toc,
        structured_data,
    }
}

// =============================================================================
// Reading time
// =============================================================================

fn is_cjk(ch: char) -> bool {
    matches!(ch,
        '\u{3040}'..='\u{30ff}'   // hiragana, katakana
        | '\u{3400}'..='\u{4dbf}' // CJK extension A
        | '\u{4e00}'..='\u{9fff}' // CJK unified ideographs
        | '\u{ac00}'..='\u{d7af}' // hangul syllables
        | '\u{f900}'..='\u{faff}' // CJK compatibility ideographs
    )
}

/// Count words the way [`reading_time`] does.
pub fn count_words(text: &str) -> u64 {
    let mut words = 0u64;
    for token in text.split_whitespace() {
        let mut latin = false;
        for ch in token.chars() {
            if is_cjk(ch) {
                words += 1;
            } else if ch.is_alphanumeric() {
                latin = true;
            }
        }
        if latin {
            words += 1;
        }
    }
    words
}

/// Estimate reading time at `words_per_minute`.
pub fn reading_time(text: &str, words_per_minute: u32) -> ReadingTime {
    let words = count_words(text);
    let minutes = words as f64 / f64::from(words_per_minute.max(1));
    let time = (minutes * 60_000.0).round() as u64;
    let displayed = ((minutes * 100.0).round() / 100.0).ceil() as u64;
    let displayed = if words > 0 { displayed.max(1) } else { 0 };
    ReadingTime {
        text: format!("{displayed} min read"),
        minutes,
        time,
        words,
    }
}

// =============================================================================
// Table of contents
// =============================================================================

/// Restartable table of contents over a markdown body.
///
/// Nothing is parsed until [`Toc::iter`] is driven; each call to `iter`
/// starts over from the first heading with a fresh slugger.
#[derive(Debug, Clone, Copy)]
pub struct Toc<'a> {
    body: &'a str,
    options: Options,
}

impl<'a> Toc<'a> {
    pub fn new(body: &'a str, options: Options) -> Self {
        Self { body, options }
    }

    pub fn iter(&self) -> TocIter<'a> {
        TocIter {
            parser: Parser::new_ext(self.body, self.options),
            slugger: AnchorSlugger::new(),
        }
    }
}

impl<'a> IntoIterator for &Toc<'a> {
    type Item = TocEntry;
    type IntoIter = TocIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Lazy heading iterator produced by [`Toc::iter`].
pub struct TocIter<'a> {
    parser: Parser<'a>,
    slugger: AnchorSlugger,
}

impl Iterator for TocIter<'_> {
    type Item = TocEntry;

    fn next(&mut self) -> Option<TocEntry> {
        loop {
            if let Event::Start(Tag::Heading { level, id, .. }) = self.parser.next()? {
                let mut inner = Vec::new();
                for event in self.parser.by_ref() {
                    if matches!(event, Event::End(TagEnd::Heading(_))) {
                        break;
                    }
                    inner.push(event);
                }
                let text = heading_text(&inner);
                let id = match id {
                    Some(explicit) => self.slugger.reserve(&explicit),
                    None => self.slugger.anchor_for(&text),
                };
                return Some(TocEntry {
                    level: level as u8,
                    text,
                    id,
                });
            }
        }
    }
}

// =============================================================================
// Structured data
// =============================================================================

/// Build the `BlogPosting` record for a post.
pub fn structured_data(
    post: &PostFields,
    paths: &DocumentPaths,
    site: &SiteConfig,
) -> StructuredData {
    StructuredData {
        context: "https://schema.org".to_string(),
        schema_type: "BlogPosting".to_string(),
        headline: post.title.clone(),
        date_published: post.date,
        date_modified: post.lastmod.unwrap_or(post.date),
        description: post.summary.clone(),
        image: post
            .images
            .first()
            .cloned()
            .unwrap_or_else(|| site.social_banner_url()),
        url: site.document_url(&paths.path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::derive_paths;
    use std::path::Path;

    fn post(yaml: &str) -> PostFields {
        serde_yaml_ng::from_str(yaml).unwrap()
    }

    #[test]
    fn empty_text_reads_in_zero_minutes() {
        let rt = reading_time("", 200);
        assert_eq!(rt.words, 0);
        assert_eq!(rt.text, "0 min read");
        assert_eq!(rt.time, 0);
    }

    #[test]
    fn short_text_rounds_up_to_one_minute() {
        let rt = reading_time("just a few words here", 200);
        assert_eq!(rt.words, 5);
        assert_eq!(rt.text, "1 min read");
    }

    #[test]
    fn four_hundred_words_is_two_minutes() {
        let text = "word ".repeat(400);
        let rt = reading_time(&text, 200);
        assert_eq!(rt.words, 400);
        assert_eq!(rt.minutes, 2.0);
        assert_eq!(rt.time, 120_000);
        assert_eq!(rt.text, "2 min read");
    }

    #[test]
    fn partial_minutes_round_up() {
        let text = "word ".repeat(201);
        assert_eq!(reading_time(&text, 200).text, "2 min read");
    }

    #[test]
    fn words_per_minute_is_respected() {
        let text = "word ".repeat(300);
        assert_eq!(reading_time(&text, 100).text, "3 min read");
    }

    #[test]
    fn punctuation_only_tokens_are_not_words() {
        assert_eq!(count_words("hello — world ... !"), 2);
    }

    #[test]
    fn cjk_characters_count_individually() {
        assert_eq!(count_words("基础教程"), 4);
        assert_eq!(count_words("Rust 基础"), 3);
    }

    #[test]
    fn toc_lists_headings_in_order() {
        let body = "# Intro\n\ntext\n\n## Setup\n\n### Install the `cli`\n";
        let toc: Vec<TocEntry> = Toc::new(body, Options::empty()).iter().collect();
        assert_eq!(
            toc,
            vec![
                TocEntry { level: 1, text: "Intro".into(), id: "intro".into() },
                TocEntry { level: 2, text: "Setup".into(), id: "setup".into() },
                TocEntry {
                    level: 3,
                    text: "Install the cli".into(),
                    id: "install-the-cli".into()
                },
            ]
        );
    }

    #[test]
    fn toc_dedupes_repeated_headings() {
        let body = "## Notes\n\n## Notes\n\n## Notes\n";
        let ids: Vec<String> = Toc::new(body, Options::empty()).iter().map(|e| e.id).collect();
        assert_eq!(ids, vec!["notes", "notes-1", "notes-2"]);
    }

    #[test]
    fn toc_is_restartable() {
        let body = "# A\n\n# A\n";
        let toc = Toc::new(body, Options::empty());
        let first: Vec<TocEntry> = toc.iter().collect();
        let second: Vec<TocEntry> = toc.iter().collect();
        assert_eq!(first, second);
        assert_eq!(second[1].id, "a-1");
    }

    #[test]
    fn toc_is_lazy_and_finite() {
        let body = "# One\n\n# Two\n\n# Three\n";
        let toc = Toc::new(body, Options::empty());
        let mut iter = toc.iter();
        assert_eq!(iter.next().map(|e| e.text), Some("One".to_string()));
        assert_eq!(iter.count(), 2);
    }

    #[test]
    fn toc_handles_setext_headings() {
        let body = "Title\n=====\n\nSub\n---\n";
        let levels: Vec<u8> = Toc::new(body, Options::empty()).iter().map(|e| e.level).collect();
        assert_eq!(levels, vec![1, 2]);
    }

    #[test]
    fn structured_data_uses_first_image_and_lastmod() {
        let p = post(concat!(
            "title: Hello\ndate: 2024-01-01\nlastmod: 2024-02-01\n",
            "summary: S\nimages: [/a.png, /b.png]\n",
        ));
        let paths = derive_paths(Path::new("blog/hello.mdx"));
        let site = SiteConfig::default();
        let sd = structured_data(&p, &paths, &site);
        assert_eq!(sd.headline, "Hello");
        assert_eq!(sd.image, "/a.png");
        assert_eq!(sd.date_modified.to_string(), "2024-02-01T00:00:00.000Z");
        assert_eq!(sd.description.as_deref(), Some("S"));
        assert_eq!(sd.url, format!("{}/blog/hello", site.site_url));
    }

    #[test]
    fn structured_data_falls_back_to_social_banner() {
        let p = post("title: Hello\ndate: 2024-01-01\n");
        let paths = derive_paths(Path::new("blog/hello.mdx"));
        let site = SiteConfig {
            base_path: "/blog".into(),
            ..SiteConfig::default()
        };
        let sd = structured_data(&p, &paths, &site);
        assert_eq!(sd.image, "/blog/static/images/twitter-card.png");
        assert_eq!(sd.date_modified, sd.date_published);
    }

    #[test]
    fn structured_data_serializes_schema_keys() {
        let p = post("title: Hello\ndate: 2024-01-01\n");
        let paths = derive_paths(Path::new("blog/hello.mdx"));
        let json =
            serde_json::to_value(structured_data(&p, &paths, &SiteConfig::default())).unwrap();
        assert_eq!(json["@context"], "https://schema.org");
        assert_eq!(json["@type"], "BlogPosting");
        assert_eq!(json["datePublished"], "2024-01-01T00:00:00.000Z");
        assert!(json.get("description").is_none());
    }

    #[test]
    fn resolve_only_posts_get_structured_data() {
        use crate::document::AuthorFields;
        let site = SiteConfig::default();
        let ctx = ResolveContext { site: &site, options: Options::empty() };
        let author: AuthorFields = serde_yaml_ng::from_str("name: Jane\n").unwrap();
        let paths = derive_paths(Path::new("authors/jane.md"));
        let computed = resolve(&author, paths, "# Bio\n", &ctx);
        assert!(computed.structured_data.is_none());
        assert_eq!(computed.toc.len(), 1);

        let p = post("title: Hello\ndate: 2024-01-01\n");
        let computed = resolve(&p, derive_paths(Path::new("blog/hello.md")), "words", &ctx);
        assert!(computed.structured_data.is_some());
        assert_eq!(computed.paths.slug, "hello");
    }
}
