//! Typed document records.
//!
//! Two document types exist, each with its own front-matter schema:
//!
//! | Type | Directory | Required | Computed extras |
//! |------|-----------|----------|-----------------|
//! | [`PostFields`] | `blog/` | `title`, `date` | `structuredData` |
//! | [`AuthorFields`] | `authors/` | `name` | — |
//!
//! A [`Document`] pairs validated fields with the [`ComputedFields`] derived
//! from them and the rendered [`Body`]. Documents are immutable once built;
//! the registry hands out shared references only.
//!
//! [`CoreContent`] is the body-less projection used by list views and the
//! search index.

use crate::computed::{ReadingTime, StructuredData, TocEntry};
use crate::config::SiteConfig;
use crate::paths::DocumentPaths;
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::de::{self, DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Which schema a document is validated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Post,
    Author,
}

impl DocumentKind {
    /// Directory under the content root holding this type's sources.
    pub fn directory(self) -> &'static str {
        match self {
            DocumentKind::Post => "blog",
            DocumentKind::Author => "authors",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentKind::Post => f.write_str("post"),
            DocumentKind::Author => f.write_str("author"),
        }
    }
}

/// A required front-matter key, with any alternative spellings accepted for it.
#[derive(Debug, Clone, Copy)]
pub struct RequiredField {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
}

impl RequiredField {
    pub const fn new(name: &'static str) -> Self {
        Self { name, aliases: &[] }
    }

    /// Every key that satisfies this requirement.
    pub fn keys(&self) -> impl Iterator<Item = &'static str> {
        std::iter::once(self.name).chain(self.aliases.iter().copied())
    }
}

/// Schema hooks shared by every document type.
pub trait DocumentType: Clone + Serialize + DeserializeOwned {
    const KIND: DocumentKind;
    const REQUIRED: &'static [RequiredField];

    fn title(&self) -> &str;

    fn date(&self) -> Option<PublishDate> {
        None
    }

    fn tags(&self) -> &[String] {
        &[]
    }

    fn is_draft(&self) -> bool {
        false
    }

    /// Bibliography file for citation resolution, relative to the content root.
    fn bibliography(&self) -> Option<&str> {
        None
    }

    fn structured_data(
        &self,
        _paths: &DocumentPaths,
        _site: &SiteConfig,
    ) -> Option<StructuredData> {
        None
    }
}

// =============================================================================
// Dates
// =============================================================================

/// A front-matter date, normalized to UTC.
///
/// Accepts RFC 3339 (`2024-03-01T09:30:00+02:00`), a naive date-time
/// (`2024-03-01T09:30:00`, `2024-03-01 09:30:00`, taken as UTC) or a bare date
/// (`2024-03-01`, midnight UTC). Serializes as RFC 3339 with milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PublishDate(DateTime<Utc>);

impl PublishDate {
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
            return Some(Self(dt.with_timezone(&Utc)));
        }
        for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
                return Some(Self(naive.and_utc()));
            }
        }
        NaiveDate::parse_from_str(input, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|naive| Self(naive.and_utc()))
    }

    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }
}

impl From<DateTime<Utc>> for PublishDate {
    fn from(value: DateTime<Utc>) -> Self {
        Self(value)
    }
}

impl fmt::Display for PublishDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_rfc3339_opts(SecondsFormat::Millis, true))
    }
}

impl Serialize for PublishDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PublishDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        PublishDate::parse(&raw)
            .ok_or_else(|| de::Error::custom(format!("invalid date `{raw}`")))
    }
}

/// Accept a single string, a list of strings, or null.
fn string_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(s)) => vec![s],
        Some(OneOrMany::Many(v)) => v,
    })
}

// =============================================================================
// Schemas
// =============================================================================

/// Front-matter of a blog post.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostFields {
    pub title: String,
    pub date: PublishDate,
    #[serde(default, deserialize_with = "string_list")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lastmod: Option<PublishDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draft: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, deserialize_with = "string_list", skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
    /// Author slugs, matched against `authors/<slug>`.
    #[serde(default, deserialize_with = "string_list", skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bibliography: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canonical_url: Option<String>,
}

impl DocumentType for PostFields {
    const KIND: DocumentKind = DocumentKind::Post;
    const REQUIRED: &'static [RequiredField] =
        &[RequiredField::new("title"), RequiredField::new("date")];

    fn title(&self) -> &str {
        &self.title
    }

    fn date(&self) -> Option<PublishDate> {
        Some(self.date)
    }

    fn tags(&self) -> &[String] {
        &self.tags
    }

    fn is_draft(&self) -> bool {
        self.draft == Some(true)
    }

    fn bibliography(&self) -> Option<&str> {
        self.bibliography.as_deref()
    }

    fn structured_data(&self, paths: &DocumentPaths, site: &SiteConfig) -> Option<StructuredData> {
        Some(crate::computed::structured_data(self, paths, site))
    }
}

/// Front-matter of an author profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorFields {
    #[serde(alias = "title")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occupation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twitter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bluesky: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkedin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<String>,
}

impl DocumentType for AuthorFields {
    const KIND: DocumentKind = DocumentKind::Author;
    const REQUIRED: &'static [RequiredField] = &[RequiredField {
        name: "name",
        aliases: &["title"],
    }];

    fn title(&self) -> &str {
        &self.name
    }
}

// =============================================================================
// Records
// =============================================================================

/// Fields derived from a validated document. Never mutated after construction.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputedFields {
    #[serde(flatten)]
    pub paths: DocumentPaths,
    pub reading_time: ReadingTime,
    pub toc: Vec<TocEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structured_data: Option<StructuredData>,
}

/// Document body: the markdown after the front-matter block and its rendered HTML.
#[derive(Debug, Clone, Serialize)]
pub struct Body {
    pub raw: String,
    pub html: String,
}

/// A fully processed document.
#[derive(Debug, Clone, Serialize)]
pub struct Document<F> {
    #[serde(rename = "type")]
    pub kind: DocumentKind,
    #[serde(flatten)]
    pub fields: F,
    #[serde(flatten)]
    pub computed: ComputedFields,
    pub body: Body,
}

pub type Post = Document<PostFields>;
pub type Author = Document<AuthorFields>;

impl<F: DocumentType> Document<F> {
    pub fn new(fields: F, computed: ComputedFields, body: Body) -> Self {
        Self {
            kind: F::KIND,
            fields,
            computed,
            body,
        }
    }

    pub fn slug(&self) -> &str {
        &self.computed.paths.slug
    }

    pub fn path(&self) -> &str {
        &self.computed.paths.path
    }

    pub fn file_path(&self) -> &str {
        &self.computed.paths.file_path
    }

    /// Metadata and computed fields without the body.
    pub fn core_content(&self) -> CoreContent<F> {
        CoreContent {
            kind: self.kind,
            fields: self.fields.clone(),
            computed: self.computed.clone(),
        }
    }
}

/// Body-less projection of a [`Document`].
#[derive(Debug, Clone, Serialize)]
pub struct CoreContent<F> {
    #[serde(rename = "type")]
    pub kind: DocumentKind,
    #[serde(flatten)]
    pub fields: F,
    #[serde(flatten)]
    pub computed: ComputedFields,
}

/// Project every document to its core content, preserving order.
pub fn all_core_content<'a, F, I>(docs: I) -> Vec<CoreContent<F>>
where
    F: DocumentType + 'a,
    I: IntoIterator<Item = &'a Document<F>>,
{
    docs.into_iter().map(Document::core_content).collect()
}
