//! Pandoc-style citations against a CSL-JSON bibliography.
//!
//! `[@smith2020]` or `[@smith2020; @doe2019]` in running text becomes an
//! author-date link to a reference entry, and the cited works are listed in
//! a `#refs` block at the end of the document. Documents without a
//! `bibliography` front-matter key pass through untouched.

use super::{RenderContext, RenderError, Stage, StageId};
use maud::{Markup, html};
use pulldown_cmark::{CowStr, Event, Tag, TagEnd};
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

const CITATION_PATTERN: &str = r"\[\s*@[\w:./-]+(?:\s*;\s*@[\w:./-]+)*\s*\]";

#[derive(Debug, Clone, Deserialize)]
pub struct CslName {
    #[serde(default)]
    pub family: Option<String>,
    #[serde(default)]
    pub given: Option<String>,
    #[serde(default)]
    pub literal: Option<String>,
}

impl CslName {
    fn short(&self) -> &str {
        self.family
            .as_deref()
            .or(self.literal.as_deref())
            .unwrap_or("Anonymous")
    }

    /// `Family, G.` for the reference list.
    fn full(&self) -> String {
        match (&self.family, &self.given) {
            (Some(family), Some(given)) => {
                let initials: Vec<String> = given
                    .split_whitespace()
                    .filter_map(|part| part.chars().next())
                    .map(|c| format!("{c}."))
                    .collect();
                format!("{family}, {}", initials.join(" "))
            }
            _ => self.short().to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CslDate {
    #[serde(rename = "date-parts", default)]
    pub date_parts: Vec<Vec<serde_json::Value>>,
}

/// One CSL-JSON item.
#[derive(Debug, Clone, Deserialize)]
pub struct CslEntry {
    pub id: String,
    #[serde(default)]
    pub author: Vec<CslName>,
    #[serde(default)]
    pub issued: Option<CslDate>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(rename = "container-title", default)]
    pub container_title: Option<String>,
    #[serde(rename = "URL", default)]
    pub url: Option<String>,
    #[serde(rename = "DOI", default)]
    pub doi: Option<String>,
}

impl CslEntry {
    fn year(&self) -> String {
        self.issued
            .as_ref()
            .and_then(|d| d.date_parts.first())
            .and_then(|parts| parts.first())
            .map(|year| match year {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .unwrap_or_else(|| "n.d.".to_string())
    }

    /// `Smith`, `Smith & Jones`, `Smith et al.`
    fn author_label(&self) -> String {
        match self.author.as_slice() {
            [] => self.title.clone().unwrap_or_else(|| self.id.clone()),
            [one] => one.short().to_string(),
            [a, b] => format!("{} & {}", a.short(), b.short()),
            [first, ..] => format!("{} et al.", first.short()),
        }
    }

    fn sort_key(&self) -> (String, String) {
        let name = self
            .author
            .first()
            .map(|a| a.short().to_lowercase())
            .unwrap_or_default();
        (name, self.year())
    }

    fn anchor(&self) -> String {
        format!("bib-{}", self.id.to_lowercase())
    }

    fn reference(&self) -> Markup {
        let authors: Vec<String> = self.author.iter().map(CslName::full).collect();
        let link = self
            .doi
            .as_ref()
            .map(|doi| format!("https://doi.org/{doi}"))
            .or_else(|| self.url.clone());
        html! {
            div class="csl-entry" id=(self.anchor()) {
                @if !authors.is_empty() { (authors.join(", ")) " " }
                "(" (self.year()) ")."
                @if let Some(title) = &self.title { " " (title) "." }
                @if let Some(container) = &self.container_title { " " i { (container) } "." }
                @if let Some(link) = &link { " " a href=(link) { (link) } }
            }
        }
    }
}

/// A parsed CSL-JSON bibliography.
#[derive(Debug, Clone, Default)]
pub struct Bibliography {
    entries: HashMap<String, CslEntry>,
}

impl Bibliography {
    pub fn load(path: &Path) -> Result<Self, RenderError> {
        let text = fs::read_to_string(path).map_err(|source| RenderError::BibliographyIo {
            path: path.to_path_buf(),
            source,
        })?;
        let items: Vec<CslEntry> =
            serde_json::from_str(&text).map_err(|source| RenderError::BibliographyJson {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::from_entries(items))
    }

    pub fn from_entries(items: Vec<CslEntry>) -> Self {
        Self {
            entries: items.into_iter().map(|e| (e.id.clone(), e)).collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&CslEntry> {
        self.entries.get(key)
    }
}

/// Resolves `[@key]` citations.
pub struct CitationStage {
    pattern: Regex,
}

impl CitationStage {
    pub fn new() -> Result<Self, RenderError> {
        Ok(Self {
            pattern: Regex::new(CITATION_PATTERN)?,
        })
    }

    /// Inline HTML for one bracketed citation group.
    fn cite<'b>(
        &self,
        group: &str,
        bib: &'b Bibliography,
        cited: &mut Vec<&'b CslEntry>,
    ) -> Result<String, RenderError> {
        let mut parts = Vec::new();
        for key in group
            .trim_matches(|c| c == '[' || c == ']')
            .split(';')
            .map(|k| k.trim().trim_start_matches('@'))
        {
            let entry = bib
                .get(key)
                .ok_or_else(|| RenderError::UnknownCitation(key.to_string()))?;
            if !cited.iter().any(|c| c.id == entry.id) {
                cited.push(entry);
            }
            let label = format!("{}, {}", entry.author_label(), entry.year());
            parts.push(html! { a href=(format!("#{}", entry.anchor())) { (label) } }.into_string());
        }
        Ok(format!("({})", parts.join("; ")))
    }
}

impl Stage for CitationStage {
    fn id(&self) -> StageId {
        StageId::Citation
    }

    fn transform<'a>(
        &self,
        events: Vec<Event<'a>>,
        ctx: &RenderContext<'_>,
    ) -> Result<Vec<Event<'a>>, RenderError> {
        let Some(file) = ctx.bibliography else {
            return Ok(events);
        };
        let bib = Bibliography::load(&ctx.content_root.join(file))?;

        let mut cited: Vec<&CslEntry> = Vec::new();
        let mut in_code = false;
        let mut out = Vec::with_capacity(events.len());
        for event in events {
            match event {
                Event::Start(Tag::CodeBlock(_)) => {
                    in_code = true;
                    out.push(event);
                }
                Event::End(TagEnd::CodeBlock) => {
                    in_code = false;
                    out.push(event);
                }
                Event::Text(text) if !in_code && self.pattern.is_match(&text) => {
                    let mut last = 0;
                    for m in self.pattern.find_iter(&text) {
                        if m.start() > last {
                            out.push(Event::Text(CowStr::from(text[last..m.start()].to_string())));
                        }
                        let html = self.cite(m.as_str(), &bib, &mut cited)?;
                        out.push(Event::InlineHtml(html.into()));
                        last = m.end();
                    }
                    if last < text.len() {
                        out.push(Event::Text(CowStr::from(text[last..].to_string())));
                    }
                }
                other => out.push(other),
            }
        }

        if !cited.is_empty() {
            cited.sort_by_key(|e| e.sort_key());
            let refs = html! {
                div id="refs" class="references csl-bib-body" {
                    @for entry in &cited { (entry.reference()) }
                }
            };
            out.push(Event::Html(format!("{}\n", refs.into_string()).into()));
        }
        Ok(out)
    }
}
