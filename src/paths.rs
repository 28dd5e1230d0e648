//! Source path → URL path derivation.
//!
//! Every document is addressed by where it lives under the content directory.
//! Three strings are derived from that location and nothing else:
//!
//! - `filePath`: the relative source path, extension included
//!   (`blog/nested/hello.mdx`)
//! - `path`: the flattened path, extension removed (`blog/nested/hello`)
//! - `slug`: the flattened path with its leading directory segment removed
//!   (`nested/hello`)
//!
//! The leading segment is the document-type directory (`blog`, `authors`), so
//! stripping it yields the identifier the router mounts under its own prefix.
//!
//! Tags go through [`tag_slug`] so that `"Foo Bar"`, `"foo bar"` and
//! `"Foo-Bar"` all land on the same key. Tag keys use the same GitHub slug
//! as heading anchors, without the per-document numbering.

use serde::Serialize;
use std::collections::HashMap;
use std::path::{Component, Path};

/// Paths derived from a document's location under the content root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentPaths {
    /// `path` minus its first segment.
    pub slug: String,
    /// Relative path, `/`-separated, extension stripped.
    pub path: String,
    /// Relative source path exactly as discovered.
    pub file_path: String,
}

/// Derive `slug`, `path` and `filePath` from a path relative to the content root.
///
/// - `blog/hello.mdx` → slug=`hello`, path=`blog/hello`
/// - `blog/2024/deep/post.md` → slug=`2024/deep/post`, path=`blog/2024/deep/post`
/// - `hello.md` → slug=`hello`, path=`hello` (nothing to strip)
pub fn derive_paths(relative: &Path) -> DocumentPaths {
    let segments: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    let file_path = segments.join("/");
    let path = match segments.split_last() {
        Some((last, dirs)) => {
            let stem = match last.rfind('.') {
                Some(dot) if dot > 0 => &last[..dot],
                _ => last.as_str(),
            };
            dirs.iter()
                .map(String::as_str)
                .chain(std::iter::once(stem))
                .collect::<Vec<_>>()
                .join("/")
        }
        None => String::new(),
    };

    DocumentPaths {
        slug: strip_first_segment(&path).to_string(),
        path,
        file_path,
    }
}

/// Drop everything up to and including the first `/`.
pub fn strip_first_segment(path: &str) -> &str {
    match path.split_once('/') {
        Some((_, rest)) => rest,
        None => path,
    }
}

/// Normalize a tag into its index key.
pub fn tag_slug(tag: &str) -> String {
    anchor_slug(tag)
}

/// Heading anchor generator with per-document deduplication.
///
/// Slugs follow GitHub's heading rules: lowercase, spaces become `-`,
/// punctuation other than `-` and `_` is dropped, non-ASCII letters are
/// kept. A repeated slug gets `-1`, `-2`, … appended.
#[derive(Debug, Default)]
pub struct AnchorSlugger {
    occurrences: HashMap<String, usize>,
}

impl AnchorSlugger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Slug `text` and make it unique within this document.
    pub fn anchor_for(&mut self, text: &str) -> String {
        let base = anchor_slug(text);
        let base = if base.is_empty() {
            "section".to_string()
        } else {
            base
        };
        self.reserve(&base)
    }

    /// Claim an id chosen by the author, deduplicated like generated ones.
    pub fn reserve(&mut self, id: &str) -> String {
        let mut result = id.to_string();
        while self.occurrences.contains_key(&result) {
            let count = self.occurrences.entry(id.to_string()).or_insert(0);
            *count += 1;
            result = format!("{id}-{count}");
        }
        self.occurrences.insert(result.clone(), 0);
        result
    }
}

/// Undeduplicated GitHub-style heading slug.
pub fn anchor_slug(text: &str) -> String {
    text.trim()
        .chars()
        .flat_map(char::to_lowercase)
        .filter_map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                Some(c)
            } else if c.is_whitespace() {
                Some('-')
            } else {
                None
            }
        })
        .collect()
}
