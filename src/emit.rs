//! Post-processing emitters: the tag index and the local search index.
//!
//! Both run after the registry is complete and overwrite their output on
//! every build.
//!
//! | Artifact | Location | Format |
//! |----------|----------|--------|
//! | Tag index | `app/tag-data.json` | pretty JSON object, trailing newline |
//! | Search index | `<public_dir>/<search file>` | compact JSON array |
//!
//! Tag counts are keyed by [`tag_slug`], so `"Foo Bar"` and `"foo bar"` add to
//! the same entry. Keys keep the order in which they were first seen.

use crate::config::SiteConfig;
use crate::document::{CoreContent, Post, PostFields, all_core_content};
use crate::paths::tag_slug;
use crate::registry::sort_posts;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Tag index location relative to the project root.
pub const TAG_DATA_PATH: &str = "app/tag-data.json";

#[derive(Error, Debug)]
pub enum EmitError {
    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Tag slug → number of posts carrying it, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagIndex {
    entries: Vec<(String, usize)>,
}

impl TagIndex {
    fn add(&mut self, slug: String) {
        match self.entries.iter_mut().find(|(key, _)| *key == slug) {
            Some((_, count)) => *count += 1,
            None => self.entries.push((slug, 1)),
        }
    }

    pub fn get(&self, slug: &str) -> Option<usize> {
        self.entries
            .iter()
            .find(|(key, _)| key == slug)
            .map(|(_, count)| *count)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.entries.iter().map(|(key, count)| (key.as_str(), *count))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pretty-printed JSON with a trailing newline, as written to disk.
    pub fn to_json(&self) -> Result<String, EmitError> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }
}

impl Serialize for TagIndex {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, count) in &self.entries {
            map.serialize_entry(key, count)?;
        }
        map.end()
    }
}

/// Count tags across posts.
///
/// In production, drafts are skipped. A post counts once per distinct tag
/// slug, even if two of its tags normalize to the same slug.
pub fn tag_counts<'a, I>(posts: I, production: bool) -> TagIndex
where
    I: IntoIterator<Item = &'a Post>,
{
    let mut index = TagIndex::default();
    for post in posts {
        if production && post.fields.draft == Some(true) {
            continue;
        }
        let mut seen: Vec<String> = Vec::new();
        for tag in &post.fields.tags {
            let slug = tag_slug(tag);
            if !seen.contains(&slug) {
                seen.push(slug.clone());
                index.add(slug);
            }
        }
    }
    index
}

/// Write the tag index to `app/tag-data.json` under `root`.
pub fn write_tag_index(root: &Path, index: &TagIndex) -> Result<PathBuf, EmitError> {
    let path = root.join(TAG_DATA_PATH);
    write_file(&path, index.to_json()?.as_bytes())?;
    info!(path = %path.display(), tags = index.len(), "wrote tag index");
    Ok(path)
}

/// Newest-first core content of every post. Production builds leave drafts out.
pub fn search_documents<'a, I>(posts: I, production: bool) -> Vec<CoreContent<PostFields>>
where
    I: IntoIterator<Item = &'a Post>,
{
    let published = posts
        .into_iter()
        .filter(|post| !(production && post.fields.draft == Some(true)));
    all_core_content(sort_posts(published))
}

/// Write the local search index when the configured provider uses one.
///
/// Returns the written path, or `None` when the emitter is disabled.
pub fn write_search_index(
    root: &Path,
    site: &SiteConfig,
    posts: &[Post],
    production: bool,
) -> Result<Option<PathBuf>, EmitError> {
    let Some(file_name) = site.search_index_file() else {
        debug!(provider = ?site.search.provider, "search index disabled");
        return Ok(None);
    };
    let path = root.join(&site.public_dir).join(file_name);
    let documents = search_documents(posts, production);
    let json = serde_json::to_string(&documents)?;
    write_file(&path, json.as_bytes())?;
    info!(path = %path.display(), documents = documents.len(), "wrote search index");
    Ok(Some(path))
}

fn write_file(path: &Path, contents: &[u8]) -> Result<(), EmitError> {
    let wrap = |source| EmitError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(wrap)?;
    }
    fs::write(path, contents).map_err(wrap)
}
