//! Document discovery and loading.
//!
//! The registry walks the content directory once, turns every source file into
//! a typed [`Document`], and holds the results for the emitters.
//!
//! ## Directory Structure
//!
//! ```text
//! data/                            # Content root (`content_dir`)
//! ├── blog/                        # Posts
//! │   ├── hello-world.mdx          # slug: hello-world
//! │   └── nested-route/
//! │       └── part-one.mdx         # slug: nested-route/part-one
//! ├── authors/                     # Author profiles
//! │   └── default.mdx              # slug: default
//! └── references-data.json         # Bibliographies live anywhere under the root
//! ```
//!
//! Only `.md` and `.mdx` files are documents. Entries are visited in sorted
//! file-name order, directory by directory, and that order is the registry's
//! discovery order.
//!
//! ## Loading a Document
//!
//! 1. split off the front-matter block
//! 2. validate it against the type's schema
//! 3. derive `slug`, `path` and `filePath`
//! 4. render the body through the [`Pipeline`]
//! 5. resolve computed fields
//!
//! Any failure aborts the whole build: a registry either holds every document
//! or does not exist.

use crate::computed::{self, ResolveContext};
use crate::config::SiteConfig;
use crate::document::{Author, Body, Document, DocumentKind, DocumentType, Post};
use crate::frontmatter::{self, FrontMatterError};
use crate::paths::derive_paths;
use crate::render::{Pipeline, RenderContext, RenderError};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("content directory not found: {0}")]
    ContentRootMissing(PathBuf),
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),
    #[error(transparent)]
    FrontMatter(#[from] FrontMatterError),
    #[error("{file}: {source}")]
    Render {
        file: String,
        #[source]
        source: RenderError,
    },
    #[error("pipeline setup failed: {0}")]
    Pipeline(#[source] RenderError),
    #[error("{kind} slug `{slug}` is produced by both {first} and {second}")]
    SlugCollision {
        kind: DocumentKind,
        slug: String,
        first: String,
        second: String,
    },
}

/// Every loaded document, in discovery order.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    posts: Vec<Post>,
    authors: Vec<Author>,
}

impl Registry {
    /// Discover and load all documents under `root`'s content directory.
    pub fn build(root: &Path, site: &SiteConfig) -> Result<Self, RegistryError> {
        let pipeline = Pipeline::standard(&site.markdown).map_err(RegistryError::Pipeline)?;
        let loader = Loader::new(root, site, &pipeline);
        if !loader.content_root.is_dir() {
            return Err(RegistryError::ContentRootMissing(loader.content_root));
        }

        let posts: Vec<Post> = loader.load_all()?;
        let authors: Vec<Author> = loader.load_all()?;
        info!(posts = posts.len(), authors = authors.len(), "registry built");
        Ok(Self { posts, authors })
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn authors(&self) -> &[Author] {
        &self.authors
    }

    pub fn post(&self, slug: &str) -> Option<&Post> {
        self.posts.iter().find(|p| p.slug() == slug)
    }

    pub fn author(&self, slug: &str) -> Option<&Author> {
        self.authors.iter().find(|a| a.slug() == slug)
    }

    /// Posts newest first; see [`sort_posts`].
    pub fn sorted_posts(&self) -> Vec<&Post> {
        sort_posts(&self.posts)
    }
}

/// Order posts by date, newest first.
///
/// The sort is stable: posts sharing a date keep their relative input order.
pub fn sort_posts<'a, I>(posts: I) -> Vec<&'a Post>
where
    I: IntoIterator<Item = &'a Post>,
{
    let mut sorted: Vec<&Post> = posts.into_iter().collect();
    sorted.sort_by(|a, b| b.fields.date.cmp(&a.fields.date));
    sorted
}

/// Source files of one document type, relative to the content root.
///
/// A missing type directory yields no documents.
pub fn discover(content_root: &Path, kind: DocumentKind) -> Result<Vec<PathBuf>, RegistryError> {
    let dir = content_root.join(kind.directory());
    if !dir.is_dir() {
        debug!(dir = %dir.display(), "no {kind} directory");
        return Ok(Vec::new());
    }

    let mut found = Vec::new();
    for entry in WalkDir::new(&dir).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() || !is_document(entry.path()) {
            continue;
        }
        if let Ok(relative) = entry.path().strip_prefix(content_root) {
            found.push(relative.to_path_buf());
        }
    }
    Ok(found)
}

fn is_document(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("md") || e.eq_ignore_ascii_case("mdx"))
}

fn check_unique_slugs<F: DocumentType>(docs: &[Document<F>]) -> Result<(), RegistryError> {
    let mut seen: HashMap<&str, &str> = HashMap::new();
    for doc in docs {
        if let Some(first) = seen.insert(doc.slug(), doc.file_path()) {
            return Err(RegistryError::SlugCollision {
                kind: F::KIND,
                slug: doc.slug().to_string(),
                first: first.to_string(),
                second: doc.file_path().to_string(),
            });
        }
    }
    Ok(())
}

/// Shared state for loading every document of one build.
struct Loader<'a> {
    content_root: PathBuf,
    public_dir: PathBuf,
    site: &'a SiteConfig,
    pipeline: &'a Pipeline,
}

impl<'a> Loader<'a> {
    fn new(root: &Path, site: &'a SiteConfig, pipeline: &'a Pipeline) -> Self {
        Self {
            content_root: root.join(&site.content_dir),
            public_dir: root.join(&site.public_dir),
            site,
            pipeline,
        }
    }

    fn load_all<F: DocumentType>(&self) -> Result<Vec<Document<F>>, RegistryError> {
        let docs = discover(&self.content_root, F::KIND)?
            .iter()
            .map(|relative| self.load(relative))
            .collect::<Result<Vec<_>, _>>()?;
        check_unique_slugs(&docs)?;
        Ok(docs)
    }

    fn load<F: DocumentType>(&self, relative: &Path) -> Result<Document<F>, RegistryError> {
        let full = self.content_root.join(relative);
        let source = fs::read_to_string(&full).map_err(|source| RegistryError::Read {
            path: full.clone(),
            source,
        })?;
        let source = source.strip_prefix('\u{feff}').unwrap_or(&source);

        let paths = derive_paths(relative);
        let file = paths.file_path.clone();
        let split = frontmatter::split(source, &file)?;
        let fields: F = frontmatter::parse(split.yaml, &file)?;

        let ctx = RenderContext {
            file: &file,
            content_root: &self.content_root,
            public_dir: &self.public_dir,
            bibliography: fields.bibliography(),
        };
        let html = self
            .pipeline
            .render(source, &ctx)
            .map_err(|source| RegistryError::Render {
                file: file.clone(),
                source,
            })?;

        let resolve = ResolveContext {
            site: self.site,
            options: self.pipeline.parser_options(),
        };
        let computed = computed::resolve(&fields, paths, split.body, &resolve);
        debug!(file = %file, kind = %F::KIND, words = computed.reading_time.words, "loaded");

        Ok(Document::new(
            fields,
            computed,
            Body {
                raw: split.body.to_string(),
                html,
            },
        ))
    }
}
