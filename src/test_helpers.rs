//! Shared test utilities for the blogsmith test suite.
//!
//! Provides fixture setup, document writers and lookup helpers that work with
//! registry data (`Registry`, `Post`).
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = empty_site();
//! write_doc(tmp.path(), "blog/hello.md", &post_source("Hello", "2024-01-01", &["rust"]));
//!
//! let reg = load_registry(tmp.path());
//! let post = find_post(&reg, "hello");
//! assert_eq!(post.fields.tags, vec!["rust"]);
//! ```

use std::path::Path;
use tempfile::TempDir;

use crate::config::load_config;
use crate::document::Post;
use crate::registry::Registry;

/// A valid 1×1 RGBA PNG.
pub const TINY_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F, 0x15, 0xC4,
    0x89, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00, 0x01, 0x00, 0x00,
    0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE,
    0x42, 0x60, 0x82,
];

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/site/` to a temp directory and return it.
///
/// Tests get an isolated copy they can mutate without affecting other tests
/// or the source fixtures.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/site");
    copy_dir_recursive(&fixtures, tmp.path()).unwrap();
    tmp
}

/// A project root with an empty content directory and no config file.
pub fn empty_site() -> TempDir {
    let tmp = TempDir::new().unwrap();
    std::fs::create_dir_all(tmp.path().join("data")).unwrap();
    tmp
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            std::fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

// =========================================================================
// Document writers
// =========================================================================

/// Write a document at `data/<relative>` under `root`, creating directories.
pub fn write_doc(root: &Path, relative: &str, content: &str) {
    let path = root.join("data").join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

/// Minimal post source with the given front-matter values.
pub fn post_source(title: &str, date: &str, tags: &[&str]) -> String {
    let tags: Vec<String> = tags.iter().map(|t| format!("'{t}'")).collect();
    format!(
        "---\ntitle: '{title}'\ndate: '{date}'\ntags: [{}]\n---\n\nBody of {title}.\n",
        tags.join(", ")
    )
}

/// Like [`post_source`], marked `draft: true`.
pub fn draft_source(title: &str, date: &str, tags: &[&str]) -> String {
    post_source(title, date, tags).replacen("---\n\n", "draft: true\n---\n\n", 1)
}

// =========================================================================
// Registry lookups — panics with a clear message on miss
// =========================================================================

/// Load config and build the registry for `root`. Panics on failure.
pub fn load_registry(root: &Path) -> Registry {
    let site = load_config(root).unwrap();
    Registry::build(root, &site).unwrap_or_else(|e| panic!("registry build failed: {e}"))
}

/// Find a post by slug. Panics if not found.
pub fn find_post<'a>(registry: &'a Registry, slug: &str) -> &'a Post {
    registry.post(slug).unwrap_or_else(|| {
        let slugs: Vec<&str> = registry.posts().iter().map(|p| p.slug()).collect();
        panic!("post '{slug}' not found. Available: {slugs:?}")
    })
}
