//! CLI output formatting for the build commands.
//!
//! # Information-First Display
//!
//! Output is **information-centric, not file-centric**. The primary display
//! for every document is its semantic identity (positional index and title)
//! with source paths and derived fields shown as secondary context on
//! indented lines. The output reads as a content inventory while still letting
//! users trace each entry back to a file.
//!
//! # Output Format
//!
//! ## Check
//!
//! ```text
//! Posts
//! 001 Alerts and Citations (2023-02-02, 1 min read)
//!     Source: blog/alerts-and-citations.mdx
//!     Slug: alerts-and-citations
//!     Tags: Writing
//! 002 Unfinished Thoughts (2024-06-01, 1 min read)
//!     Source: blog/draft-post.md
//!     Slug: draft-post
//!     Draft
//!
//! Authors
//! 001 Tails Azimuth
//!     Source: authors/default.mdx
//!
//! Pipeline
//!     front-matter → gfm → code-titles → … → minify
//! ```
//!
//! ## Tags
//!
//! ```text
//! Tags
//!     next-js: 3
//!     writing: 1
//! ```
//!
//! ## Build
//!
//! The check listing, the tag listing, then:
//!
//! ```text
//! Wrote app/tag-data.json
//! Wrote public/search.json
//!
//! Built 5 posts, 1 author, 9 tags
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::document::Post;
use crate::emit::TagIndex;
use crate::registry::Registry;
use crate::render::StageId;
use crate::site::BuildReport;
use std::path::Path;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Format an entity header: positional index + title, with optional detail.
///
/// ```text
/// 001 Hello, World (2021-01-12, 1 min read)
/// 001 Tails Azimuth
/// ```
fn entity_header(index: usize, title: &str, detail: Option<&str>) -> String {
    match detail {
        Some(d) => format!("{} {} ({})", format_index(index), title, d),
        None => format!("{} {}", format_index(index), title),
    }
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{n} {one}")
    } else {
        format!("{n} {many}")
    }
}

fn post_lines(index: usize, post: &Post) -> Vec<String> {
    let date = post.fields.date.as_datetime().format("%Y-%m-%d");
    let detail = format!("{date}, {}", post.computed.reading_time.text);
    let mut lines = vec![
        entity_header(index, &post.fields.title, Some(&detail)),
        format!("{}Source: {}", indent(1), post.file_path()),
        format!("{}Slug: {}", indent(1), post.slug()),
    ];
    if !post.fields.tags.is_empty() {
        lines.push(format!("{}Tags: {}", indent(1), post.fields.tags.join(", ")));
    }
    if post.fields.draft == Some(true) {
        lines.push(format!("{}Draft", indent(1)));
    }
    lines
}

// ============================================================================
// Check
// ============================================================================

/// Inventory of every loaded document, posts newest first.
pub fn format_check_output(registry: &Registry, stages: &[StageId]) -> Vec<String> {
    let mut lines = vec!["Posts".to_string()];
    for (i, post) in registry.sorted_posts().into_iter().enumerate() {
        lines.extend(post_lines(i + 1, post));
    }

    if !registry.authors().is_empty() {
        lines.push(String::new());
        lines.push("Authors".to_string());
        for (i, author) in registry.authors().iter().enumerate() {
            lines.push(entity_header(i + 1, &author.fields.name, None));
            lines.push(format!("{}Source: {}", indent(1), author.file_path()));
        }
    }

    if !stages.is_empty() {
        let names: Vec<&str> = stages.iter().map(|s| s.name()).collect();
        lines.push(String::new());
        lines.push("Pipeline".to_string());
        lines.push(format!("{}{}", indent(1), names.join(" → ")));
    }
    lines
}

pub fn print_check_output(registry: &Registry, stages: &[StageId]) {
    for line in format_check_output(registry, stages) {
        println!("{}", line);
    }
}

// ============================================================================
// Tags
// ============================================================================

pub fn format_tag_index(index: &TagIndex) -> Vec<String> {
    let mut lines = vec!["Tags".to_string()];
    if index.is_empty() {
        lines.push(format!("{}(none)", indent(1)));
    }
    for (slug, count) in index.iter() {
        lines.push(format!("{}{}: {}", indent(1), slug, count));
    }
    lines
}

pub fn print_tag_index(index: &TagIndex) {
    for line in format_tag_index(index) {
        println!("{}", line);
    }
}

// ============================================================================
// Build
// ============================================================================

/// Full build summary. Artifact paths are shown relative to `root`.
pub fn format_build_output(report: &BuildReport, root: &Path) -> Vec<String> {
    let mut lines = format_check_output(&report.registry, &[]);
    lines.push(String::new());
    lines.extend(format_tag_index(&report.tag_index));
    lines.push(String::new());
    for artifact in &report.artifacts {
        let shown = artifact.strip_prefix(root).unwrap_or(artifact);
        lines.push(format!("Wrote {}", shown.display()));
    }
    lines.push(String::new());
    lines.push(format!(
        "Built {}, {}, {}",
        plural(report.registry.posts().len(), "post", "posts"),
        plural(report.registry.authors().len(), "author", "authors"),
        plural(report.tag_index.len(), "tag", "tags"),
    ));
    lines
}

pub fn print_build_output(report: &BuildReport, root: &Path) {
    for line in format_build_output(report, root) {
        println!("{}", line);
    }
}
