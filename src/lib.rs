//! # Blogsmith
//!
//! A content build pipeline for markdown blogs. Posts and author profiles are
//! markdown files with YAML front-matter; the filesystem is the data source and
//! each file's path under the content root becomes its URL slug.
//!
//! # Architecture: Load Everything, Then Emit
//!
//! ```text
//! data/**/*.md(x) ─► frontmatter ─► render pipeline ─► computed fields ─► Registry
//!                                                                            │
//!                                          app/tag-data.json ◄── tag index ──┤
//!                                        public/search.json ◄── search index ┘
//! ```
//!
//! Every document is parsed, validated, and rendered before a single byte is
//! written. A missing required field or a failing render stage aborts the build
//! with the offending file named and no artifact touched.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`paths`] | Slug, path, and file-path derivation; heading anchor slugs |
//! | [`frontmatter`] | Splits and deserializes the YAML block at the top of a document |
//! | [`document`] | Typed documents (`Post`, `Author`), computed fields, core-content projection |
//! | [`render`] | Ordered markdown/HTML enrichment stages over a pulldown-cmark event stream |
//! | [`computed`] | Reading time, table of contents, and schema.org structured data |
//! | [`registry`] | Discovers and loads every document; stable newest-first sort |
//! | [`emit`] | Tag index and search index writers |
//! | [`site`] | Build orchestration: config overrides, load, emit |
//! | [`config`] | `config.toml` loading, validation, and stock defaults |
//! | [`output`] | CLI output formatting for `build`, `check`, and `tags` |
//!
//! # Design Decisions
//!
//! ## Typed Front-Matter
//!
//! Each document type declares its fields as a serde struct. Required fields are
//! checked by name before deserialization so the error reads
//! ``blog/foo.md: missing required field `title` `` rather than a serde path.
//! Unknown keys are logged and ignored so authors can carry extra metadata.
//!
//! ## Event-Stream Stages
//!
//! The enrichment chain is a list of [`render::Stage`] values, each rewriting
//! the pulldown-cmark event stream. Ordering constraints (headings get ids
//! before they get anchors, math is parsed before KaTeX sees it) are declared on
//! [`render::StageId`] and checked once when the pipeline is assembled.
//!
//! ## Maud For Generated Markup
//!
//! Anchors, alert titles, images, and bibliography entries are built with
//! [Maud](https://maud.lambda.xyz/), so interpolated front-matter and citation
//! text is escaped without a separate sanitizing pass.

pub mod computed;
pub mod config;
pub mod document;
pub mod emit;
pub mod frontmatter;
pub mod output;
pub mod paths;
pub mod registry;
pub mod render;
pub mod site;

#[cfg(test)]
pub(crate) mod test_helpers;
