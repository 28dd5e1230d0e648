//! Site configuration module.
//!
//! Handles loading, validating, and merging `config.toml`. Stock defaults are
//! serialized to a TOML table and the user's file is merged on top, so a
//! config file only needs the keys it wants to change.
//!
//! ## Config File Location
//!
//! ```text
//! my-blog/
//! ├── config.toml              # Site config (optional)
//! ├── data/                    # Content root
//! │   ├── blog/*.mdx
//! │   └── authors/*.mdx
//! ├── public/                  # Static files; search index lands here
//! └── app/tag-data.json        # Written by the tag emitter
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! title = "My Blog"
//! author = "Jane Doe"
//! site_url = "https://example.com"
//! social_banner = "/static/images/twitter-card.png"
//! base_path = ""
//! content_dir = "data"
//! public_dir = "public"
//!
//! [search]
//! provider = "kbar"          # kbar | algolia | none
//!
//! [search.kbar]
//! search_documents_path = "search.json"
//!
//! [markdown]
//! default_code_language = "js"
//! words_per_minute = 200
//! ```
//!
//! Unknown keys are rejected to catch typos early.
//!
//! The configuration is a plain value: the build constructs it once and hands
//! a reference to every component that needs it.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// File name looked up at the project root.
pub const CONFIG_FILE: &str = "config.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Site configuration loaded from `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Site title.
    pub title: String,
    /// Default author name.
    pub author: String,
    /// Absolute production URL, no trailing slash. Structured data URLs are built from it.
    pub site_url: String,
    /// Social card image used when a post has no images of its own.
    pub social_banner: String,
    /// Path prefix when the site is served from a sub-directory (e.g. `/blog`).
    pub base_path: String,
    /// Content directory, relative to the project root.
    pub content_dir: String,
    /// Public static directory, relative to the project root.
    pub public_dir: String,
    /// Search provider selection.
    pub search: SearchConfig,
    /// Markdown pipeline settings.
    pub markdown: MarkdownConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "Next.js Starter Blog".to_string(),
            author: "Tails Azimuth".to_string(),
            site_url: "https://tailwind-nextjs-starter-blog.vercel.app".to_string(),
            social_banner: "/static/images/twitter-card.png".to_string(),
            base_path: String::new(),
            content_dir: "data".to_string(),
            public_dir: "public".to_string(),
            search: SearchConfig::default(),
            markdown: MarkdownConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.site_url.starts_with("http://") || self.site_url.starts_with("https://")) {
            return Err(ConfigError::Validation(
                "site_url must be an absolute http(s) URL".into(),
            ));
        }
        if self.markdown.words_per_minute == 0 {
            return Err(ConfigError::Validation(
                "markdown.words_per_minute must be non-zero".into(),
            ));
        }
        if self.content_dir.trim().is_empty() {
            return Err(ConfigError::Validation(
                "content_dir must not be empty".into(),
            ));
        }
        if !self.base_path.is_empty() && !self.base_path.starts_with('/') {
            return Err(ConfigError::Validation(
                "base_path must be empty or start with '/'".into(),
            ));
        }
        Ok(())
    }

    /// Social banner with the base path prefix applied.
    pub fn social_banner_url(&self) -> String {
        format!("{}{}", self.base_path, self.social_banner)
    }

    /// Absolute URL of a document given its flattened path.
    pub fn document_url(&self, path: &str) -> String {
        format!("{}/{}", self.site_url.trim_end_matches('/'), path)
    }

    /// Output location of the local search index, if one should be written.
    ///
    /// Only the final path component of the configured path is used; the file
    /// always lands at the root of the public directory.
    pub fn search_index_file(&self) -> Option<String> {
        match self.search.provider {
            SearchProvider::Kbar => Path::new(&self.search.kbar.search_documents_path)
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .filter(|name| !name.is_empty()),
            SearchProvider::Algolia | SearchProvider::None => None,
        }
    }
}

/// Search provider selection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchConfig {
    pub provider: SearchProvider,
    /// Local (kbar) search settings.
    pub kbar: KbarConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchProvider {
    /// Client-side search over a JSON index emitted at build time.
    #[default]
    Kbar,
    /// Hosted search; nothing is emitted.
    Algolia,
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KbarConfig {
    /// Where the client fetches the search documents from. Empty disables the emitter.
    pub search_documents_path: String,
}

impl Default for KbarConfig {
    fn default() -> Self {
        Self {
            search_documents_path: "search.json".to_string(),
        }
    }
}

/// Markdown pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MarkdownConfig {
    /// Language assumed for code blocks without one.
    pub default_code_language: String,
    /// Reading speed used by the reading-time estimate.
    pub words_per_minute: u32,
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        Self {
            default_code_language: "js".to_string(),
            words_per_minute: 200,
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(SiteConfig::default())
        .map_err(|e| ConfigError::Validation(format!("default config must serialize: {e}")))
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(root: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = root.join(CONFIG_FILE);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto the stock defaults, then deserialize and validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<SiteConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `config.toml` in the project root.
pub fn load_config(root: &Path) -> Result<SiteConfig, ConfigError> {
    resolve_config(load_raw_config(root)?)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Blogsmith Configuration
# =======================
# All options are optional. Values shown are the defaults.
# Unknown keys are rejected.

# Site title and default author.
title = "Next.js Starter Blog"
author = "Tails Azimuth"

# Absolute production URL (no trailing slash). Used for structured data.
site_url = "https://tailwind-nextjs-starter-blog.vercel.app"

# Fallback image for structured data when a post has no images.
social_banner = "/static/images/twitter-card.png"

# Prefix for sites served from a sub-directory, e.g. "/blog".
# Overridden by --base-path or the BASE_PATH environment variable.
base_path = ""

# Content directory (contains blog/ and authors/), relative to the project root.
content_dir = "data"

# Static public directory. Local images are resolved here and the search
# index is written here.
public_dir = "public"

# ---------------------------------------------------------------------------
# Search
# ---------------------------------------------------------------------------
[search]
# "kbar" writes a local search index, "algolia" and "none" write nothing.
provider = "kbar"

[search.kbar]
# Only the file name is used; the index is written to <public_dir>/<name>.
# Leave empty to disable the index.
search_documents_path = "search.json"

# ---------------------------------------------------------------------------
# Markdown
# ---------------------------------------------------------------------------
[markdown]
# Language used to highlight code blocks that do not name one.
default_code_language = "js"

# Reading speed for the reading-time estimate.
words_per_minute = 200
"##
}
