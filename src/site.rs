//! Build orchestration.
//!
//! ```text
//! config.toml ─┐
//!              ├─► SiteConfig ─► Registry ─► tag index    → app/tag-data.json
//! CLI options ─┘                        └─► search index → public/search.json
//! ```
//!
//! The registry is complete before anything is written: a document that
//! fails validation or rendering leaves every artifact untouched.

use crate::config::{self, ConfigError, SiteConfig};
use crate::emit::{self, EmitError, TagIndex};
use crate::registry::{Registry, RegistryError};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Emit(#[from] EmitError),
}

/// Whether drafts count towards published artifacts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BuildMode {
    #[default]
    Development,
    Production,
}

impl BuildMode {
    pub fn is_production(self) -> bool {
        self == BuildMode::Production
    }
}

/// Per-invocation settings layered over `config.toml`.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    pub mode: BuildMode,
    /// Replaces `base_path` from the config file when set.
    pub base_path: Option<String>,
}

/// Result of a successful build.
#[derive(Debug)]
pub struct BuildReport {
    pub site: SiteConfig,
    pub registry: Registry,
    pub tag_index: TagIndex,
    /// Files written, in the order they were written.
    pub artifacts: Vec<PathBuf>,
}

/// Resolve configuration for `root` with CLI overrides applied.
pub fn load_site_config(root: &Path, options: &BuildOptions) -> Result<SiteConfig, ConfigError> {
    let mut overlay = config::load_raw_config(root)?;
    if let Some(base_path) = &options.base_path {
        let mut table = toml::Table::new();
        table.insert("base_path".to_string(), toml::Value::String(base_path.clone()));
        let cli = toml::Value::Table(table);
        overlay = Some(match overlay {
            Some(file) => config::merge_toml(file, cli),
            None => cli,
        });
    }
    config::resolve_config(overlay)
}

/// Load configuration and every document without writing anything.
pub fn load(root: &Path, options: &BuildOptions) -> Result<(SiteConfig, Registry), BuildError> {
    let site = load_site_config(root, options)?;
    let registry = Registry::build(root, &site)?;
    Ok((site, registry))
}

/// Run the whole pipeline and write the tag and search indices.
pub fn build(root: &Path, options: &BuildOptions) -> Result<BuildReport, BuildError> {
    let (site, registry) = load(root, options)?;
    let production = options.mode.is_production();
    let tag_index = emit::tag_counts(registry.posts(), production);

    let mut artifacts = vec![emit::write_tag_index(root, &tag_index)?];
    if let Some(path) = emit::write_search_index(root, &site, registry.posts(), production)? {
        artifacts.push(path);
    }
    info!(mode = ?options.mode, artifacts = artifacts.len(), "build complete");

    Ok(BuildReport {
        site,
        registry,
        tag_index,
        artifacts,
    })
}
