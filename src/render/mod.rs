//! Markdown rendering pipeline.
//!
//! A document body goes through a declared, ordered list of named stages.
//! Markdown is parsed once with the union of every stage's parser options;
//! each stage then rewrites the event stream in turn, the stream is turned
//! into HTML, and output-phase stages post-process the final string.
//!
//! ## Stages
//!
//! | # | Stage | Phase | Requires earlier |
//! |---|-------|-------|------------------|
//! | 1 | `front-matter` | markdown | (must be first) |
//! | 2 | `gfm` | markdown | |
//! | 3 | `code-titles` | markdown | |
//! | 4 | `math` | markdown | |
//! | 5 | `image-tags` | markdown | |
//! | 6 | `alerts` | markdown | |
//! | 7 | `heading-ids` | html | |
//! | 8 | `autolink-headings` | html | `heading-ids` |
//! | 9 | `katex` | html | `math` |
//! | 10 | `katex-notranslate` | html | `katex` |
//! | 11 | `citation` | html | |
//! | 12 | `highlight` | html | `code-titles` |
//! | 13 | `minify` | output | (must be last) |
//!
//! `front-matter` cuts the source down to the body before parsing, using the
//! same splitter that validates the front-matter, so the YAML block never
//! reaches the parser and `---` fences later in the body stay ordinary markdown.
//!
//! "HTML phase" stages work on the same event stream as markdown stages but
//! only after every markdown stage has run, so they see headings, math and
//! code blocks in their final structural form. They produce raw HTML events
//! where the default renderer would not do.
//!
//! [`Pipeline::new`] rejects any ordering that breaks the table above: a
//! missing or later dependency, a duplicate stage, a phase going backwards, or
//! `front-matter`/`minify` out of place.

mod citation;
mod headings;
mod highlight;
mod markdown;
mod math;
mod minify;

pub use citation::{Bibliography, CitationStage};
pub use headings::{AutolinkHeadingsStage, HeadingIdsStage, heading_text};
pub use highlight::HighlightStage;
pub use markdown::{
    AlertsStage, CodeTitlesStage, FrontMatterStage, GfmStage, ImageTagsStage, MathStage,
};
pub use math::{KatexNoTranslateStage, KatexStage};
pub use minify::MinifyStage;

use crate::config::MarkdownConfig;
use crate::frontmatter::FrontMatterError;
use pulldown_cmark::{Event, Options, Parser, TextMergeStream};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("stage `{stage}` requires `{requires}` to run before it")]
    MissingDependency { stage: StageId, requires: StageId },
    #[error("stage `{stage}` must run after `{after}`")]
    OutOfOrder { stage: StageId, after: StageId },
    #[error("stage `{0}` appears more than once")]
    Duplicate(StageId),
    #[error("stage `{0}` must be the first stage")]
    NotFirst(StageId),
    #[error("stage `{0}` must be the last stage")]
    NotLast(StageId),
    #[error("{phase} stage `{stage}` cannot follow {previous} stages")]
    PhaseOrder {
        stage: StageId,
        phase: Phase,
        previous: Phase,
    },
    #[error(transparent)]
    FrontMatter(#[from] FrontMatterError),
    #[error("heading has no id; run `heading-ids` first")]
    MissingHeadingId,
    #[error("math rendering failed for `{expr}`: {source}")]
    Math {
        expr: String,
        #[source]
        source: katex::Error,
    },
    #[error("invalid math options: {0}")]
    MathOptions(String),
    #[error("unknown citation key `@{0}`")]
    UnknownCitation(String),
    #[error("cannot read bibliography {path}: {source}")]
    BibliographyIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid bibliography {path}: {source}")]
    BibliographyJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("syntax highlighting failed for `{language}`: {source}")]
    Highlight {
        language: String,
        #[source]
        source: syntect::Error,
    },
    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error("minified output is not valid UTF-8: {0}")]
    Minify(#[from] std::string::FromUtf8Error),
}

/// When a stage runs relative to HTML generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Markdown,
    Html,
    Output,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Markdown => "markdown",
            Phase::Html => "html",
            Phase::Output => "output",
        })
    }
}

/// Every stage the pipeline knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageId {
    FrontMatter,
    Gfm,
    CodeTitles,
    Math,
    ImageTags,
    Alerts,
    HeadingIds,
    AutolinkHeadings,
    Katex,
    KatexNoTranslate,
    Citation,
    Highlight,
    Minify,
}

impl StageId {
    pub fn name(self) -> &'static str {
        match self {
            StageId::FrontMatter => "front-matter",
            StageId::Gfm => "gfm",
            StageId::CodeTitles => "code-titles",
            StageId::Math => "math",
            StageId::ImageTags => "image-tags",
            StageId::Alerts => "alerts",
            StageId::HeadingIds => "heading-ids",
            StageId::AutolinkHeadings => "autolink-headings",
            StageId::Katex => "katex",
            StageId::KatexNoTranslate => "katex-notranslate",
            StageId::Citation => "citation",
            StageId::Highlight => "highlight",
            StageId::Minify => "minify",
        }
    }

    pub fn phase(self) -> Phase {
        match self {
            StageId::FrontMatter
            | StageId::Gfm
            | StageId::CodeTitles
            | StageId::Math
            | StageId::ImageTags
            | StageId::Alerts => Phase::Markdown,
            StageId::HeadingIds
            | StageId::AutolinkHeadings
            | StageId::Katex
            | StageId::KatexNoTranslate
            | StageId::Citation
            | StageId::Highlight => Phase::Html,
            StageId::Minify => Phase::Output,
        }
    }

    /// Stages that must be present and run before this one.
    pub fn requires(self) -> &'static [StageId] {
        match self {
            StageId::AutolinkHeadings => &[StageId::HeadingIds],
            StageId::Katex => &[StageId::Math],
            StageId::KatexNoTranslate => &[StageId::Katex],
            StageId::Highlight => &[StageId::CodeTitles],
            _ => &[],
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-document inputs available to every stage.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    /// Source file relative to the content root, for diagnostics.
    pub file: &'a str,
    pub content_root: &'a Path,
    /// Directory local image URLs resolve against.
    pub public_dir: &'a Path,
    /// Bibliography named by the document's front-matter.
    pub bibliography: Option<&'a str>,
}

/// One named transform in the pipeline.
pub trait Stage {
    fn id(&self) -> StageId;

    /// Narrow the source text before it is parsed.
    fn prepare<'s>(
        &self,
        source: &'s str,
        _ctx: &RenderContext<'_>,
    ) -> Result<&'s str, RenderError> {
        Ok(source)
    }

    /// Parser extensions this stage needs.
    fn parser_options(&self) -> Options {
        Options::empty()
    }

    /// Rewrite the event stream. Markdown- and HTML-phase stages.
    fn transform<'a>(
        &self,
        events: Vec<Event<'a>>,
        _ctx: &RenderContext<'_>,
    ) -> Result<Vec<Event<'a>>, RenderError> {
        Ok(events)
    }

    /// Post-process the generated HTML. Output-phase stages.
    fn finish(&self, html: String, _ctx: &RenderContext<'_>) -> Result<String, RenderError> {
        Ok(html)
    }
}

/// A validated, ordered list of stages.
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
    options: Options,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_ids())
            .finish()
    }
}

impl Pipeline {
    /// Check stage order and collect parser options.
    pub fn new(stages: Vec<Box<dyn Stage>>) -> Result<Self, RenderError> {
        let ids: Vec<StageId> = stages.iter().map(|s| s.id()).collect();
        validate_order(&ids)?;
        let options = stages
            .iter()
            .fold(Options::empty(), |acc, s| acc | s.parser_options());
        Ok(Self { stages, options })
    }

    /// The full thirteen-stage chain.
    pub fn standard(markdown: &MarkdownConfig) -> Result<Self, RenderError> {
        Self::new(vec![
            Box::new(FrontMatterStage),
            Box::new(GfmStage),
            Box::new(CodeTitlesStage),
            Box::new(MathStage),
            Box::new(ImageTagsStage),
            Box::new(AlertsStage),
            Box::new(HeadingIdsStage),
            Box::new(AutolinkHeadingsStage),
            Box::new(KatexStage),
            Box::new(KatexNoTranslateStage),
            Box::new(CitationStage::new()?),
            Box::new(HighlightStage::new(&markdown.default_code_language)),
            Box::new(MinifyStage),
        ])
    }

    pub fn parser_options(&self) -> Options {
        self.options
    }

    pub fn stage_ids(&self) -> Vec<StageId> {
        self.stages.iter().map(|s| s.id()).collect()
    }

    /// Render a whole source file, front-matter included, to HTML.
    pub fn render(&self, source: &str, ctx: &RenderContext<'_>) -> Result<String, RenderError> {
        let mut text = source;
        for stage in &self.stages {
            text = stage.prepare(text, ctx)?;
        }

        let parser = Parser::new_ext(text, self.options);
        let mut events: Vec<Event<'_>> = TextMergeStream::new(parser).collect();
        for stage in &self.stages {
            events = stage.transform(events, ctx)?;
        }

        let mut html = String::with_capacity(text.len() * 3 / 2);
        pulldown_cmark::html::push_html(&mut html, events.into_iter());

        for stage in &self.stages {
            html = stage.finish(html, ctx)?;
        }
        Ok(html)
    }
}

fn validate_order(ids: &[StageId]) -> Result<(), RenderError> {
    let position = |id: StageId| ids.iter().position(|&other| other == id);

    for (i, &id) in ids.iter().enumerate() {
        if ids[..i].contains(&id) {
            return Err(RenderError::Duplicate(id));
        }
        if id == StageId::FrontMatter && i != 0 {
            return Err(RenderError::NotFirst(id));
        }
        if id == StageId::Minify && i + 1 != ids.len() {
            return Err(RenderError::NotLast(id));
        }
        if let Some(&previous) = ids[..i].last() {
            if previous.phase() > id.phase() {
                return Err(RenderError::PhaseOrder {
                    stage: id,
                    phase: id.phase(),
                    previous: previous.phase(),
                });
            }
        }
        for &dep in id.requires() {
            match position(dep) {
                None => {
                    return Err(RenderError::MissingDependency {
                        stage: id,
                        requires: dep,
                    });
                }
                Some(at) if at > i => {
                    return Err(RenderError::OutOfOrder {
                        stage: id,
                        after: dep,
                    });
                }
                Some(_) => {}
            }
        }
    }
    Ok(())
}

/// Index of the `End` event matching the `Start` at `start`.
pub(crate) fn matching_end(events: &[Event<'_>], start: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, event) in events.iter().enumerate().skip(start) {
        match event {
            Event::Start(_) => depth += 1,
            Event::End(_) => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}
