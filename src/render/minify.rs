//! Output-phase HTML minification.

use super::{RenderContext, RenderError, Stage, StageId};

/// Collapses whitespace and drops comments from the rendered body.
///
/// Closing tags are kept: the body is a fragment embedded in a page layout,
/// so omitted end tags would leak into the surrounding markup.
pub struct MinifyStage;

fn minify_fragment(html: &str) -> Result<String, RenderError> {
    let mut cfg = minify_html::Cfg::new();
    cfg.keep_closing_tags = true;
    cfg.keep_comments = false;
    let bytes = minify_html::minify(html.as_bytes(), &cfg);
    Ok(String::from_utf8(bytes)?)
}

impl Stage for MinifyStage {
    fn id(&self) -> StageId {
        StageId::Minify
    }

    fn finish(&self, html: String, _ctx: &RenderContext<'_>) -> Result<String, RenderError> {
        minify_fragment(&html)
    }
}
