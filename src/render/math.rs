//! KaTeX rendering of parsed math.

use super::{RenderContext, RenderError, Stage, StageId};
use katex::{OptsBuilder, OutputType};
use pulldown_cmark::{CowStr, Event};

const INLINE_WRAPPER: &str = "<span class=\"math math-inline\">";
const DISPLAY_WRAPPER: &str = "<span class=\"math math-display\">";

/// Render a TeX expression to KaTeX HTML.
fn render_math(tex: &str, display_mode: bool) -> Result<String, RenderError> {
    let mut builder = OptsBuilder::default();
    builder.display_mode(display_mode);
    builder.output_type(OutputType::Html);
    let opts = builder
        .build()
        .map_err(|err| RenderError::MathOptions(err.to_string()))?;

    katex::render_with_opts(tex, opts).map_err(|source| RenderError::Math {
        expr: tex.to_string(),
        source,
    })
}

/// Turns math events into KaTeX markup.
pub struct KatexStage;

impl Stage for KatexStage {
    fn id(&self) -> StageId {
        StageId::Katex
    }

    fn transform<'a>(
        &self,
        events: Vec<Event<'a>>,
        _ctx: &RenderContext<'_>,
    ) -> Result<Vec<Event<'a>>, RenderError> {
        events
            .into_iter()
            .map(|event| match event {
                Event::InlineMath(tex) => {
                    let html = render_math(&tex, false)?;
                    Ok(Event::InlineHtml(format!("{INLINE_WRAPPER}{html}</span>").into()))
                }
                Event::DisplayMath(tex) => {
                    let html = render_math(&tex, true)?;
                    Ok(Event::InlineHtml(format!("{DISPLAY_WRAPPER}{html}</span>").into()))
                }
                other => Ok(other),
            })
            .collect()
    }
}

/// Keeps browser translation away from rendered math.
pub struct KatexNoTranslateStage;

fn mark_no_translate(html: &str) -> String {
    html.replace("class=\"katex\"", "class=\"katex\" translate=\"no\"")
        .replace("class=\"katex-display\"", "class=\"katex-display\" translate=\"no\"")
}

impl Stage for KatexNoTranslateStage {
    fn id(&self) -> StageId {
        StageId::KatexNoTranslate
    }

    fn transform<'a>(
        &self,
        events: Vec<Event<'a>>,
        _ctx: &RenderContext<'_>,
    ) -> Result<Vec<Event<'a>>, RenderError> {
        Ok(events
            .into_iter()
            .map(|event| match event {
                Event::InlineHtml(html)
                    if html.starts_with(INLINE_WRAPPER) || html.starts_with(DISPLAY_WRAPPER) =>
                {
                    Event::InlineHtml(CowStr::from(mark_no_translate(&html)))
                }
                other => other,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{MathStage, Pipeline};
    use std::path::Path;

    fn render(stages: Vec<Box<dyn Stage>>, src: &str) -> Result<String, RenderError> {
        let ctx = RenderContext {
            file: "blog/t.md",
            content_root: Path::new("."),
            public_dir: Path::new("public"),
            bibliography: None,
        };
        Pipeline::new(stages)?.render(src, &ctx)
    }

    #[test]
    fn inline_math_is_rendered_by_katex() {
        let html =
            render(vec![Box::new(MathStage), Box::new(KatexStage)], "Area $\\pi r^2$.\n").unwrap();
        assert!(html.contains(INLINE_WRAPPER));
        assert!(html.contains("class=\"katex\""));
        assert!(!html.contains("translate=\"no\""));
    }

    #[test]
    fn display_math_uses_display_mode() {
        let html = render(vec![Box::new(MathStage), Box::new(KatexStage)], "$$x = 1$$\n").unwrap();
        assert!(html.contains(DISPLAY_WRAPPER));
        assert!(html.contains("katex-display"));
    }

    #[test]
    fn no_translate_marks_rendered_math() {
        let html = render(
            vec![Box::new(MathStage), Box::new(KatexStage), Box::new(KatexNoTranslateStage)],
            "Inline $a+b$ math.\n",
        )
        .unwrap();
        assert!(html.contains("class=\"katex\" translate=\"no\""));
    }

    #[test]
    fn no_translate_leaves_author_html_alone() {
        assert_eq!(
            mark_no_translate("<span class=\"katex\">x</span>"),
            "<span class=\"katex\" translate=\"no\">x</span>"
        );
        let html = render(
            vec![Box::new(MathStage), Box::new(KatexStage), Box::new(KatexNoTranslateStage)],
            "<span class=\"katex\">fake</span>\n",
        )
        .unwrap();
        assert!(!html.contains("translate"));
    }

    #[test]
    fn invalid_tex_is_an_error() {
        let src = "Bad $\\notacommand{x}$ math\n";
        let err = render(vec![Box::new(MathStage), Box::new(KatexStage)], src).unwrap_err();
        assert!(matches!(err, RenderError::Math { .. }));
    }
}
