//! Markdown-phase stages: parser extensions and structural rewrites that run
//! before anything looks at headings, math or code.

use super::{RenderContext, RenderError, Stage, StageId, matching_end};
use crate::frontmatter;
use maud::html;
use pulldown_cmark::{BlockQuoteKind, CodeBlockKind, CowStr, Event, Options, Tag, TagEnd};
use tracing::debug;

/// Cuts the source down to the body that follows the front-matter block.
///
/// Uses [`frontmatter::split`], so the renderer and the table of contents see
/// exactly the text the front-matter parser left over.
pub struct FrontMatterStage;

impl Stage for FrontMatterStage {
    fn id(&self) -> StageId {
        StageId::FrontMatter
    }

    fn prepare<'s>(
        &self,
        source: &'s str,
        ctx: &RenderContext<'_>,
    ) -> Result<&'s str, RenderError> {
        Ok(frontmatter::split(source, ctx.file)?.body)
    }
}

/// GitHub-flavored extensions: tables, strikethrough, task lists, footnotes.
pub struct GfmStage;

impl Stage for GfmStage {
    fn id(&self) -> StageId {
        StageId::Gfm
    }

    fn parser_options(&self) -> Options {
        Options::ENABLE_TABLES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_TASKLISTS
            | Options::ENABLE_FOOTNOTES
    }
}

/// ```` ```rust:src/main.rs ```` → a title bar before the block, language `rust`.
pub struct CodeTitlesStage;

/// Split an info string into `(language, title, rest)` when its first word
/// carries a `:title` suffix.
fn split_code_title(info: &str) -> Option<(&str, &str, &str)> {
    let (word, rest) = match info.find(char::is_whitespace) {
        Some(at) => info.split_at(at),
        None => (info, ""),
    };
    let (lang, title) = word.split_once(':')?;
    if title.is_empty() {
        return None;
    }
    Some((lang, title, rest))
}

impl Stage for CodeTitlesStage {
    fn id(&self) -> StageId {
        StageId::CodeTitles
    }

    fn transform<'a>(
        &self,
        events: Vec<Event<'a>>,
        _ctx: &RenderContext<'_>,
    ) -> Result<Vec<Event<'a>>, RenderError> {
        let mut out = Vec::with_capacity(events.len());
        for event in events {
            if let Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info))) = &event {
                if let Some((lang, title, rest)) = split_code_title(info) {
                    let bar = html! { div class="remark-code-title" { (title) } };
                    out.push(Event::Html(format!("{}\n", bar.into_string()).into()));
                    let info = CowStr::from(format!("{lang}{rest}"));
                    out.push(Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info))));
                    continue;
                }
            }
            out.push(event);
        }
        Ok(out)
    }
}

/// `$…$` and `$$…$$` math, plus ```` ```math ```` fences as display math.
pub struct MathStage;

fn fence_language<'s>(event: &'s Event<'_>) -> Option<&'s str> {
    match event {
        Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info))) => info.split_whitespace().next(),
        _ => None,
    }
}

impl Stage for MathStage {
    fn id(&self) -> StageId {
        StageId::Math
    }

    fn parser_options(&self) -> Options {
        Options::ENABLE_MATH
    }

    fn transform<'a>(
        &self,
        events: Vec<Event<'a>>,
        _ctx: &RenderContext<'_>,
    ) -> Result<Vec<Event<'a>>, RenderError> {
        let mut out = Vec::with_capacity(events.len());
        let mut i = 0;
        while i < events.len() {
            if fence_language(&events[i]) == Some("math") {
                let end = matching_end(&events, i).unwrap_or(events.len() - 1);
                let mut tex = String::new();
                for event in &events[i + 1..end] {
                    if let Event::Text(text) = event {
                        tex.push_str(text);
                    }
                }
                out.push(Event::Start(Tag::Paragraph));
                out.push(Event::DisplayMath(tex.trim_end().to_string().into()));
                out.push(Event::End(TagEnd::Paragraph));
                i = end + 1;
                continue;
            }
            out.push(events[i].clone());
            i += 1;
        }
        Ok(out)
    }
}

/// Local images become `<img>` tags carrying their intrinsic size.
///
/// Only root-relative URLs (`/static/…`) are considered; they resolve under
/// the public directory. Remote URLs and unreadable files keep the default
/// rendering.
pub struct ImageTagsStage;

fn local_image_size(url: &str, ctx: &RenderContext<'_>) -> Option<(usize, usize)> {
    if !url.starts_with('/') || url.starts_with("//") {
        return None;
    }
    let clean = url.split(['?', '#']).next().unwrap_or(url);
    let path = ctx.public_dir.join(clean.trim_start_matches('/'));
    match imagesize::size(&path) {
        Ok(size) => Some((size.width, size.height)),
        Err(err) => {
            debug!(file = ctx.file, image = %path.display(), %err, "image size unavailable");
            None
        }
    }
}

impl Stage for ImageTagsStage {
    fn id(&self) -> StageId {
        StageId::ImageTags
    }

    fn transform<'a>(
        &self,
        events: Vec<Event<'a>>,
        ctx: &RenderContext<'_>,
    ) -> Result<Vec<Event<'a>>, RenderError> {
        let mut out = Vec::with_capacity(events.len());
        let mut i = 0;
        while i < events.len() {
            if let Event::Start(Tag::Image { dest_url, title, .. }) = &events[i] {
                if let Some((width, height)) = local_image_size(dest_url, ctx) {
                    let end = matching_end(&events, i).unwrap_or(events.len() - 1);
                    let alt: String = events[i + 1..end]
                        .iter()
                        .filter_map(|e| match e {
                            Event::Text(t) | Event::Code(t) => Some(&**t),
                            _ => None,
                        })
                        .collect();
                    let src: &str = dest_url;
                    let title: Option<&str> = (!title.is_empty()).then_some(&**title);
                    let img = html! {
                        img src=(src) alt=(alt) title=[title]
                            width=(width) height=(height) loading="lazy" decoding="async";
                    };
                    out.push(Event::InlineHtml(img.into_string().into()));
                    i = end + 1;
                    continue;
                }
            }
            out.push(events[i].clone());
            i += 1;
        }
        Ok(out)
    }
}

/// GitHub alert blockquotes (`> [!NOTE]`) become titled callout boxes.
pub struct AlertsStage;

fn alert_name(kind: BlockQuoteKind) -> (&'static str, &'static str) {
    match kind {
        BlockQuoteKind::Note => ("note", "Note"),
        BlockQuoteKind::Tip => ("tip", "Tip"),
        BlockQuoteKind::Important => ("important", "Important"),
        BlockQuoteKind::Warning => ("warning", "Warning"),
        BlockQuoteKind::Caution => ("caution", "Caution"),
    }
}

impl Stage for AlertsStage {
    fn id(&self) -> StageId {
        StageId::Alerts
    }

    fn parser_options(&self) -> Options {
        Options::ENABLE_GFM
    }

    fn transform<'a>(
        &self,
        events: Vec<Event<'a>>,
        _ctx: &RenderContext<'_>,
    ) -> Result<Vec<Event<'a>>, RenderError> {
        let mut open: Vec<bool> = Vec::new();
        let mut out = Vec::with_capacity(events.len());
        for event in events {
            match event {
                Event::Start(Tag::BlockQuote(Some(kind))) => {
                    let (class, label) = alert_name(kind);
                    let opening = html! {
                        p class="markdown-alert-title" { (label) }
                    };
                    out.push(Event::Html(
                        format!(
                            "<div class=\"markdown-alert markdown-alert-{class}\">\n{}\n",
                            opening.into_string()
                        )
                        .into(),
                    ));
                    open.push(true);
                }
                Event::Start(Tag::BlockQuote(None)) => {
                    open.push(false);
                    out.push(event);
                }
                Event::End(TagEnd::BlockQuote(_)) => {
                    if open.pop() == Some(true) {
                        out.push(Event::Html("</div>\n".into()));
                    } else {
                        out.push(event);
                    }
                }
                other => out.push(other),
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::Pipeline;
    use std::path::Path;

    fn render_with(stages: Vec<Box<dyn Stage>>, src: &str, public: &Path) -> String {
        let ctx = RenderContext {
            file: "blog/t.md",
            content_root: Path::new("."),
            public_dir: public,
            bibliography: None,
        };
        Pipeline::new(stages).unwrap().render(src, &ctx).unwrap()
    }

    fn render(stages: Vec<Box<dyn Stage>>, src: &str) -> String {
        render_with(stages, src, Path::new("does-not-exist"))
    }

    #[test]
    fn gfm_renders_tables_and_strikethrough() {
        let html = render(vec![Box::new(GfmStage)], "| a |\n|---|\n| 1 |\n\n~~gone~~\n");
        assert!(html.contains("<table>"));
        assert!(html.contains("<del>gone</del>"));
    }

    #[test]
    fn without_gfm_tables_stay_text() {
        let html = render(Vec::new(), "| a |\n|---|\n| 1 |\n");
        assert!(!html.contains("<table>"));
    }

    #[test]
    fn code_title_is_split_from_language() {
        assert_eq!(split_code_title("rust:main.rs"), Some(("rust", "main.rs", "")));
        assert_eq!(split_code_title("js:app.js {1,3}"), Some(("js", "app.js", " {1,3}")));
        assert_eq!(split_code_title("rust"), None);
        assert_eq!(split_code_title("rust:"), None);
    }

    #[test]
    fn code_titles_emit_title_bar() {
        let html = render(vec![Box::new(CodeTitlesStage)], "```ts:lib/x.ts\nlet a = 1\n```\n");
        assert!(html.starts_with("<div class=\"remark-code-title\">lib/x.ts</div>"));
        assert!(html.contains("<code class=\"language-ts\">"));
    }

    #[test]
    fn code_title_is_escaped() {
        let html = render(vec![Box::new(CodeTitlesStage)], "```js:<b>\nx\n```\n");
        assert!(html.contains("&lt;b&gt;"));
    }

    #[test]
    fn math_fence_becomes_display_math() {
        let html = render(vec![Box::new(MathStage)], "```math\nx^2\n```\n");
        assert!(html.contains("math-display"));
        assert!(html.contains("x^2"));
        assert!(!html.contains("<pre>"));
    }

    #[test]
    fn dollar_math_is_parsed() {
        let html = render(vec![Box::new(MathStage)], "Euler: $e^{i\\pi}$\n");
        assert!(html.contains("math-inline"));
    }

    #[test]
    fn remote_image_is_left_alone() {
        let html = render(vec![Box::new(ImageTagsStage)], "![alt](https://example.com/a.png)\n");
        assert!(html.contains("<img src=\"https://example.com/a.png\" alt=\"alt\""));
        assert!(!html.contains("loading"));
    }

    #[test]
    fn local_image_gets_intrinsic_size() {
        let dir = tempfile::TempDir::new().unwrap();
        let images = dir.path().join("static/images");
        std::fs::create_dir_all(&images).unwrap();
        std::fs::write(images.join("dot.png"), crate::test_helpers::TINY_PNG).unwrap();

        let html = render_with(
            vec![Box::new(ImageTagsStage)],
            "![A dot](/static/images/dot.png \"Dot\")\n",
            dir.path(),
        );
        assert!(html.contains("width=\"1\""));
        assert!(html.contains("height=\"1\""));
        assert!(html.contains("loading=\"lazy\""));
        assert!(html.contains("alt=\"A dot\""));
        assert!(html.contains("title=\"Dot\""));
    }

    #[test]
    fn missing_local_image_is_left_alone() {
        let html = render(vec![Box::new(ImageTagsStage)], "![x](/nope.png)\n");
        assert!(html.contains("<img src=\"/nope.png\""));
        assert!(!html.contains("loading"));
    }

    #[test]
    fn alert_blockquote_becomes_callout() {
        let html = render(vec![Box::new(AlertsStage)], "> [!WARNING]\n> Careful.\n");
        assert!(html.contains("<div class=\"markdown-alert markdown-alert-warning\">"));
        assert!(html.contains("<p class=\"markdown-alert-title\">Warning</p>"));
        assert!(html.contains("Careful."));
        assert!(!html.contains("<blockquote"));
        assert!(html.trim_end().ends_with("</div>"));
    }

    #[test]
    fn plain_blockquote_is_untouched() {
        let html = render(vec![Box::new(AlertsStage)], "> quoted\n");
        assert!(html.contains("<blockquote>"));
    }

    #[test]
    fn front_matter_only_document_renders_empty() {
        let html = render(vec![Box::new(FrontMatterStage)], "---\ntitle: x\n---\n");
        assert_eq!(html, "");
    }

    #[test]
    fn front_matter_after_blank_line_is_still_hidden() {
        let src = "---\n\ntitle: Leak\ndate: 2024-01-01\n---\n\n## Real\n\nBody\n";
        let html = render(vec![Box::new(FrontMatterStage)], src);
        assert_eq!(html, "<h2>Real</h2>\n<p>Body</p>\n");
    }

    #[test]
    fn dashed_section_in_body_is_kept() {
        let src = "Intro.\n\n---\nKept sentence here\n---\n\nEnd.\n";
        let html = render(vec![Box::new(FrontMatterStage), Box::new(GfmStage)], src);
        assert!(html.contains("Kept sentence here"), "{html}");
        assert!(html.contains("<p>Intro.</p>"));
        assert!(html.contains("<p>End.</p>"));
    }
}
