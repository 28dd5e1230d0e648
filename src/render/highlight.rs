//! Class-based syntax highlighting for code blocks.

use super::{RenderContext, RenderError, Stage, StageId};
use maud::{PreEscaped, html};
use pulldown_cmark::{CodeBlockKind, Event, Tag, TagEnd};
use syntect::html::{ClassStyle, ClassedHTMLGenerator};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;

/// Highlights fenced and indented code blocks.
///
/// Blocks without a language use the configured default; languages the
/// syntax set does not know render as plain text.
pub struct HighlightStage {
    syntax_set: SyntaxSet,
    default_language: String,
}

impl HighlightStage {
    pub fn new(default_language: &str) -> Self {
        Self {
            syntax_set: SyntaxSet::load_defaults_newlines(),
            default_language: default_language.to_string(),
        }
    }

    fn find_syntax(&self, token: &str) -> Option<&SyntaxReference> {
        let lowercase = token.to_ascii_lowercase();
        self.syntax_set
            .find_syntax_by_token(&lowercase)
            .or_else(|| self.syntax_set.find_syntax_by_name(token))
            .or_else(|| self.syntax_set.find_syntax_by_extension(&lowercase))
    }

    fn highlight(&self, language: &str, code: &str) -> Result<String, RenderError> {
        let syntax = self
            .find_syntax(language)
            .unwrap_or_else(|| self.syntax_set.find_syntax_plain_text());

        let mut generator = ClassedHTMLGenerator::new_with_class_style(
            syntax,
            &self.syntax_set,
            ClassStyle::Spaced,
        );
        for line in LinesWithEndings::from(code) {
            generator
                .parse_html_for_line_which_includes_newline(line)
                .map_err(|source| RenderError::Highlight {
                    language: language.to_string(),
                    source,
                })?;
        }
        let highlighted = generator.finalize();

        let lang_class = format!("language-{}", language.to_ascii_lowercase());
        Ok(html! {
            pre class=(lang_class) {
                code class={ (lang_class) " code-highlight" } { (PreEscaped(highlighted)) }
            }
        }
        .into_string())
    }
}

impl Stage for HighlightStage {
    fn id(&self) -> StageId {
        StageId::Highlight
    }

    fn transform<'a>(
        &self,
        events: Vec<Event<'a>>,
        _ctx: &RenderContext<'_>,
    ) -> Result<Vec<Event<'a>>, RenderError> {
        let mut out = Vec::with_capacity(events.len());
        let mut block: Option<(String, String)> = None;
        for event in events {
            match event {
                Event::Start(Tag::CodeBlock(kind)) if block.is_none() => {
                    let language = match &kind {
                        CodeBlockKind::Fenced(info) => info.split_whitespace().next().unwrap_or(""),
                        CodeBlockKind::Indented => "",
                    };
                    let language = if language.is_empty() {
                        self.default_language.clone()
                    } else {
                        language.to_string()
                    };
                    block = Some((language, String::new()));
                }
                Event::Text(text) if block.is_some() => {
                    if let Some((_, code)) = block.as_mut() {
                        code.push_str(&text);
                    }
                }
                Event::End(TagEnd::CodeBlock) if block.is_some() => {
                    if let Some((language, mut code)) = block.take() {
                        if !code.ends_with('\n') {
                            code.push('\n');
                        }
                        let html = self.highlight(&language, &code)?;
                        out.push(Event::Html(format!("{html}\n").into()));
                    }
                }
                _ if block.is_some() => {}
                other => out.push(other),
            }
        }
        Ok(out)
    }
}
