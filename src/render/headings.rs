//! Heading anchors.

use super::{RenderContext, RenderError, Stage, StageId, matching_end};
use crate::paths::AnchorSlugger;
use maud::{PreEscaped, html};
use pulldown_cmark::{CowStr, Event, Tag};

const LINK_ICON_PATHS: [&str; 2] = [
    concat!(
        "M12.232 4.232a2.5 2.5 0 0 1 3.536 3.536",
        "l-1.225 1.224a.75.75 0 0 0 1.061 1.06l1.224-1.224a4 4 0 0 0-5.656-5.656",
        "l-3 3a4 4 0 0 0 .225 5.865.75.75 0 0 0 .977-1.138 2.5 2.5 0 0 1-.142-3.667l3-3Z",
    ),
    concat!(
        "M11.603 7.963a.75.75 0 0 0-.977 1.138 2.5 2.5 0 0 1 .142 3.667",
        "l-3 3a2.5 2.5 0 0 1-3.536-3.536",
        "l1.225-1.224a.75.75 0 0 0-1.061-1.06l-1.224 1.224a4 4 0 1 0 5.656 5.656",
        "l3-3a4 4 0 0 0-.225-5.865Z",
    ),
];

/// Plain text of a heading's inline content.
///
/// Text, inline code and math contribute; image alt text and raw HTML do not.
/// Both the anchor stage and the table of contents go through this, so a toc
/// entry's id always matches the rendered heading.
pub fn heading_text(events: &[Event<'_>]) -> String {
    let mut text = String::new();
    let mut in_image = 0usize;
    for event in events {
        match event {
            Event::Start(Tag::Image { .. }) => in_image += 1,
            Event::End(pulldown_cmark::TagEnd::Image) => in_image = in_image.saturating_sub(1),
            Event::Text(t) | Event::Code(t) | Event::InlineMath(t) | Event::DisplayMath(t)
                if in_image == 0 =>
            {
                text.push_str(t)
            }
            Event::SoftBreak | Event::HardBreak if in_image == 0 => text.push(' '),
            _ => {}
        }
    }
    text.trim().to_string()
}

/// Gives every heading a unique `id`.
pub struct HeadingIdsStage;

impl Stage for HeadingIdsStage {
    fn id(&self) -> StageId {
        StageId::HeadingIds
    }

    fn transform<'a>(
        &self,
        mut events: Vec<Event<'a>>,
        _ctx: &RenderContext<'_>,
    ) -> Result<Vec<Event<'a>>, RenderError> {
        let mut slugger = AnchorSlugger::new();
        for i in 0..events.len() {
            if !matches!(events[i], Event::Start(Tag::Heading { .. })) {
                continue;
            }
            let end = matching_end(&events, i).unwrap_or(events.len());
            let text = heading_text(&events[i + 1..end]);
            if let Event::Start(Tag::Heading { id, .. }) = &mut events[i] {
                let assigned = match id.as_deref() {
                    Some(explicit) => slugger.reserve(explicit),
                    None => slugger.anchor_for(&text),
                };
                *id = Some(CowStr::from(assigned));
            }
        }
        Ok(events)
    }
}

/// Prepends a link icon to every heading and tags it `content-header`.
pub struct AutolinkHeadingsStage;

fn anchor_html(id: &str) -> String {
    html! {
        a aria-hidden="true" tabindex="-1" href=(format!("#{id}")) {
            span class="content-header-link" {
                svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 20 20" fill="currentColor"
                    class="w-5 h-5 linkicon" {
                    @for d in LINK_ICON_PATHS {
                        (PreEscaped(format!(r#"<path d="{d}"></path>"#)))
                    }
                }
            }
        }
    }
    .into_string()
}

impl Stage for AutolinkHeadingsStage {
    fn id(&self) -> StageId {
        StageId::AutolinkHeadings
    }

    fn transform<'a>(
        &self,
        events: Vec<Event<'a>>,
        _ctx: &RenderContext<'_>,
    ) -> Result<Vec<Event<'a>>, RenderError> {
        let mut out = Vec::with_capacity(events.len());
        for event in events {
            match event {
                Event::Start(Tag::Heading {
                    level,
                    id,
                    mut classes,
                    attrs,
                }) => {
                    let Some(id) = id else {
                        return Err(RenderError::MissingHeadingId);
                    };
                    let anchor = anchor_html(&id);
                    classes.push(CowStr::from("content-header"));
                    out.push(Event::Start(Tag::Heading {
                        level,
                        id: Some(id),
                        classes,
                        attrs,
                    }));
                    out.push(Event::InlineHtml(anchor.into()));
                }
                other => out.push(other),
            }
        }
        Ok(out)
    }
}
