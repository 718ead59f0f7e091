use std::sync::OnceLock;

use pulldown_cmark::{html, CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd};
use regex::Regex;

use super::highlight::CodeHighlighter;

const CODE_SPAN_OPEN: &str =
    r#"<code style="color: #e83e8c; background-color: #f8f9fa; padding: 2px 4px; border-radius: 3px;">"#;

const BLOCKQUOTE_OPEN: &str =
    "<blockquote style=\"margin: 1em 0; padding: 0.5em 1em; border-left: 4px solid #ccc; color: #666;\">\n";

const BLOCKQUOTE_CLOSE: &str = "</blockquote>\n";

pub const CHECKBOX_CHECKED: &str = concat!(
    r#"<input class="syno-notestation-editor-checkbox syno-notestation-editor-checkbox-checked note-station-checkbox-checked" "#,
    r#"src="webman/3rdparty/NoteStation/images/transparent.gif" type="image" data-mce-contenteditable="false" />"#
);

pub const CHECKBOX_UNCHECKED: &str = r#"<input class="syno-notestation-editor-checkbox note-station-checkbox" src="webman/3rdparty/NoteStation/images/transparent.gif" type="image" />"#;

fn checkbox_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)<input[^>]*type="checkbox"[^>]*>"#).expect("valid checkbox pattern")
    })
}

fn checked_attribute() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\schecked(?:[\s=/>]|$)").expect("valid checked pattern"))
}

fn url_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)\b(?:https?://|www\.)[^\s<>"'`]+"#).expect("valid url pattern")
    })
}

fn parser_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_DEFINITION_LIST);
    options.insert(Options::ENABLE_SMART_PUNCTUATION);
    options
}

/// Markdown to Note Station HTML renderer
pub struct MarkdownRenderer {
    highlighter: CodeHighlighter,
}

/// Code block being collected
struct PendingCode {
    /// Fence language, `None` for indented blocks
    fence: Option<String>,
    code: String,
}

impl MarkdownRenderer {
    pub fn new(code_theme: &str) -> Self {
        Self {
            highlighter: CodeHighlighter::new(code_theme),
        }
    }

    /// Render Markdown to XHTML-style markup. Raw HTML passes through and
    /// single newlines become `<br />`.
    pub fn render(&self, markdown: &str) -> String {
        let parser = Parser::new_ext(markdown, parser_options());
        let events = self.rewrite_events(parser);

        let mut output = String::with_capacity(markdown.len() * 2);
        html::push_html(&mut output, events.into_iter());

        replace_checkboxes(&output)
    }

    fn rewrite_events<'a>(&self, parser: Parser<'a>) -> Vec<Event<'a>> {
        let mut events: Vec<Event<'a>> = Vec::new();
        let mut pending_code: Option<PendingCode> = None;
        let mut pending_text = String::new();
        let mut link_depth = 0usize;

        for event in parser {
            if let Some(block) = pending_code.as_mut() {
                match event {
                    Event::Text(text) => block.code.push_str(&text),
                    Event::End(TagEnd::CodeBlock) => {
                        if let Some(block) = pending_code.take() {
                            events.push(Event::Html(self.render_code_block(&block).into()));
                        }
                    }
                    _ => {}
                }
                continue;
            }

            if let Event::Text(text) = &event {
                if link_depth == 0 {
                    pending_text.push_str(text);
                    continue;
                }
            }
            if !pending_text.is_empty() {
                events.extend(linkify(&pending_text));
                pending_text.clear();
            }

            match event {
                Event::Start(Tag::CodeBlock(kind)) => {
                    let fence = match kind {
                        CodeBlockKind::Fenced(info) => {
                            Some(info.split_whitespace().next().unwrap_or("").to_string())
                        }
                        CodeBlockKind::Indented => None,
                    };
                    pending_code = Some(PendingCode {
                        fence,
                        code: String::new(),
                    });
                }
                Event::Code(code) => events.push(Event::InlineHtml(render_code_span(&code).into())),
                Event::Start(Tag::BlockQuote { .. }) => {
                    events.push(Event::Html(BLOCKQUOTE_OPEN.into()))
                }
                Event::End(TagEnd::BlockQuote { .. }) => {
                    events.push(Event::Html(BLOCKQUOTE_CLOSE.into()))
                }
                Event::SoftBreak => events.push(Event::HardBreak),
                Event::Start(tag @ (Tag::Link { .. } | Tag::Image { .. })) => {
                    link_depth += 1;
                    events.push(Event::Start(tag));
                }
                Event::End(end @ (TagEnd::Link | TagEnd::Image)) => {
                    link_depth = link_depth.saturating_sub(1);
                    events.push(Event::End(end));
                }
                Event::InlineHtml(html) => {
                    match anchor_tag(&html) {
                        Some(AnchorTag::Open) => link_depth += 1,
                        Some(AnchorTag::Close) => link_depth = link_depth.saturating_sub(1),
                        None => {}
                    }
                    events.push(Event::InlineHtml(html));
                }
                other => events.push(other),
            }
        }

        if !pending_text.is_empty() {
            events.extend(linkify(&pending_text));
        }

        events
    }

    fn render_code_block(&self, block: &PendingCode) -> String {
        match &block.fence {
            Some(language) => match self.highlighter.highlight_block(language, &block.code) {
                Ok(html) => html,
                Err(e) => {
                    log::warn!("Failed to highlight {} code block: {}", language, e);
                    self.highlighter.plain_block(language, &block.code)
                }
            },
            None => format!(
                "<pre><code>{}</code></pre>\n",
                html_escape::encode_text(&block.code)
            ),
        }
    }
}

/// Inline code with fixed styling; line breaks inside the span collapse to
/// a single space
pub fn render_code_span(code: &str) -> String {
    let flattened = code.replace("\r\n", " ").replace('\n', " ");
    format!(
        "{}{}</code>",
        CODE_SPAN_OPEN,
        html_escape::encode_text(&flattened)
    )
}

enum AnchorTag {
    Open,
    Close,
}

/// Whether an inline HTML fragment opens or closes an anchor
fn anchor_tag(html: &str) -> Option<AnchorTag> {
    let tag = html.trim_start().to_ascii_lowercase();
    let is_name_end = |rest: &str| rest.starts_with(|c: char| c == '>' || c.is_whitespace());

    if let Some(rest) = tag.strip_prefix("</a") {
        is_name_end(rest).then_some(AnchorTag::Close)
    } else if let Some(rest) = tag.strip_prefix("<a") {
        is_name_end(rest).then_some(AnchorTag::Open)
    } else {
        None
    }
}

/// Split text into plain text and anchors for bare URLs
fn linkify<'a>(text: &str) -> Vec<Event<'a>> {
    let mut events = Vec::new();
    let mut cursor = 0;

    for found in url_pattern().find_iter(text) {
        let url = found
            .as_str()
            .trim_end_matches(|c: char| matches!(c, '.' | ',' | ';' | ':' | '!' | '?' | ')'));
        if url.is_empty() {
            continue;
        }

        let start = found.start();
        let end = start + url.len();
        if start > cursor {
            events.push(Event::Text(CowStr::from(text[cursor..start].to_string())));
        }

        let href = if url.to_ascii_lowercase().starts_with("www.") {
            format!("http://{}", url)
        } else {
            url.to_string()
        };
        events.push(Event::InlineHtml(
            format!(
                r#"<a href="{}">{}</a>"#,
                html_escape::encode_double_quoted_attribute(&href),
                html_escape::encode_text(url)
            )
            .into(),
        ));
        cursor = end;
    }

    if cursor < text.len() {
        events.push(Event::Text(CowStr::from(text[cursor..].to_string())));
    }

    events
}

/// Swap rendered checkbox inputs for Note Station checkbox widgets
pub fn replace_checkboxes(html: &str) -> String {
    checkbox_pattern()
        .replace_all(html, |caps: &regex::Captures| {
            if checked_attribute().is_match(&caps[0]) {
                CHECKBOX_CHECKED
            } else {
                CHECKBOX_UNCHECKED
            }
        })
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_CODE_THEME;

    fn render(markdown: &str) -> String {
        MarkdownRenderer::new(DEFAULT_CODE_THEME).render(markdown)
    }

    #[test]
    fn test_hard_wraps_and_xhtml() {
        let html = render("line one\nline two\n\n---\n");
        assert!(html.contains("line one<br />"));
        assert!(html.contains("<hr />"));
    }

    #[test]
    fn test_tables_and_strikethrough() {
        let html = render("| a | b |\n|---|---|\n| 1 | 2 |\n\n~~gone~~\n");
        assert!(html.contains("<table>"));
        assert!(html.contains("<td>1</td>"));
        assert!(html.contains("<del>gone</del>"));
    }

    #[test]
    fn test_footnotes_and_definition_lists() {
        let html = render("Text[^1]\n\n[^1]: The note.\n\nTerm\n: Definition\n");
        assert!(html.contains("footnote-definition"));
        assert!(html.contains("<dt>"));
        assert!(html.contains("<dd>"));
    }

    #[test]
    fn test_typographic_punctuation() {
        let html = render("\"quoted\" -- dash...\n");
        assert!(html.contains('\u{201C}'));
        assert!(html.contains('\u{2013}'));
        assert!(html.contains('\u{2026}'));
    }

    #[test]
    fn test_code_span_styling() {
        let html = render("Use `a < b` here\n");
        assert!(html.contains(&format!("{}a &lt; b</code>", CODE_SPAN_OPEN)));
    }

    #[test]
    fn test_code_span_newlines_collapse() {
        assert_eq!(
            render_code_span("one\ntwo"),
            format!("{}one two</code>", CODE_SPAN_OPEN)
        );
    }

    #[test]
    fn test_blockquote_styling() {
        let html = render("> quoted\n");
        assert!(html.contains("<blockquote style=\"margin: 1em 0;"));
        assert!(html.contains("quoted"));
        assert!(html.contains("</blockquote>"));
    }

    #[test]
    fn test_fenced_code_is_highlighted_and_numbered() {
        let html = render("```python\nprint('hi')\nx = 1\n```\n");
        assert!(html.contains("<pre class=\"language-python\">"));
        assert!(html.contains(">1</span>"));
        assert!(html.contains(">2</span>"));
        assert!(!html.contains("<br />"));
    }

    #[test]
    fn test_autolinks_bare_urls() {
        let html = render("Visit https://example.com/docs. Or www.example.org\n");
        assert!(html.contains(
            r#"<a href="https://example.com/docs">https://example.com/docs</a>."#
        ));
        assert!(html.contains(r#"<a href="http://www.example.org">www.example.org</a>"#));
    }

    #[test]
    fn test_urls_inside_links_are_not_relinked() {
        let html = render("[https://example.com](https://example.com)\n");
        assert_eq!(html.matches("<a ").count(), 1);
    }

    #[test]
    fn test_urls_inside_raw_anchors_are_not_relinked() {
        let html = render(
            "Open <a href=\"MTcwMGRvYy5wZGY=\" target=\"_blank\">https://example.com/x</a> now, \
             then https://example.org\n",
        );
        assert_eq!(html.matches("<a ").count(), 2);
        assert!(html.contains(r#"target="_blank">https://example.com/x</a>"#));
        assert!(html.contains(r#"<a href="https://example.org">https://example.org</a>"#));
    }

    #[test]
    fn test_anchor_tag() {
        assert!(matches!(anchor_tag("<a href=\"x\">"), Some(AnchorTag::Open)));
        assert!(matches!(anchor_tag("<A>"), Some(AnchorTag::Open)));
        assert!(matches!(anchor_tag("</a>"), Some(AnchorTag::Close)));
        assert!(anchor_tag("<abbr>").is_none());
        assert!(anchor_tag("<br />").is_none());
    }

    #[test]
    fn test_raw_html_passes_through() {
        let tag = r#"<img class="syno-notestation-image-object" src="x.gif" border="0" width="400" ref="abc" adjust="true"/>"#;
        let html = render(&format!("Before {} after\n", tag));
        assert!(html.contains(tag));
    }

    #[test]
    fn test_task_list_widgets() {
        let html = render("- [x] done\n- [ ] todo\n");
        assert!(html.contains(CHECKBOX_CHECKED));
        assert!(html.contains(CHECKBOX_UNCHECKED));
        assert!(!html.contains("type=\"checkbox\""));
    }

    #[test]
    fn test_replace_checkboxes() {
        let html = r#"<li><input disabled="" type="checkbox" checked=""/> a</li><li><input disabled="" type="checkbox"/> checked later</li>"#;
        let replaced = replace_checkboxes(html);
        assert_eq!(
            replaced,
            format!(
                "<li>{} a</li><li>{} checked later</li>",
                CHECKBOX_CHECKED, CHECKBOX_UNCHECKED
            )
        );
    }

    #[test]
    fn test_plain_checked_text_is_untouched() {
        let html = "<p>I checked the box</p><input type=\"text\" checked/>";
        assert_eq!(replace_checkboxes(html), html);
    }
}
