use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

use crate::markdown::MarkdownRenderer;
use crate::nsx::{AttachmentTable, Note, NOTE_PREFIX};

pub const UNTITLED: &str = "Untitled";
pub const EMPTY_NOTE: &str = "Empty note";

/// Maximum excerpt length in characters, before the ellipsis
pub const EXCERPT_LENGTH: usize = 100;
const ELLIPSIS: &str = "...";

/// Archive member name of a note, `note_<base64(title)>`
pub fn note_member_name(title: &str) -> String {
    format!("{}{}", NOTE_PREFIX, BASE64.encode(title))
}

/// Build the note record for one document.
///
/// `markdown` is the text after reference rewriting; the excerpt comes from
/// it, the body is its rendered HTML. Returns the note and its member name.
pub fn assemble_note(
    title: &str,
    markdown: &str,
    parent_id: &str,
    attachments: &AttachmentTable,
    renderer: &MarkdownRenderer,
    now: i64,
) -> (Note, String) {
    let title = if title.trim().is_empty() { UNTITLED } else { title };
    let member_name = note_member_name(title);

    let markdown = if markdown.trim().is_empty() {
        EMPTY_NOTE
    } else {
        markdown
    };

    let thumb = attachments
        .iter()
        .find(|(_, attachment)| attachment.is_image())
        .map(|(key, _)| key.clone());

    let note = Note {
        category: "note".to_string(),
        parent_id: parent_id.to_string(),
        title: title.to_string(),
        thumb,
        mtime: now,
        ctime: now,
        latitude: 0.0,
        longitude: 0.0,
        encrypt: false,
        attachment: attachments.clone(),
        brief: generate_excerpt(markdown),
        content: renderer.render(markdown),
        tag: Vec::new(),
    };

    (note, member_name)
}

/// Plain-text preview: whitespace runs collapse to one space, the result
/// is trimmed and cut to [`EXCERPT_LENGTH`] characters plus `...`
pub fn generate_excerpt(markdown: &str) -> String {
    let collapsed = markdown.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.chars().count() > EXCERPT_LENGTH {
        let mut excerpt: String = collapsed.chars().take(EXCERPT_LENGTH).collect();
        excerpt.push_str(ELLIPSIS);
        excerpt
    } else {
        collapsed
    }
}
