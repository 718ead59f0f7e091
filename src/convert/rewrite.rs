use std::fs;
use std::ops::Range;
use std::path::Path;
use std::sync::OnceLock;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use regex::Regex;
use serde::Serialize;

use super::locate::locate_asset;
use super::media::detect_media_type;
use crate::error::Result;
use crate::nsx::{fingerprint, Attachment, AttachmentStore, ProcessedImage, FILE_PREFIX};

/// Placeholder dimensions recorded for every image; images are never decoded
pub const IMAGE_WIDTH: u32 = 400;
pub const IMAGE_HEIGHT: u32 = 300;

const IMAGE_SRC: &str = "webman/3rdparty/NoteStation/images/transparent.gif";

fn image_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"!\[([^\]]*)\]\(([^)]*?)(?:\s+"([^"]*)")?\)"#).expect("valid image pattern")
    })
}

fn link_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\[([^\]]*)\]\(([^)]*?)\.(pdf|doc|docx|txt|zip|rar|md|csv|xls|xlsx)\)")
            .expect("valid link pattern")
    })
}

/// Which Markdown syntax a reference was written in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceKind {
    /// `![alt](link "title")`
    Image,
    /// `[text](file.ext)` with a known document extension
    Link,
}

impl ReferenceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ReferenceKind::Image => "image",
            ReferenceKind::Link => "link",
        }
    }

    /// Anchor text used when the reference has no label
    fn fallback_label(self) -> &'static str {
        match self {
            ReferenceKind::Link => "Attachment",
            ReferenceKind::Image => "File",
        }
    }
}

/// A reference found in the raw Markdown text
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceSpan {
    pub kind: ReferenceKind,
    /// Byte range of the whole span in the source text
    pub range: Range<usize>,
    /// Alt text, title or link text
    pub label: String,
    pub link: String,
}

/// A reference that became a packaged attachment
#[derive(Debug, Clone)]
pub struct ResolvedReference {
    pub kind: ReferenceKind,
    pub link: String,
    /// Attachment table key
    pub key: String,
    pub attachment: Attachment,
    pub is_image: bool,
    /// Inline tag that replaced the span
    pub markup: String,
}

/// A reference left untouched in the text
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedReference {
    pub kind: ReferenceKind,
    pub link: String,
    pub reason: String,
}

/// Result of rewriting one document
#[derive(Debug, Clone, Default)]
pub struct RewriteOutcome {
    pub text: String,
    pub resolved: Vec<ResolvedReference>,
    pub skipped: Vec<SkippedReference>,
}

/// Find image and document-link references in raw Markdown.
///
/// Spans are returned in text order and never overlap; an image span wins
/// over the link pattern matching inside it.
pub fn scan_references(text: &str) -> Vec<ReferenceSpan> {
    let mut spans: Vec<ReferenceSpan> = image_pattern()
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let alt = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            let label = caps
                .get(3)
                .map(|m| m.as_str())
                .filter(|t| !t.is_empty())
                .unwrap_or(alt);
            Some(ReferenceSpan {
                kind: ReferenceKind::Image,
                range: whole.range(),
                label: label.to_string(),
                link: caps.get(2)?.as_str().trim().to_string(),
            })
        })
        .collect();

    let links: Vec<ReferenceSpan> = link_pattern()
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            Some(ReferenceSpan {
                kind: ReferenceKind::Link,
                range: whole.range(),
                label: caps.get(1)?.as_str().to_string(),
                link: format!("{}.{}", caps.get(2)?.as_str().trim(), caps.get(3)?.as_str()),
            })
        })
        .filter(|link| !spans.iter().any(|image| overlaps(&image.range, &link.range)))
        .collect();

    spans.extend(links);
    spans.sort_by_key(|span| span.range.start);
    spans
}

/// Replace every resolvable reference in `text` with its inline placeholder
/// and register the attachment in `store`.
///
/// References that cannot be found or read are logged, reported in
/// `skipped` and left as they were.
pub fn rewrite_references(
    document_path: &Path,
    text: &str,
    store: &mut AttachmentStore,
    now: &dyn Fn() -> i64,
) -> RewriteOutcome {
    let mut outcome = RewriteOutcome::default();
    let mut replacements: Vec<(Range<usize>, String)> = Vec::new();

    for span in scan_references(text) {
        match resolve_reference(document_path, &span, store, now()) {
            Ok(resolved) => {
                log::info!(
                    "  Processed {}: {} -> {} (MIME: {})",
                    span.kind.as_str(),
                    resolved.attachment.name,
                    resolved.key,
                    resolved.attachment.mime_type
                );
                replacements.push((span.range.clone(), resolved.markup.clone()));
                outcome.resolved.push(resolved);
            }
            Err(e) => {
                log::warn!(
                    "Failed to process {} {} in {:?}: {}",
                    span.kind.as_str(),
                    span.link,
                    document_path,
                    e
                );
                outcome.skipped.push(SkippedReference {
                    kind: span.kind,
                    link: span.link.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    outcome.text = splice(text, &replacements);
    outcome
}

fn resolve_reference(
    document_path: &Path,
    span: &ReferenceSpan,
    store: &mut AttachmentStore,
    now: i64,
) -> Result<ResolvedReference> {
    let file_path = locate_asset(document_path, &span.link)?;
    let data = fs::read(&file_path)?;

    let md5 = fingerprint(&data);
    let mime_type = detect_media_type(&data);
    let is_image = match span.kind {
        ReferenceKind::Image => true,
        ReferenceKind::Link => mime_type.starts_with("image/"),
    };
    let (width, height) = if is_image {
        (IMAGE_WIDTH, IMAGE_HEIGHT)
    } else {
        (0, 0)
    };

    let name = file_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| span.link.clone());

    let (key, ctime) = unique_key(store, &name, now);
    let reference = BASE64.encode(format!("{}{}", ctime, name));

    let markup = if is_image {
        image_markup(width, &reference)
    } else {
        let label = if span.label.is_empty() {
            span.kind.fallback_label()
        } else {
            span.label.as_str()
        };
        anchor_markup(&reference, label)
    };

    let attachment = Attachment {
        md5: md5.clone(),
        name,
        size: data.len() as u64,
        width,
        height,
        mime_type,
        ctime,
        reference,
    };

    store.insert(key.clone(), attachment.clone());
    if is_image {
        store.push_image(ProcessedImage::new(md5, &data));
    }

    Ok(ResolvedReference {
        kind: span.kind,
        link: span.link.clone(),
        key,
        attachment,
        is_image,
        markup,
    })
}

/// Attachment key `file_<base64(name + ctime)>`. A key already in the table
/// moves the timestamp forward one second until it is free.
fn unique_key(store: &AttachmentStore, name: &str, mut ctime: i64) -> (String, i64) {
    loop {
        let key = format!("{}{}", FILE_PREFIX, BASE64.encode(format!("{}{}", name, ctime)));
        if !store.contains(&key) {
            return (key, ctime);
        }
        ctime += 1;
    }
}

fn image_markup(width: u32, reference: &str) -> String {
    format!(
        r#"<img class="syno-notestation-image-object" src="{}" border="0" width="{}" ref="{}" adjust="true"/>"#,
        IMAGE_SRC, width, reference
    )
}

fn anchor_markup(reference: &str, label: &str) -> String {
    format!(
        r#"<a href="{}" target="_blank">{}</a>"#,
        reference,
        html_escape::encode_text(label)
    )
}

fn overlaps(a: &Range<usize>, b: &Range<usize>) -> bool {
    a.start < b.end && b.start < a.end
}

/// Rebuild `text` with the given non-overlapping, ordered ranges replaced
fn splice(text: &str, replacements: &[(Range<usize>, String)]) -> String {
    let mut output = String::with_capacity(text.len());
    let mut cursor = 0;
    for (range, markup) in replacements {
        output.push_str(&text[cursor..range.start]);
        output.push_str(markup);
        cursor = range.end;
    }
    output.push_str(&text[cursor..]);
    output
}
