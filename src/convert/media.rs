//! Content-based media type detection for attachments.

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const OCTET_STREAM: &str = "application/octet-stream";
const SVG: &str = "image/svg+xml";

/// Detect the media type of a payload from its bytes; the file extension is
/// never consulted.
pub fn detect_media_type(data: &[u8]) -> String {
    if let Some(kind) = infer::get(data) {
        return kind.mime_type().to_string();
    }

    match std::str::from_utf8(data) {
        Ok(text) if looks_like_svg(text) => SVG.to_string(),
        Ok(_) => TEXT_PLAIN.to_string(),
        Err(_) => OCTET_STREAM.to_string(),
    }
}

fn looks_like_svg(text: &str) -> bool {
    let head: String = text.trim_start().chars().take(512).collect();
    let head = head.to_ascii_lowercase();
    head.starts_with("<svg") || (head.starts_with("<?xml") && head.contains("<svg"))
}
