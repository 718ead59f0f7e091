use std::collections::BTreeMap;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};

/// Attachments of a note, keyed by `file_<base64(name + ctime)>`
pub type AttachmentTable = BTreeMap<String, Attachment>;

/// A packaged binary asset as recorded inside a note
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Attachment {
    /// Content fingerprint (hex)
    pub md5: String,
    /// Original file name
    pub name: String,
    pub size: u64,
    /// Pixel width, 0 for non-images
    pub width: u32,
    /// Pixel height, 0 for non-images
    pub height: u32,
    /// Detected media type
    #[serde(rename = "type")]
    pub mime_type: String,
    /// Creation time in seconds since the epoch
    pub ctime: i64,
    /// Reference token used by the inline placeholder
    #[serde(rename = "ref")]
    pub reference: String,
}

impl Attachment {
    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }
}

/// Image payload waiting to be written as its own archive member
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedImage {
    pub fingerprint: String,
    /// Base64 of the image bytes
    pub data_b64: String,
}

impl ProcessedImage {
    pub fn new(fingerprint: String, data: &[u8]) -> Self {
        Self {
            fingerprint,
            data_b64: BASE64.encode(data),
        }
    }

    /// Archive member name, `file_<fingerprint>`
    pub fn member_name(&self) -> String {
        format!("{}{}", super::FILE_PREFIX, self.fingerprint)
    }

    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        BASE64.decode(&self.data_b64)
    }
}

/// One converted Markdown file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub category: String,
    pub parent_id: String,
    pub title: String,
    /// Key of the first image attachment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumb: Option<String>,
    pub mtime: i64,
    pub ctime: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub encrypt: bool,
    pub attachment: AttachmentTable,
    /// Plain-text excerpt
    pub brief: String,
    /// Rendered HTML body
    pub content: String,
    pub tag: Vec<String>,
}

/// Destination notebook descriptor
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notebook {
    pub category: String,
    pub parent_id: String,
    pub title: String,
}

impl Notebook {
    pub fn new(title: &str) -> Self {
        Self {
            category: "notebook".to_string(),
            parent_id: String::new(),
            title: title.to_string(),
        }
    }
}

/// The `config.json` manifest
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct NotebookConfig {
    pub note: Vec<String>,
    pub notebook: Vec<String>,
}

/// Attachments and image payloads registered during one run
#[derive(Debug, Default)]
pub struct AttachmentStore {
    attachments: AttachmentTable,
    images: Vec<ProcessedImage>,
}

impl AttachmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.attachments.contains_key(key)
    }

    pub fn insert(&mut self, key: String, attachment: Attachment) {
        self.attachments.insert(key, attachment);
    }

    pub fn push_image(&mut self, image: ProcessedImage) {
        self.images.push(image);
    }

    pub fn attachments(&self) -> &AttachmentTable {
        &self.attachments
    }

    pub fn images(&self) -> &[ProcessedImage] {
        &self.images
    }

    /// Drop the attachment table but keep the pending image payloads,
    /// which still have to be packaged
    pub fn clear_attachments(&mut self) {
        self.attachments.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_attachment(mime_type: &str) -> Attachment {
        Attachment {
            md5: "abc".to_string(),
            name: "pic.png".to_string(),
            size: 3,
            width: 400,
            height: 300,
            mime_type: mime_type.to_string(),
            ctime: 1_700_000_000,
            reference: "MTcwMDAwMDAwMHBpYy5wbmc=".to_string(),
        }
    }

    #[test]
    fn test_attachment_json_keys() {
        let json = serde_json::to_value(sample_attachment("image/png")).unwrap();
        assert_eq!(json["md5"], "abc");
        assert_eq!(json["type"], "image/png");
        assert_eq!(json["ref"], "MTcwMDAwMDAwMHBpYy5wbmc=");
        assert_eq!(json["ctime"], 1_700_000_000);
    }

    #[test]
    fn test_note_omits_missing_thumb() {
        let note = Note {
            category: "note".to_string(),
            parent_id: "nb_x".to_string(),
            title: "T".to_string(),
            thumb: None,
            mtime: 1,
            ctime: 1,
            latitude: 0.0,
            longitude: 0.0,
            encrypt: false,
            attachment: AttachmentTable::new(),
            brief: String::new(),
            content: "<p>x</p>".to_string(),
            tag: Vec::new(),
        };
        let json = serde_json::to_value(&note).unwrap();
        assert!(json.get("thumb").is_none());
        assert_eq!(json["attachment"], serde_json::json!({}));
        assert_eq!(json["tag"], serde_json::json!([]));
    }

    #[test]
    fn test_processed_image_roundtrip() {
        let image = ProcessedImage::new("f00".to_string(), b"\x00\x01binary");
        assert_eq!(image.member_name(), "file_f00");
        assert_eq!(image.decode().unwrap(), b"\x00\x01binary");
    }

    #[test]
    fn test_clear_keeps_images() {
        let mut store = AttachmentStore::new();
        store.insert("file_a".to_string(), sample_attachment("image/png"));
        store.push_image(ProcessedImage::new("abc".to_string(), b"png"));

        store.clear_attachments();

        assert!(store.attachments().is_empty());
        assert_eq!(store.images().len(), 1);
    }

    #[test]
    fn test_notebook_descriptor() {
        let json = serde_json::to_string(&Notebook::new("Work")).unwrap();
        assert_eq!(json, r#"{"category":"notebook","parent_id":"","title":"Work"}"#);
    }
}
