/// Hex MD5 digest of a payload.
///
/// MD5 keeps image member names identical to archives written by earlier
/// converters; it is a name, not a security boundary.
pub fn fingerprint(data: &[u8]) -> String {
    format!("{:x}", md5::compute(data))
}

/// Notebook id for a display name
pub fn notebook_id(notebook_name: &str) -> String {
    format!("{}{}", super::NOTEBOOK_PREFIX, fingerprint(notebook_name.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_stable() {
        let data = b"\x89PNG\r\n\x1a\nsome image bytes";
        assert_eq!(fingerprint(data), fingerprint(data));
        assert_eq!(fingerprint(b"hello"), "5d41402abc4b2a76b9719d911017c592");
    }

    #[test]
    fn test_fingerprint_of_empty_payload() {
        assert_eq!(fingerprint(b""), "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn test_notebook_id() {
        let id = notebook_id("Imported Notebook");
        assert!(id.starts_with("nb_"));
        assert_eq!(id.len(), 3 + 32);
        assert_eq!(id, notebook_id("Imported Notebook"));
        assert_ne!(id, notebook_id("Other"));
    }
}
