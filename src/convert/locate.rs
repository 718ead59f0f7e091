use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{ConvertError, Result};

/// Find the file a Markdown reference points at.
///
/// The link is first tried as a path relative to the working directory.
/// Otherwise the document's directory is walked (sorted by name) and the
/// first file whose name contains the link's base name wins. The match is
/// a plain substring test, so `img` also finds `image1.png`.
pub fn locate_asset(document_path: &Path, link: &str) -> Result<PathBuf> {
    let direct = Path::new(link);
    if direct.is_file() {
        return Ok(direct.to_path_buf());
    }

    let not_found = || ConvertError::AssetNotFound {
        link: link.to_string(),
    };

    let needle = direct
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .filter(|n| !n.is_empty())
        .ok_or_else(not_found)?;

    let search_root = match document_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    WalkDir::new(search_root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .find(|e| e.file_name().to_string_lossy().contains(&needle))
        .map(|e| e.into_path())
        .ok_or_else(not_found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_finds_sibling_file() {
        let temp_dir = TempDir::new().unwrap();
        let doc = temp_dir.path().join("a.md");
        fs::write(&doc, "# A").unwrap();
        fs::write(temp_dir.path().join("pic.png"), b"png").unwrap();

        let found = locate_asset(&doc, "pic.png").unwrap();
        assert_eq!(found, temp_dir.path().join("pic.png"));
    }

    #[test]
    fn test_finds_file_in_nested_folder_by_base_name() {
        let temp_dir = TempDir::new().unwrap();
        let doc = temp_dir.path().join("a.md");
        fs::create_dir_all(temp_dir.path().join("assets/2024")).unwrap();
        fs::write(temp_dir.path().join("assets/2024/report.pdf"), b"%PDF").unwrap();

        let found = locate_asset(&doc, "../elsewhere/report.pdf").unwrap();
        assert_eq!(found, temp_dir.path().join("assets/2024/report.pdf"));
    }

    #[test]
    fn test_substring_match_is_loose() {
        let temp_dir = TempDir::new().unwrap();
        let doc = temp_dir.path().join("a.md");
        fs::write(temp_dir.path().join("image1.png"), b"png").unwrap();

        let found = locate_asset(&doc, "img/image").unwrap();
        assert_eq!(found, temp_dir.path().join("image1.png"));
    }

    #[test]
    fn test_first_match_in_name_order() {
        let temp_dir = TempDir::new().unwrap();
        let doc = temp_dir.path().join("a.md");
        fs::write(temp_dir.path().join("b-chart.png"), b"b").unwrap();
        fs::write(temp_dir.path().join("a-chart.png"), b"a").unwrap();

        let found = locate_asset(&doc, "chart.png").unwrap();
        assert_eq!(found, temp_dir.path().join("a-chart.png"));
    }

    #[test]
    fn test_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let doc = temp_dir.path().join("a.md");

        match locate_asset(&doc, "nowhere-to-be-found.png") {
            Err(ConvertError::AssetNotFound { link }) => {
                assert_eq!(link, "nowhere-to-be-found.png")
            }
            other => panic!("expected AssetNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_directories_do_not_match() {
        let temp_dir = TempDir::new().unwrap();
        let doc = temp_dir.path().join("a.md");
        fs::create_dir_all(temp_dir.path().join("photos")).unwrap();

        assert!(locate_asset(&doc, "photos").is_err());
    }
}
