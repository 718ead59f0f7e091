use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{Seek, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::models::{Notebook, NotebookConfig, ProcessedImage};
use super::MANIFEST_NAME;
use crate::error::Result;

/// A serialized note waiting in the working area
#[derive(Debug, Clone)]
pub struct StagedNote {
    /// Archive member name, `note_<base64(title)>`
    pub member_name: String,
    /// Serialized note on disk
    pub path: PathBuf,
}

/// An archive member that could not be written
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedMember {
    pub name: String,
    pub reason: String,
}

/// What ended up inside the archive
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageSummary {
    pub archive_path: PathBuf,
    /// Note members written, in archive order
    pub notes: Vec<String>,
    /// Image members written
    pub images: Vec<String>,
    pub skipped: Vec<SkippedMember>,
}

/// Write the NSX archive.
///
/// Notes and images that fail are logged and left out; the notebook
/// descriptor and the manifest are required, so failing to write those
/// (or to create/finish the archive) aborts.
pub fn package_nsx(
    output_path: &Path,
    notes: &[StagedNote],
    images: &[ProcessedImage],
    notebook_name: &str,
    notebook_id: &str,
) -> Result<PackageSummary> {
    let file = File::create(output_path)?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut summary = PackageSummary {
        archive_path: output_path.to_path_buf(),
        ..Default::default()
    };

    for note in notes {
        let data = match fs::read(&note.path) {
            Ok(data) => data,
            Err(e) => {
                log::warn!("Error reading note file {:?}: {}", note.path, e);
                summary.skip(&note.member_name, e);
                continue;
            }
        };

        match write_member(&mut zip, &note.member_name, &data, options) {
            Ok(()) => summary.notes.push(note.member_name.clone()),
            Err(e) => {
                log::warn!("Error writing note to zip {}: {}", note.member_name, e);
                summary.skip(&note.member_name, e);
            }
        }
    }

    let mut written_images: HashSet<String> = HashSet::new();
    for image in images {
        let member_name = image.member_name();
        if written_images.contains(&member_name) {
            log::debug!("Image {} already packaged", member_name);
            continue;
        }

        let data = match image.decode() {
            Ok(data) => data,
            Err(e) => {
                log::warn!("Error decoding image data for {}: {}", member_name, e);
                summary.skip(&member_name, e);
                continue;
            }
        };

        match write_member(&mut zip, &member_name, &data, options) {
            Ok(()) => {
                log::info!("  Processed image: {}", member_name);
                written_images.insert(member_name.clone());
                summary.images.push(member_name);
            }
            Err(e) => {
                log::warn!("Error writing image to zip {}: {}", member_name, e);
                summary.skip(&member_name, e);
            }
        }
    }

    let notebook_json = serde_json::to_vec(&Notebook::new(notebook_name))?;
    write_member(&mut zip, notebook_id, &notebook_json, options)?;

    let config = NotebookConfig {
        note: summary.notes.clone(),
        notebook: vec![notebook_id.to_string()],
    };
    let config_json = serde_json::to_vec(&config)?;
    write_member(&mut zip, MANIFEST_NAME, &config_json, options)?;

    zip.finish()?;

    Ok(summary)
}

fn write_member<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    name: &str,
    data: &[u8],
    options: SimpleFileOptions,
) -> Result<()> {
    zip.start_file(name, options)?;
    zip.write_all(data)?;
    Ok(())
}

impl PackageSummary {
    fn skip(&mut self, name: &str, reason: impl ToString) {
        self.skipped.push(SkippedMember {
            name: name.to_string(),
            reason: reason.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nsx::fingerprint;
    use std::io::Read;
    use tempfile::TempDir;
    use zip::ZipArchive;

    fn read_member(archive: &mut ZipArchive<File>, name: &str) -> Vec<u8> {
        let mut member = archive.by_name(name).unwrap();
        let mut data = Vec::new();
        member.read_to_end(&mut data).unwrap();
        data
    }

    #[test]
    fn test_package_layout() {
        let temp_dir = TempDir::new().unwrap();
        let note_path = temp_dir.path().join("0.json");
        fs::write(&note_path, r#"{"title":"a"}"#).unwrap();

        let png = b"\x89PNG\r\n\x1a\nfake";
        let image = ProcessedImage::new(fingerprint(png), png);
        let output = temp_dir.path().join("out.nsx");

        let notes = vec![StagedNote {
            member_name: "note_YQ==".to_string(),
            path: note_path,
        }];
        let summary = package_nsx(&output, &notes, &[image.clone()], "Work", "nb_123").unwrap();

        assert_eq!(summary.notes, vec!["note_YQ==".to_string()]);
        assert_eq!(summary.images, vec![image.member_name()]);
        assert!(summary.skipped.is_empty());

        let mut archive = ZipArchive::new(File::open(&output).unwrap()).unwrap();
        assert_eq!(archive.len(), 4);

        assert_eq!(read_member(&mut archive, "note_YQ=="), br#"{"title":"a"}"#);

        let image_bytes = read_member(&mut archive, &image.member_name());
        assert_eq!(fingerprint(&image_bytes), image.fingerprint);

        let notebook: Notebook =
            serde_json::from_slice(&read_member(&mut archive, "nb_123")).unwrap();
        assert_eq!(notebook.title, "Work");
        assert_eq!(notebook.category, "notebook");

        let config: NotebookConfig =
            serde_json::from_slice(&read_member(&mut archive, "config.json")).unwrap();
        assert_eq!(config.note, vec!["note_YQ==".to_string()]);
        assert_eq!(config.notebook, vec!["nb_123".to_string()]);
    }

    #[test]
    fn test_missing_note_file_is_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let good = temp_dir.path().join("good.json");
        fs::write(&good, "{}").unwrap();
        let output = temp_dir.path().join("out.nsx");

        let notes = vec![
            StagedNote {
                member_name: "note_Z29vZA==".to_string(),
                path: good,
            },
            StagedNote {
                member_name: "note_Z29uZQ==".to_string(),
                path: temp_dir.path().join("gone.json"),
            },
        ];
        let summary = package_nsx(&output, &notes, &[], "Work", "nb_1").unwrap();

        assert_eq!(summary.notes, vec!["note_Z29vZA==".to_string()]);
        assert_eq!(summary.skipped.len(), 1);
        assert_eq!(summary.skipped[0].name, "note_Z29uZQ==");

        let mut archive = ZipArchive::new(File::open(&output).unwrap()).unwrap();
        let config: NotebookConfig =
            serde_json::from_slice(&read_member(&mut archive, "config.json")).unwrap();
        assert_eq!(config.note, summary.notes);
        assert!(archive.by_name("note_Z29uZQ==").is_err());
    }

    #[test]
    fn test_corrupt_and_duplicate_images() {
        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("out.nsx");

        let good = ProcessedImage::new("aaa".to_string(), b"gif");
        let corrupt = ProcessedImage {
            fingerprint: "bbb".to_string(),
            data_b64: "not base64!".to_string(),
        };
        let images = vec![good.clone(), corrupt, good];

        let summary = package_nsx(&output, &[], &images, "Work", "nb_1").unwrap();

        assert_eq!(summary.images, vec!["file_aaa".to_string()]);
        assert_eq!(summary.skipped.len(), 1);
        assert_eq!(summary.skipped[0].name, "file_bbb");

        let archive = ZipArchive::new(File::open(&output).unwrap()).unwrap();
        assert_eq!(archive.len(), 3);
    }

    #[test]
    fn test_unwritable_archive_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("missing").join("out.nsx");
        assert!(package_nsx(&output, &[], &[], "Work", "nb_1").is_err());
    }
}
