use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use glob::glob;
use serde::Serialize;

use super::assemble::{assemble_note, UNTITLED};
use super::rewrite::{rewrite_references, SkippedReference};
use crate::config::{AttachmentScope, ConvertOptions};
use crate::error::{ConvertError, Result};
use crate::markdown::MarkdownRenderer;
use crate::nsx::{notebook_id, package_nsx, AttachmentStore, PackageSummary, StagedNote};

const ARCHIVE_EXTENSION: &str = ".nsx";

/// What happened to one Markdown file
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum DocumentOutcome {
    Converted {
        source: PathBuf,
        member_name: String,
        /// References turned into attachments
        attachments: usize,
        /// References left as plain Markdown
        skipped_references: Vec<SkippedReference>,
    },
    Skipped {
        source: PathBuf,
        reason: String,
    },
}

/// Result of a whole run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub notebook_id: String,
    pub documents: Vec<DocumentOutcome>,
    pub package: PackageSummary,
}

impl RunSummary {
    pub fn converted_count(&self) -> usize {
        self.documents
            .iter()
            .filter(|d| matches!(d, DocumentOutcome::Converted { .. }))
            .count()
    }

    pub fn skipped_count(&self) -> usize {
        self.documents.len() - self.converted_count()
    }

    pub fn archive_path(&self) -> &Path {
        &self.package.archive_path
    }
}

/// Scratch directory that is removed when dropped, whatever the outcome
struct WorkDir {
    path: PathBuf,
}

impl WorkDir {
    fn create(path: &Path) -> Result<Self> {
        if path.exists() {
            fs::remove_dir_all(path)?;
        }
        fs::create_dir_all(path)?;
        Ok(Self {
            path: path.to_path_buf(),
        })
    }
}

impl Drop for WorkDir {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_dir_all(&self.path) {
            log::warn!("Could not clean up temporary directory {:?}: {}", self.path, e);
        }
    }
}

/// A document that made it into the working area
struct ConvertedDocument {
    staged: StagedNote,
    attachments: usize,
    skipped_references: Vec<SkippedReference>,
}

/// Markdown folder to NSX converter.
///
/// The attachment store lives for the whole run. With
/// [`AttachmentScope::Batch`] every note carries all attachments
/// registered so far, including those of earlier notes.
pub struct Converter {
    options: ConvertOptions,
    store: AttachmentStore,
    renderer: MarkdownRenderer,
    clock: Box<dyn Fn() -> i64>,
}

impl Converter {
    pub fn new(options: ConvertOptions) -> Self {
        let renderer = MarkdownRenderer::new(&options.code_theme);
        Self {
            options,
            store: AttachmentStore::new(),
            renderer,
            clock: Box::new(|| Utc::now().timestamp()),
        }
    }

    /// Replace the clock used for timestamps (seconds since the epoch)
    pub fn with_clock(mut self, clock: impl Fn() -> i64 + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Convert every `*.md` file directly inside `md_folder` and package the
    /// results into one archive.
    ///
    /// Per-document and per-reference problems are logged and recorded in the
    /// summary. Errors are returned when the folder is missing or holds no
    /// Markdown, when the work directory would swallow the folder or the
    /// archive, and when the archive cannot be written.
    pub fn batch_convert(&mut self, md_folder: &Path, notebook_name: &str) -> Result<RunSummary> {
        if !md_folder.is_dir() {
            return Err(ConvertError::SourceDirNotFound(md_folder.to_path_buf()));
        }

        let output_path = self
            .options
            .output
            .clone()
            .unwrap_or_else(|| output_archive_path(md_folder));

        check_work_dir(&self.options.work_dir, md_folder, &output_path)?;
        let work_dir = WorkDir::create(&self.options.work_dir)?;

        let md_files = discover_markdown_files(md_folder)?;
        if md_files.is_empty() {
            return Err(ConvertError::NoMarkdownFiles(md_folder.to_path_buf()));
        }
        log::info!("Found {} markdown files to convert", md_files.len());

        let notebook_id = notebook_id(notebook_name);
        log::info!("Using notebook ID: {}", notebook_id);

        let mut documents = Vec::with_capacity(md_files.len());
        let mut staged = Vec::new();

        for (index, md_file) in md_files.iter().enumerate() {
            log::info!("Converting {}...", display_name(md_file));

            match self.convert_document(md_file, &notebook_id, &work_dir.path, index) {
                Ok(converted) => {
                    log::info!(
                        "  Successfully converted: {} -> {}",
                        display_name(md_file),
                        converted.staged.member_name
                    );
                    documents.push(DocumentOutcome::Converted {
                        source: md_file.clone(),
                        member_name: converted.staged.member_name.clone(),
                        attachments: converted.attachments,
                        skipped_references: converted.skipped_references,
                    });
                    staged.push(converted.staged);
                }
                Err(e) => {
                    log::warn!("Error converting {:?}: {}", md_file, e);
                    documents.push(DocumentOutcome::Skipped {
                        source: md_file.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        log::info!("Packaging into {:?}", output_path);
        let package = package_nsx(
            &output_path,
            &staged,
            self.store.images(),
            notebook_name,
            &notebook_id,
        )?;

        let summary = RunSummary {
            notebook_id,
            documents,
            package,
        };
        log::info!(
            "Successfully converted {} files to {:?}",
            summary.package.notes.len(),
            output_path
        );

        Ok(summary)
    }

    fn convert_document(
        &mut self,
        source: &Path,
        notebook_id: &str,
        work_dir: &Path,
        index: usize,
    ) -> Result<ConvertedDocument> {
        let markdown = read_markdown(source)?;

        if self.options.attachment_scope == AttachmentScope::Document {
            self.store.clear_attachments();
        }

        let rewritten = rewrite_references(source, &markdown, &mut self.store, &*self.clock);

        let title = document_title(source);
        let (note, member_name) = assemble_note(
            &title,
            &rewritten.text,
            notebook_id,
            self.store.attachments(),
            &self.renderer,
            (self.clock)(),
        );

        let note_json = serde_json::to_vec_pretty(&note)?;
        let path = work_dir.join(format!("{:04}.json", index));
        fs::write(&path, note_json)?;

        Ok(ConvertedDocument {
            staged: StagedNote { member_name, path },
            attachments: rewritten.resolved.len(),
            skipped_references: rewritten.skipped,
        })
    }
}

/// The work directory is wiped before and after a run, so it must not hold
/// the source folder or the archive being written
fn check_work_dir(work_dir: &Path, md_folder: &Path, output_path: &Path) -> Result<()> {
    let work = resolve_path(work_dir)?;

    for protected in [md_folder, output_path] {
        if resolve_path(protected)?.starts_with(&work) {
            return Err(ConvertError::UnsafeWorkDir {
                work_dir: work_dir.to_path_buf(),
                protected: protected.to_path_buf(),
            });
        }
    }
    Ok(())
}

/// Canonical form of `path`; components that do not exist yet are appended
/// to the canonical form of the longest existing ancestor
fn resolve_path(path: &Path) -> Result<PathBuf> {
    let mut existing = path;
    let mut missing = Vec::new();

    while !existing.exists() {
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                existing = parent;
            }
            _ => break,
        }
    }

    let base = if existing.as_os_str().is_empty() {
        Path::new(".")
    } else {
        existing
    };
    let mut resolved = base.canonicalize()?;
    for name in missing.iter().rev() {
        resolved.push(name);
    }
    Ok(resolved)
}

/// Archive path for a source folder: the folder path without trailing
/// separators, plus `.nsx`
pub fn output_archive_path(md_folder: &Path) -> PathBuf {
    let folder = md_folder.to_string_lossy();
    let trimmed = folder.trim_end_matches(|c| c == '/' || c == '\\');
    PathBuf::from(format!("{}{}", trimmed, ARCHIVE_EXTENSION))
}

/// `*.md` entries directly inside `md_folder`, sorted
pub fn discover_markdown_files(md_folder: &Path) -> Result<Vec<PathBuf>> {
    let folder = glob::Pattern::escape(&md_folder.to_string_lossy());
    let pattern = format!("{}/*.md", folder.trim_end_matches(|c| c == '/' || c == '\\'));

    let mut files = Vec::new();
    for entry in glob(&pattern)? {
        match entry {
            Ok(path) => files.push(path),
            Err(e) => log::warn!("Skipping unreadable entry: {}", e),
        }
    }
    files.sort();
    Ok(files)
}

/// Note title: the file name without its `.md` suffix
pub fn document_title(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let title = name.strip_suffix(".md").unwrap_or(&name);
    if title.is_empty() {
        UNTITLED.to_string()
    } else {
        title.to_string()
    }
}

/// Read a Markdown file; invalid UTF-8 is replaced rather than rejected
fn read_markdown(path: &Path) -> Result<String> {
    let data = fs::read(path)?;
    match String::from_utf8(data) {
        Ok(text) => Ok(text),
        Err(e) => {
            log::warn!("File {:?} may contain non-UTF-8 characters", path);
            Ok(String::from_utf8_lossy(e.as_bytes()).into_owned())
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}
