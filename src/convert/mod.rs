//! Markdown folder conversion
//!
//! Turns a folder of Markdown files into NSX notes:
//! - `locate`: finds the files that references point to
//! - `media`: sniffs attachment media types
//! - `rewrite`: replaces image and document references with placeholders
//! - `assemble`: builds the note record for one document
//! - `batch`: drives a whole folder and packages the archive

pub mod assemble;
pub mod batch;
pub mod locate;
pub mod media;
pub mod rewrite;

pub use assemble::{assemble_note, generate_excerpt, note_member_name};
pub use batch::{output_archive_path, Converter, DocumentOutcome, RunSummary};
pub use locate::locate_asset;
pub use media::detect_media_type;
pub use rewrite::{rewrite_references, scan_references, ReferenceKind, SkippedReference};
