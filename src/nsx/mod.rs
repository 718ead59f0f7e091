//! Synology Note Station (.nsx) archive format
//!
//! Handles the record types stored in an NSX archive and writing the
//! archive itself:
//! - Notes, notebook descriptor and the `config.json` manifest
//! - Attachment records and image payloads
//! - Member naming and content fingerprints

mod fingerprint;
mod models;
mod package;

pub use fingerprint::*;
pub use models::*;
pub use package::*;

/// Prefix of note members
pub const NOTE_PREFIX: &str = "note_";
/// Prefix of attachment keys and image members
pub const FILE_PREFIX: &str = "file_";
/// Prefix of the notebook id
pub const NOTEBOOK_PREFIX: &str = "nb_";
/// Name of the manifest member
pub const MANIFEST_NAME: &str = "config.json";
