use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub const DEFAULT_NOTEBOOK_NAME: &str = "Imported Notebook";
pub const DEFAULT_WORK_DIR: &str = "temp_nsx_output";
pub const DEFAULT_CODE_THEME: &str = "InspiredGitHub";

/// How the attachment table is shared between the notes of one run
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentScope {
    /// One table for the whole batch; every note carries everything
    /// registered so far
    #[default]
    Batch,
    /// A fresh table per note
    Document,
}

/// Conversion settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertOptions {
    /// Display name of the destination notebook
    pub notebook_name: String,
    /// Archive path; derived from the source folder when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    /// Scratch directory for serialized notes, removed after the run
    pub work_dir: PathBuf,
    pub attachment_scope: AttachmentScope,
    /// syntect theme used for fenced code blocks
    pub code_theme: String,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            notebook_name: DEFAULT_NOTEBOOK_NAME.to_string(),
            output: None,
            work_dir: PathBuf::from(DEFAULT_WORK_DIR),
            attachment_scope: AttachmentScope::Batch,
            code_theme: DEFAULT_CODE_THEME.to_string(),
        }
    }
}

impl ConvertOptions {
    /// Load options from a TOML file; missing keys keep their defaults
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let options: ConvertOptions = toml::from_str(content)?;
        Ok(options)
    }
}
