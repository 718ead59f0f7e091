use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Glob pattern error: {0}")]
    GlobPattern(#[from] glob::PatternError),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Markdown folder '{0}' does not exist")]
    SourceDirNotFound(PathBuf),

    #[error("No markdown files found in {0}")]
    NoMarkdownFiles(PathBuf),

    #[error("File not found: {link}")]
    AssetNotFound { link: String },

    #[error("Highlight error: {0}")]
    Highlight(String),

    #[error("Work directory '{work_dir}' would remove '{protected}'")]
    UnsafeWorkDir { work_dir: PathBuf, protected: PathBuf },
}

pub type Result<T> = std::result::Result<T, ConvertError>;
