//! Convert a folder of Markdown notes into a Synology Note Station
//! (`.nsx`) archive.

pub mod config;
pub mod convert;
pub mod error;
pub mod markdown;
pub mod nsx;

pub use config::{AttachmentScope, ConvertOptions};
pub use convert::{Converter, DocumentOutcome, RunSummary};
pub use error::{ConvertError, Result};
