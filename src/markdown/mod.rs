//! Markdown to Note Station HTML
//!
//! Renders the rewritten Markdown of a note with:
//! - Tables, strikethrough, footnotes, definition lists and task lists
//! - Bare URL autolinking and typographic punctuation
//! - Line-numbered, syntax-highlighted fenced code
//! - Note Station checkbox widgets in place of task list inputs

mod highlight;
mod render;

pub use highlight::*;
pub use render::*;
