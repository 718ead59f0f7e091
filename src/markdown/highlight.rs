use syntect::easy::HighlightLines;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::html::{styled_line_to_highlighted_html, IncludeBackground};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;

use crate::config::DEFAULT_CODE_THEME;
use crate::error::{ConvertError, Result};

const TAB_WIDTH: usize = 4;

/// Leading lines tried for first-line markers (shebang, `<?php`, modelines)
const FIRST_LINE_PROBES: usize = 5;

/// Line prefixes that hint at a language, keyed by syntect token. Each line
/// of a block votes for every language it matches; ties go to the earlier
/// entry.
const KEYWORD_HINTS: &[(&str, &[&str])] = &[
    ("py", &["def ", "import ", "from ", "elif ", "print(", "class ", "if __name__"]),
    ("rs", &["fn ", "pub fn ", "let ", "use std", "impl ", "#[derive", "mod ", "match "]),
    ("c", &["#include", "int main(", "printf(", "#define "]),
    ("go", &["package ", "func ", "fmt."]),
    ("java", &["public class ", "public static ", "private ", "System.out."]),
    ("js", &["function ", "const ", "var ", "console.log", "export ", "require("]),
    ("sh", &["echo ", "sudo ", "cd ", "if [ ", "apt ", "cargo ", "npm ", "export PATH="]),
    ("sql", &["SELECT ", "INSERT ", "UPDATE ", "DELETE ", "CREATE TABLE", "FROM ", "WHERE "]),
    ("html", &["<!DOCTYPE", "<html", "<div", "<head", "<body", "<p>"]),
];

const CODE_BLOCK_STYLE: &str = "background-color: #f6f8fa !important;border: 1px solid #d1d5da;padding: 16px;\
margin: 10px 0;border-radius: 12px;box-shadow: 0 1px 3px rgba(0,0,0,0.12), 0 1px 2px rgba(0,0,0,0.24);\
display:inline-block; overflow-x: auto;max-width: 100%;min-width: 60%;";

const CODE_WRAPPER_OPEN: &str =
    r#"<code style="white-space: pre; font-family: Menlo, Monaco, Consolas, monospace; display: inline-block;">"#;

const LINE_NUMBER_STYLE: &str =
    "white-space:pre;user-select:none;margin-right:0.4em;padding:0 0.4em 0 0.4em;color:#7f7f7f";

/// Syntax highlighter for fenced code blocks
pub struct CodeHighlighter {
    syntaxes: SyntaxSet,
    theme: Theme,
}

impl CodeHighlighter {
    pub fn new(theme_name: &str) -> Self {
        let mut themes = ThemeSet::load_defaults();
        let theme = match themes.themes.remove(theme_name) {
            Some(theme) => theme,
            None => {
                log::warn!(
                    "Unknown code theme '{}', using {}",
                    theme_name,
                    DEFAULT_CODE_THEME
                );
                themes.themes.remove(DEFAULT_CODE_THEME).unwrap_or_default()
            }
        };

        Self {
            syntaxes: SyntaxSet::load_defaults_newlines(),
            theme,
        }
    }

    /// Syntax for a fence language; unknown or missing languages are
    /// guessed from the code itself
    fn find_syntax(&self, language: &str, code: &str) -> &SyntaxReference {
        let token = language.trim();
        if !token.is_empty() {
            if let Some(syntax) = self.syntaxes.find_syntax_by_token(token) {
                return syntax;
            }
        }

        self.guess_syntax(code).unwrap_or_else(|| self.syntaxes.find_syntax_plain_text())
    }

    fn guess_syntax(&self, code: &str) -> Option<&SyntaxReference> {
        let first_line_match = code
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .take(FIRST_LINE_PROBES)
            .find_map(|line| self.syntaxes.find_syntax_by_first_line(line));
        if first_line_match.is_some() {
            return first_line_match;
        }

        guess_token(code).and_then(|token| self.syntaxes.find_syntax_by_token(token))
    }

    /// Render a fenced block as a styled, line-numbered container
    pub fn highlight_block(&self, language: &str, code: &str) -> Result<String> {
        let code = expand_tabs(code);
        let syntax = self.find_syntax(language, &code);
        let mut highlighter = HighlightLines::new(syntax, &self.theme);

        let mut lines = Vec::new();
        for line in LinesWithEndings::from(&code) {
            let regions = highlighter
                .highlight_line(line, &self.syntaxes)
                .map_err(|e| ConvertError::Highlight(e.to_string()))?;
            let line_html = styled_line_to_highlighted_html(&regions[..], IncludeBackground::No)
                .map_err(|e| ConvertError::Highlight(e.to_string()))?;
            lines.push(line_html);
        }

        Ok(wrap_block(language, &lines))
    }

    /// Same container without colors, used when highlighting fails
    pub fn plain_block(&self, language: &str, code: &str) -> String {
        let code = expand_tabs(code);
        let lines: Vec<String> = LinesWithEndings::from(&code)
            .map(|line| html_escape::encode_text(line).to_string())
            .collect();
        wrap_block(language, &lines)
    }
}

/// Language token with the most keyword hits, if any line matched
fn guess_token(code: &str) -> Option<&'static str> {
    let mut best: Option<(&'static str, usize)> = None;

    for &(token, prefixes) in KEYWORD_HINTS {
        let hits = code
            .lines()
            .map(str::trim_start)
            .filter(|line| prefixes.iter().any(|prefix| line.starts_with(*prefix)))
            .count();
        if hits > 0 && best.map_or(true, |(_, most)| hits > most) {
            best = Some((token, hits));
        }
    }

    best.map(|(token, _)| token)
}

fn expand_tabs(code: &str) -> String {
    code.replace('\t', &" ".repeat(TAB_WIDTH))
}

fn wrap_block(language: &str, lines: &[String]) -> String {
    let mut html = format!(
        r#"<div style="{}"><pre class="language-{}">{}"#,
        CODE_BLOCK_STYLE,
        html_escape::encode_double_quoted_attribute(language),
        CODE_WRAPPER_OPEN
    );

    for (index, line) in lines.iter().enumerate() {
        html.push_str(&format!(
            r#"<span style="display:flex;"><span style="{}">{}</span><span>{}</span></span>"#,
            LINE_NUMBER_STYLE,
            index + 1,
            line
        ));
    }

    html.push_str("</code></pre></div>\n");
    html
}
