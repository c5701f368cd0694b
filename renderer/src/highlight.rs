use syntect::highlighting::{Theme, ThemeSet};
use syntect::html::highlighted_html_for_string;
use syntect::parsing::SyntaxSet;

use crate::error::RenderError;

/// The fixed visual theme for all highlighted output.
const THEME: &str = "InspiredGitHub";

/// Highlighting profile for a piece of included or inline source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Python,
    PlainText,
}

impl Language {
    /// Map a file extension to a profile: `py` is Python, everything else
    /// falls back to plain text.
    pub fn from_extension(ext: &str) -> Language {
        if ext == "py" {
            Language::Python
        } else {
            Language::PlainText
        }
    }
}

/// Turns source text into inline-styled HTML markup.
///
/// Inline styles keep the output document self-contained: no stylesheet
/// beyond the fixed header link is needed to display highlighted code.
pub struct Highlighter {
    syntaxes: SyntaxSet,
    theme: Theme,
}

impl Highlighter {
    pub fn new() -> Self {
        let syntaxes = SyntaxSet::load_defaults_newlines();
        let themes = ThemeSet::load_defaults();
        let theme = themes
            .themes
            .get(THEME)
            .or_else(|| themes.themes.values().next())
            .cloned()
            .expect("syntect ships at least one default theme");
        Highlighter { syntaxes, theme }
    }

    /// Render `source` as syntax-highlighted HTML for the given profile.
    pub fn highlight(&self, source: &str, language: Language) -> Result<String, RenderError> {
        let syntax = match language {
            Language::Python => self
                .syntaxes
                .find_syntax_by_extension("py")
                .unwrap_or_else(|| self.syntaxes.find_syntax_plain_text()),
            Language::PlainText => self.syntaxes.find_syntax_plain_text(),
        };
        highlighted_html_for_string(source, &self.syntaxes, syntax, &self.theme)
            .map_err(|e| RenderError::Highlight(e.to_string()))
    }
}

impl Default for Highlighter {
    fn default() -> Self {
        Highlighter::new()
    }
}
