use syntect::easy::HighlightLines;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::parsing::SyntaxSet;
use syntect::util::{LinesWithEndings, as_24_bit_terminal_escaped};

const THEME: &str = "base16-ocean.dark";
const RESET: &str = "\x1b[0m";

/// Terminal highlighting for echoed SQL.
pub struct Highlighter {
    syntaxes: SyntaxSet,
    theme: Option<Theme>,
}

impl Highlighter {
    pub fn new() -> Self {
        let mut themes = ThemeSet::load_defaults();
        Self {
            syntaxes: SyntaxSet::load_defaults_newlines(),
            theme: themes.themes.remove(THEME),
        }
    }

    /// Returns `src` with ANSI colors, or unchanged if it cannot be
    /// highlighted.
    pub fn highlight(&self, src: &str) -> String {
        let Some(theme) = &self.theme else {
            return src.to_string();
        };
        let syntax = self
            .syntaxes
            .find_syntax_by_extension("sql")
            .unwrap_or_else(|| self.syntaxes.find_syntax_plain_text());
        let mut lines = HighlightLines::new(syntax, theme);
        let mut out = String::new();
        for line in LinesWithEndings::from(src) {
            match lines.highlight_line(line, &self.syntaxes) {
                Ok(ranges) => out.push_str(&as_24_bit_terminal_escaped(&ranges, false)),
                Err(_) => return src.to_string(),
            }
        }
        out.push_str(RESET);
        out
    }
}

impl Default for Highlighter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_keeps_text() {
        let src = "SELECT name FROM users;\n";
        let out = Highlighter::new().highlight(src);
        assert!(out.ends_with(RESET));
        assert!(out.contains("users"));
        assert!(out.contains("\x1b["));
    }
}
