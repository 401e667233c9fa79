//! Terminal rendering of answer segments

use std::io::{self, Write};

use crossterm::{
    cursor::MoveTo,
    queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};
use syntect::easy::HighlightLines;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::parsing::SyntaxSet;
use syntect::util::{LinesWithEndings, as_24_bit_terminal_escaped};

use crate::segment::{Segment, SegmentKind};

const FALLBACK_WIDTH: u16 = 80;
const THEME_NAME: &str = "base16-ocean.dark";

fn normalize_lang_hint(s: &str) -> String {
    let t = s.trim().to_ascii_lowercase();
    match t.as_str() {
        "py" | "python3" => "python".into(),
        "sh" | "zsh" | "shell" | "console" => "bash".into(),
        "js" | "jsx" => "javascript".into(),
        "ts" | "tsx" => "typescript".into(),
        "rs" => "rust".into(),
        "yml" => "yaml".into(),
        "h" => "c".into(),
        "cc" | "cxx" | "hpp" | "hxx" => "cpp".into(),
        "kt" => "kotlin".into(),
        other => other.into(),
    }
}

/// Syntax highlighting for code segments
pub struct Highlighter {
    syntaxes: SyntaxSet,
    theme: Option<Theme>,
}

impl Highlighter {
    pub fn new() -> Self {
        let syntaxes = SyntaxSet::load_defaults_newlines();
        let mut themes = ThemeSet::load_defaults();
        let theme = themes.themes.remove(THEME_NAME);
        if theme.is_none() {
            tracing::warn!(theme = THEME_NAME, "highlighting theme missing; code is shown plain");
        }
        Self { syntaxes, theme }
    }

    /// ANSI-highlighted `code`; plain text for unknown languages or on highlighter errors
    pub fn highlight(&self, language: Option<&str>, code: &str) -> String {
        let Some(theme) = &self.theme else {
            return code.to_string();
        };
        let syntax = language
            .map(normalize_lang_hint)
            .and_then(|lang| {
                self.syntaxes
                    .find_syntax_by_token(&lang)
                    .or_else(|| self.syntaxes.find_syntax_by_extension(&lang))
            })
            .unwrap_or_else(|| self.syntaxes.find_syntax_plain_text());

        let mut h = HighlightLines::new(syntax, theme);
        let mut out = String::new();
        for line in LinesWithEndings::from(code) {
            match h.highlight_line(line, &self.syntaxes) {
                Ok(ranges) => out.push_str(&as_24_bit_terminal_escaped(&ranges, false)),
                Err(e) => {
                    tracing::debug!("highlighting failed: {}", e);
                    return code.to_string();
                }
            }
        }
        out.push_str("\x1b[0m");
        out
    }
}

impl Default for Highlighter {
    fn default() -> Self {
        Self::new()
    }
}

/// Renders answers between separators: `text:` segments in color, `code:` segments highlighted
pub struct Display {
    highlighter: Highlighter,
}

impl Display {
    pub fn new() -> Self {
        Self {
            highlighter: Highlighter::new(),
        }
    }

    fn width() -> u16 {
        terminal::size()
            .map(|(cols, _)| cols)
            .ok()
            .filter(|cols| *cols > 0)
            .unwrap_or(FALLBACK_WIDTH)
    }

    pub fn render(&self, segments: &[Segment], out: &mut impl Write) -> io::Result<()> {
        self.render_with_width(segments, Self::width(), out)
    }

    pub fn render_with_width(
        &self,
        segments: &[Segment],
        width: u16,
        out: &mut impl Write,
    ) -> io::Result<()> {
        separator(width, out)?;
        for segment in segments {
            match segment.kind {
                SegmentKind::Text => queue!(
                    out,
                    SetForegroundColor(Color::Magenta),
                    Print(format!("{}: ", segment.kind.label())),
                    SetForegroundColor(Color::Green),
                    Print(&segment.content),
                    ResetColor,
                    Print("\n"),
                )?,
                SegmentKind::Code => {
                    let code = self
                        .highlighter
                        .highlight(segment.language.as_deref(), &segment.content);
                    queue!(
                        out,
                        SetForegroundColor(Color::Magenta),
                        Print(format!("{}:\n", segment.kind.label())),
                        ResetColor,
                        Print(code),
                        Print("\n"),
                    )?
                }
            }
        }
        separator(width, out)?;
        out.flush()
    }

    /// Status lines such as the apology or the iteration fallback
    pub fn notice(&self, message: &str, out: &mut impl Write) -> io::Result<()> {
        queue!(
            out,
            SetForegroundColor(Color::Magenta),
            Print(message),
            ResetColor,
            Print("\n"),
        )?;
        out.flush()
    }

    pub fn prompt(&self, out: &mut impl Write) -> io::Result<()> {
        queue!(
            out,
            Print("\n"),
            SetForegroundColor(Color::Yellow),
            Print("Type '"),
            SetForegroundColor(Color::Green),
            Print("FIN"),
            SetForegroundColor(Color::Yellow),
            Print("' on a new line to send your message, or to exit.\nType '"),
            SetForegroundColor(Color::Green),
            Print("CLEAR"),
            SetForegroundColor(Color::Yellow),
            Print("' on a new line to clear the message history.\nEnter your message:"),
            SetForegroundColor(Color::Cyan),
            Print("\n"),
        )?;
        out.flush()
    }

    pub fn clear_screen(&self, out: &mut impl Write) -> io::Result<()> {
        queue!(out, Clear(ClearType::All), Clear(ClearType::Purge), MoveTo(0, 0))?;
        out.flush()
    }
}

impl Default for Display {
    fn default() -> Self {
        Self::new()
    }
}

/// Progress hint printed while a tool runs
pub fn tool_activity(message: &str, out: &mut impl Write) -> io::Result<()> {
    queue!(
        out,
        SetForegroundColor(Color::DarkGrey),
        Print(message),
        ResetColor,
        Print("\n"),
    )?;
    out.flush()
}

fn separator(width: u16, out: &mut impl Write) -> io::Result<()> {
    queue!(
        out,
        SetForegroundColor(Color::Magenta),
        Print("_".repeat(width as usize)),
        ResetColor,
        Print("\n"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::segment;

    fn strip_ansi(s: &str) -> String {
        let re = regex::Regex::new(r"\x1b\[[0-9;?]*[A-Za-z]").unwrap();
        re.replace_all(s, "").into_owned()
    }

    fn rendered(text: &str, width: u16) -> String {
        let mut out = Vec::new();
        Display::new()
            .render_with_width(&segment(text), width, &mut out)
            .unwrap();
        strip_ansi(&String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_render_labels_and_separators() {
        let plain = rendered("a ```python\nprint(1)\n``` b", 10);
        assert_eq!(
            plain,
            "__________\ntext: a\ncode:\nprint(1)\ntext: b\n__________\n"
        );
    }

    #[test]
    fn test_empty_answer_renders_only_separators() {
        assert_eq!(rendered("", 3), "___\n___\n");
    }

    #[test]
    fn test_highlight_keeps_code_text() {
        let h = Highlighter::new();
        let colored = h.highlight(Some("rs"), "fn main() {}\n");
        assert!(colored.contains("\x1b["));
        assert_eq!(strip_ansi(&colored), "fn main() {}\n");
    }

    #[test]
    fn test_language_aliases() {
        assert_eq!(normalize_lang_hint(" TS "), "typescript");
        assert_eq!(normalize_lang_hint("tsx"), "typescript");
        assert_eq!(normalize_lang_hint("hxx"), "cpp");
        assert_eq!(normalize_lang_hint("json"), "json");
        assert_eq!(normalize_lang_hint("toml"), "toml");
    }

    #[test]
    fn test_json_fence_is_highlighted() {
        let h = Highlighter::new();
        let out = h.highlight(Some("json"), "{\"a\": 1}\n");
        assert!(out.contains("\x1b[38;2;"));
        assert_eq!(strip_ansi(&out), "{\"a\": 1}\n");
    }

    #[test]
    fn test_unknown_language_falls_back_to_plain_text_syntax() {
        let h = Highlighter::new();
        let out = h.highlight(Some("no-such-language"), "x = 1");
        assert_eq!(strip_ansi(&out), "x = 1");
    }
}
