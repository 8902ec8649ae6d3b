//! Semantic text styles (spec.md §4.10: "primary/success/error/dim/bold/
//! italic"), wrapping `anstyle` the way the teacher's root crate pulls in
//! `anstyle`/`anstyle-crossterm` for its own CLI output.

use anstyle::{AnsiColor, Effects, Style as AnstyleStyle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Primary,
    Success,
    Error,
    Dim,
    Bold,
    Italic,
}

impl Style {
    /// Fixed palette per spec.md §4.10: yellow/green/red/gray.
    fn anstyle(self) -> AnstyleStyle {
        match self {
            Style::Primary => AnstyleStyle::new().fg_color(Some(AnsiColor::Yellow.into())),
            Style::Success => AnstyleStyle::new().fg_color(Some(AnsiColor::Green.into())),
            Style::Error => AnstyleStyle::new().fg_color(Some(AnsiColor::Red.into())),
            Style::Dim => AnstyleStyle::new()
                .fg_color(Some(AnsiColor::BrightBlack.into()))
                .effects(Effects::DIMMED),
            Style::Bold => AnstyleStyle::new().effects(Effects::BOLD),
            Style::Italic => AnstyleStyle::new().effects(Effects::ITALIC),
        }
    }

    /// `gsh.ui.styles.<name>(text)`: wraps `text` in the style's ANSI
    /// escape codes, resetting afterwards.
    pub fn apply(self, text: &str) -> String {
        let style = self.anstyle();
        format!("{style}{text}{style:#}")
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "primary" => Style::Primary,
            "success" => Style::Success,
            "error" => Style::Error,
            "dim" => Style::Dim,
            "bold" => Style::Bold,
            "italic" => Style::Italic,
            _ => return None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_wraps_and_resets() {
        let out = Style::Bold.apply("hi");
        assert!(out.contains("hi"));
        assert!(out.len() > 2);
    }
}
