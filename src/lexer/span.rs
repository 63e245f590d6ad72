//! Source position tracking, grounded in the teacher's `lexer::Span`.

use colored::Colorize;

/// A single source coordinate plus a copy of the originating source text, so
/// diagnostics can render a caret under the offending token without needing
/// to thread the original `&str` through every error path.
#[derive(Default, Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Span {
    pub line: usize,
    pub col: usize,
    pub source: String,
}

impl Span {
    /// Renders `msg` underneath the offending line, in the style used for
    /// parser and lowering diagnostics: the source line with the offending
    /// column onward in red, a caret, and the message, also in red.
    pub fn to_string(&self, msg: impl ToString) -> String {
        let Span { line, col, source } = self;
        let lines: Vec<&str> = source.lines().collect();
        let line_str = lines.get(line.saturating_sub(1)).copied().unwrap_or("");
        let split_at = col.saturating_sub(1).min(line_str.len());
        let (before, after) = line_str.split_at(split_at);
        let margin = " ".repeat(format!("{line}").len());
        let caret = " ".repeat(col.saturating_sub(1));

        format!(
            "{margin} |\n{line} |{before}{}\n{margin} |{caret}{}",
            after.red(),
            format!("^--- {}", msg.to_string()).red()
        )
    }
}
