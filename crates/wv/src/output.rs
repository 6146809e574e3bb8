//! Styled status lines for the CLI.

use console::{Term, style};

/// Writes human-facing status lines to stderr.
///
/// Keeping stdout clean lets `wv export --dry-run` output be piped. Colors
/// degrade to plain text when stderr is not a terminal.
pub(crate) struct Output {
    term: Term,
}

impl Output {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self { term: Term::stderr() }
    }

    pub(crate) fn info(&self, msg: &str) {
        let _ = self.term.write_line(msg);
    }

    pub(crate) fn success(&self, msg: &str) {
        let _ = self.term.write_line(&style(msg).green().to_string());
    }

    pub(crate) fn warning(&self, msg: &str) {
        let _ = self.term.write_line(&style(msg).yellow().to_string());
    }

    pub(crate) fn error(&self, msg: &str) {
        let _ = self.term.write_line(&style(msg).red().to_string());
    }

    /// Emphasized line for section headings in summaries.
    pub(crate) fn highlight(&self, msg: &str) {
        let _ = self.term.write_line(&style(msg).cyan().bold().to_string());
    }

    pub(crate) fn separator(&self) {
        let _ = self.term.write_line(&"=".repeat(70));
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}
