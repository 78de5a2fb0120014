//! Console status output

use std::io::{self, IsTerminal, Write};

use colored::Colorize;

use crate::outcome::ResultStatus;

const INDENT: &str = "  ";

/// Writes per-test status lines and the final summary
pub struct ConsoleOutput {
    writer: Box<dyn Write + Send>,
    color: bool,
}

impl ConsoleOutput {
    /// Output on stdout, colored when it is a terminal.
    pub fn stdout() -> Self {
        let stdout = io::stdout();
        Self {
            color: stdout.is_terminal(),
            writer: Box::new(stdout),
        }
    }

    /// Plain output on an arbitrary sink.
    pub fn plain<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            writer: Box::new(writer),
            color: false,
        }
    }

    pub fn test_line(&mut self, depth: usize, status: ResultStatus, full_title: &str) -> io::Result<()> {
        let label = if self.color {
            match status {
                ResultStatus::Passed => status.as_str().green().to_string(),
                ResultStatus::Failed => status.as_str().red().to_string(),
                ResultStatus::Skipped => status.as_str().yellow().to_string(),
            }
        } else {
            status.as_str().to_string()
        };
        writeln!(self.writer, "{}", format_test_line(depth, &label, full_title))
    }

    pub fn summary(&mut self, passed: usize, total: usize) -> io::Result<()> {
        writeln!(self.writer, "{}", format_summary(passed, total))?;
        self.writer.flush()
    }
}

/// `"<INDENT><RESULT> - <full title>"`
pub fn format_test_line(depth: usize, result: &str, full_title: &str) -> String {
    format!("{}{} - {}", INDENT.repeat(depth), result, full_title)
}

pub fn format_summary(passed: usize, total: usize) -> String {
    format!("{}/{} ok", passed, total)
}
