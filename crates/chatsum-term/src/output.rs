//! Terminal [`Output`] sink with crossterm styling.

use std::io::Write;

use chatsum::commands::{Output, Style};
use crossterm::style::{Attribute, Color, StyledContent, Stylize, style};
use tracing::warn;

/// Writes `[conversation] line` to `writer`, coloring styled lines when
/// `color` is set.
pub struct TerminalOutput<W: Write> {
    writer: W,
    color: bool,
}

impl<W: Write> TerminalOutput<W> {
    pub fn new(writer: W, color: bool) -> Self {
        Self { writer, color }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_line(&mut self, conversation: &str, kind: Option<Style>, line: &str) {
        let result = if line.is_empty() {
            writeln!(self.writer)
        } else {
            let prefix = format!("[{conversation}]");
            match (kind, self.color) {
                (Some(kind), true) => {
                    writeln!(self.writer, "{} {}", dim(&prefix), paint(kind, line))
                }
                (None, true) => writeln!(self.writer, "{} {line}", dim(&prefix)),
                (_, false) => writeln!(self.writer, "{prefix} {line}"),
            }
        };
        if let Err(e) = result.and_then(|()| self.writer.flush()) {
            warn!("failed to write to terminal: {e}");
        }
    }
}

fn dim(text: &str) -> StyledContent<&str> {
    style(text).with(Color::DarkGrey)
}

fn paint(kind: Style, line: &str) -> StyledContent<&str> {
    match kind {
        Style::Summary => style(line).with(Color::Green),
        Style::Failure => style(line).with(Color::Red).attribute(Attribute::Bold),
        Style::Notice => style(line).with(Color::Yellow),
    }
}

impl<W: Write> Output for TerminalOutput<W> {
    fn print(&mut self, conversation: &str, line: &str) {
        self.write_line(conversation, None, line);
    }

    fn print_styled(&mut self, conversation: &str, style: Style, line: &str) {
        self.write_line(conversation, Some(style), line);
    }
}
