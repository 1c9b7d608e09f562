//! Indentation-aware text sink for generated source.

use std::fmt::Write;

const INDENT: &str = "  ";

/// Buffered writer producing the final artifact text.
///
/// Output is a pure function of the write calls; no timestamps, no
/// environment, so repeated runs emit byte-identical artifacts.
#[derive(Debug, Default)]
pub struct CodeWriter {
    buffer: String,
    depth: usize,
}

impl CodeWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Write one line at the current indentation.
    pub fn line(&mut self, text: impl AsRef<str>) {
        for _ in 0..self.depth {
            self.buffer.push_str(INDENT);
        }
        self.buffer.push_str(text.as_ref());
        self.buffer.push('\n');
    }

    /// Write an empty line.
    pub fn blank(&mut self) {
        self.buffer.push('\n');
    }

    /// Write `header` and indent subsequent lines.
    pub fn open(&mut self, header: impl AsRef<str>) {
        self.line(header);
        self.depth += 1;
    }

    /// Dedent and write `footer`.
    pub fn close(&mut self, footer: impl AsRef<str>) {
        self.depth = self.depth.saturating_sub(1);
        self.line(footer);
    }

    /// Write a formatted line.
    pub fn linef(&mut self, args: std::fmt::Arguments<'_>) {
        let mut text = String::new();
        let _ = text.write_fmt(args);
        self.line(text);
    }

    #[must_use]
    pub fn finish(self) -> String {
        self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nesting_indents_by_two_spaces() {
        let mut writer = CodeWriter::new();
        writer.open("class Example {");
        writer.line("let value = 1");
        writer.open("func run() {");
        writer.line("value");
        writer.close("}");
        writer.close("}");

        assert_eq!(
            writer.finish(),
            "class Example {\n  let value = 1\n  func run() {\n    value\n  }\n}\n"
        );
    }

    #[test]
    fn close_below_zero_does_not_underflow() {
        let mut writer = CodeWriter::new();
        writer.close("}");
        assert_eq!(writer.finish(), "}\n");
    }
}
