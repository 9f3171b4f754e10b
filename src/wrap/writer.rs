//! Indentation-aware QML text builder

use crate::document::lexer::reindent;
use crate::document::Decomposed;

const INDENT: &str = "    ";

/// Builds QML text one line or block at a time
#[derive(Debug, Default)]
pub struct QmlWriter {
    buf: String,
    depth: usize,
}

impl QmlWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit pragmas and imports from the source, then any required module that
    /// is not already imported without a qualifier
    pub fn header(&mut self, parts: &Decomposed<'_>, required: &[&str]) {
        for pragma in &parts.pragmas {
            self.line(pragma);
        }
        for import in &parts.imports {
            self.line(&import.raw);
        }
        for module in required {
            if !parts.imports_unqualified(module) {
                self.line(&format!("import {}", module));
            }
        }
        self.blank();
    }

    pub fn line(&mut self, text: &str) {
        for _ in 0..self.depth {
            self.buf.push_str(INDENT);
        }
        self.buf.push_str(text);
        self.buf.push('\n');
    }

    pub fn blank(&mut self) {
        self.buf.push('\n');
    }

    /// `name: value`
    pub fn prop(&mut self, name: &str, value: impl std::fmt::Display) {
        self.line(&format!("{}: {}", name, value));
    }

    /// Open `Type {` and indent
    pub fn open(&mut self, type_name: &str) {
        self.line(&format!("{} {{", type_name));
        self.depth += 1;
    }

    /// Close the innermost element
    pub fn close(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        self.line("}");
    }

    /// Append a multi-line block at the current depth
    pub fn block(&mut self, text: &str) {
        let indent = INDENT.repeat(self.depth);
        self.buf.push_str(&reindent(text, &indent));
        self.buf.push('\n');
    }

    pub fn finish(self) -> String {
        self.buf
    }
}

/// Quote a value as a QML string literal
pub fn quoted(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            _ => out.push(ch),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_elements_indent() {
        let mut w = QmlWriter::new();
        w.open("Window");
        w.prop("width", 10);
        w.open("Item");
        w.block("Text {\n    text: \"hi\"\n}");
        w.close();
        w.close();

        assert_eq!(
            w.finish(),
            "Window {\n    width: 10\n    Item {\n        Text {\n            text: \"hi\"\n        }\n    }\n}\n"
        );
    }

    #[test]
    fn test_quoted_escapes() {
        assert_eq!(quoted(r"C:\ui\main.qml"), r#""C:\\ui\\main.qml""#);
        assert_eq!(quoted("say \"hi\""), r#""say \"hi\"""#);
    }
}
