//! Comment and string aware character classification
//!
//! QML mixes declarative structure with JavaScript expressions. The scanner and
//! the wrappers only care about three things: whether a character is code,
//! part of a comment, or part of a string literal. Everything structural is
//! decided on code characters only.

use std::iter::Peekable;
use std::str::CharIndices;

/// Lexical region a character belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Code,
    LineComment,
    BlockComment,
    /// String literal opened by the given quote character
    Str(char),
}

impl Region {
    pub fn is_comment(self) -> bool {
        matches!(self, Region::LineComment | Region::BlockComment)
    }
}

/// Iterator yielding `(byte_offset, char, region)` for every character
pub struct Lexer<'a> {
    chars: Peekable<CharIndices<'a>>,
    state: Region,
    /// Second character of a two-character token (`//`, `/*`, `*/`, escapes)
    pending: Option<Region>,
}

impl<'a> Lexer<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            chars: text.char_indices().peekable(),
            state: Region::Code,
            pending: None,
        }
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }
}

impl Iterator for Lexer<'_> {
    type Item = (usize, char, Region);

    fn next(&mut self) -> Option<Self::Item> {
        let (idx, ch) = self.chars.next()?;

        if let Some(region) = self.pending.take() {
            return Some((idx, ch, region));
        }

        let region = match self.state {
            Region::Code => match ch {
                '/' if self.peek_char() == Some('/') => {
                    self.state = Region::LineComment;
                    self.pending = Some(Region::LineComment);
                    Region::LineComment
                }
                '/' if self.peek_char() == Some('*') => {
                    self.state = Region::BlockComment;
                    self.pending = Some(Region::BlockComment);
                    Region::BlockComment
                }
                '"' | '\'' | '`' => {
                    self.state = Region::Str(ch);
                    Region::Str(ch)
                }
                _ => Region::Code,
            },
            Region::LineComment => {
                if ch == '\n' {
                    self.state = Region::Code;
                    Region::Code
                } else {
                    Region::LineComment
                }
            }
            Region::BlockComment => {
                if ch == '*' && self.peek_char() == Some('/') {
                    self.state = Region::Code;
                    self.pending = Some(Region::BlockComment);
                }
                Region::BlockComment
            }
            Region::Str(quote) => {
                if ch == '\\' {
                    self.pending = Some(Region::Str(quote));
                } else if ch == quote {
                    self.state = Region::Code;
                } else if ch == '\n' && quote != '`' {
                    // Unterminated single-line string; recover at end of line
                    self.state = Region::Code;
                    return Some((idx, ch, Region::Code));
                }
                Region::Str(quote)
            }
        };

        Some((idx, ch, region))
    }
}

/// Replace comment characters with spaces, keeping byte offsets and newlines
///
/// The result has the same length as `text`, so ranges found in the masked text
/// slice the original text directly.
pub fn mask_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for (_, ch, region) in Lexer::new(text) {
        if region.is_comment() && ch != '\n' {
            for _ in 0..ch.len_utf8() {
                out.push(' ');
            }
        } else {
            out.push(ch);
        }
    }
    out
}

/// Check that `{`/`}` outside comments and strings balance
pub fn braces_balanced(text: &str) -> bool {
    let mut depth: i64 = 0;
    for (_, ch, region) in Lexer::new(text) {
        if region != Region::Code {
            continue;
        }
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

/// Indent every line of `text` by `indent`, except lines that begin inside a
/// multi-line string literal or are blank
pub fn reindent(text: &str, indent: &str) -> String {
    let mut continues_string = vec![false];
    for (_, ch, region) in Lexer::new(text) {
        if ch == '\n' {
            continues_string.push(matches!(region, Region::Str(_)));
        }
    }

    let mut out = String::with_capacity(text.len() + indent.len() * continues_string.len());
    for (line, in_string) in text.split('\n').zip(continues_string) {
        if !in_string && !line.trim().is_empty() {
            out.push_str(indent);
        }
        if in_string {
            out.push_str(line);
        } else {
            out.push_str(line.trim_end());
        }
        out.push('\n');
    }
    out.pop();
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_line_and_block_comments() {
        let text = "a // b\n/* c\n d */ e";
        let masked = mask_comments(text);
        assert_eq!(masked.len(), text.len());
        assert_eq!(masked, "a     \n    \n      e");
    }

    #[test]
    fn test_comment_markers_inside_strings_are_code() {
        let text = r#"text: "http://example.com" // real"#;
        let masked = mask_comments(text);
        assert!(masked.contains("http://example.com"));
        assert!(!masked.contains("real"));
    }

    #[test]
    fn test_escaped_quote_does_not_close_string() {
        let regions: Vec<Region> = Lexer::new(r#""a\"b" c"#).map(|(_, _, r)| r).collect();
        assert_eq!(regions[4], Region::Str('"'));
        assert_eq!(regions[5], Region::Str('"'));
        assert_eq!(regions[7], Region::Code);
    }

    #[test]
    fn test_braces_balanced() {
        assert!(braces_balanced("Item { Rectangle { } }"));
        assert!(braces_balanced("Item { text: \"}\" }"));
        assert!(braces_balanced("Item { // }\n}"));
        assert!(!braces_balanced("Item { Rectangle { }"));
        assert!(!braces_balanced("} Item {"));
    }

    #[test]
    fn test_reindent_skips_template_literal_lines() {
        let text = "Text {\n    text: `one\ntwo`\n}";
        let indented = reindent(text, "  ");
        assert_eq!(indented, "  Text {\n      text: `one\ntwo`\n  }");
    }

    #[test]
    fn test_reindent_leaves_blank_lines_empty() {
        assert_eq!(reindent("a\n\nb", "    "), "    a\n\n    b");
    }
}
