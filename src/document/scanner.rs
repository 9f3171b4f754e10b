//! Structural inspection of QML sources
//!
//! Scanning is best-effort text inspection, not a QML parser. Comments are masked
//! before anything structural is looked at, so commented-out imports or elements
//! never count. String literals that happen to look like imports are an accepted
//! false positive.

use std::sync::LazyLock;

use regex::Regex;

use super::imports::ImportDeclaration;
use super::lexer::{braces_balanced, mask_comments, Lexer, Region};
use super::SourceDocument;
use crate::error::QmlError;

/// Element kinds that can be loaded standalone and host children
pub const CONTAINER_KINDS: &[&str] = &["Window", "ApplicationWindow"];

/// Module whose presence requires a widget-based application
pub const CHART_MODULE: &str = "QtCharts";

/// Controls style modules, checked in import order; first match wins
const STYLE_MODULES: &[(&str, &str)] = &[
    ("QtQuick.Controls.Basic", "Basic"),
    ("QtQuick.Controls.Fusion", "Fusion"),
    ("QtQuick.Controls.Imagine", "Imagine"),
    ("QtQuick.Controls.Material", "Material"),
    ("QtQuick.Controls.Universal", "Universal"),
    ("QtQuick.Controls.macOS", "macOS"),
    ("QtQuick.Controls.iOS", "iOS"),
    ("QtQuick.Controls.Windows", "Windows"),
    ("QtQuick.Controls.FluentWinUI3", "FluentWinUI3"),
];

/// `Type {` or `Qualifier.Type {` at the start of the element content
static ELEMENT_HEAD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)*)\s*\{")
        .expect("Invalid element head regex")
});

/// Facts derived from a document's text
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StructuralFacts {
    /// The first element is a container kind
    pub has_usable_root: bool,
    /// Controls style selected by an import
    pub style_name: Option<&'static str>,
    /// The document imports the charts module
    pub uses_chart_module: bool,
    /// Type name of the first element, as written
    pub root_type: Option<String>,
}

/// A document split into its header and element content
#[derive(Debug, Clone)]
pub struct Decomposed<'a> {
    /// `pragma` statements, in order
    pub pragmas: Vec<String>,
    /// `import` statements, in order
    pub imports: Vec<ImportDeclaration>,
    /// Element content, from the root type name to the end of the text
    pub content: &'a str,
    /// Root type name as written (may be qualified)
    pub root_type: String,
    /// Byte offset of the root element's `{` within `content`
    pub root_open: usize,
}

impl Decomposed<'_> {
    /// Root type without any module qualifier
    pub fn root_kind(&self) -> &str {
        unqualified(&self.root_type)
    }

    /// Whether an unqualified import of `module` already exists
    pub fn imports_unqualified(&self, module: &str) -> bool {
        self.imports.iter().any(|i| i.provides_unqualified(module))
    }
}

struct Header {
    pragmas: Vec<String>,
    imports: Vec<ImportDeclaration>,
    content_start: usize,
}

/// Derive structural facts from a document. Never fails.
pub fn scan(doc: &SourceDocument) -> StructuralFacts {
    let masked = mask_comments(doc.text());
    let header = parse_header(&masked);

    let root_type = ELEMENT_HEAD
        .captures(&masked[header.content_start..])
        .map(|caps| caps[1].to_string());
    let has_usable_root = root_type
        .as_deref()
        .is_some_and(|t| is_container(unqualified(t)));

    StructuralFacts {
        has_usable_root,
        style_name: detect_style(&header.imports),
        uses_chart_module: header
            .imports
            .iter()
            .any(|i| !i.is_path && i.module == CHART_MODULE),
        root_type,
    }
}

/// Split a document into header and element content
///
/// Fails with `MalformedSource` when no element follows the header or when the
/// element content has unbalanced braces.
pub fn decompose(doc: &SourceDocument) -> Result<Decomposed<'_>, QmlError> {
    let masked = mask_comments(doc.text());
    let header = parse_header(&masked);

    let masked_content = masked[header.content_start..].trim_end();
    if masked_content.is_empty() {
        return Err(QmlError::malformed(doc.path(), "no element content"));
    }
    let caps = ELEMENT_HEAD.captures(masked_content).ok_or_else(|| {
        QmlError::malformed(doc.path(), "content does not start with an element")
    })?;
    let root_type = caps[1].to_string();
    let root_open = caps.get(0).map_or(0, |m| m.end() - 1);

    // Trailing comments are whitespace in the masked text; keep them out of
    // the content so its end is the root's closing brace.
    let content = &doc.text()[header.content_start..header.content_start + masked_content.len()];
    if !braces_balanced(content) {
        return Err(QmlError::malformed(doc.path(), "unbalanced braces"));
    }
    if root_close(content).is_some_and(|close| close + 1 < content.len()) {
        return Err(QmlError::malformed(doc.path(), "text after the root element"));
    }

    Ok(Decomposed {
        pragmas: header.pragmas,
        imports: header.imports,
        content,
        root_type,
        root_open,
    })
}

/// Byte offset of the brace that closes the first element
fn root_close(content: &str) -> Option<usize> {
    let mut depth = 0u32;
    for (idx, ch, region) in Lexer::new(content) {
        if region != Region::Code {
            continue;
        }
        match ch {
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}

/// Whether `kind` (unqualified) is a standalone container
pub fn is_container(kind: &str) -> bool {
    CONTAINER_KINDS.contains(&kind)
}

fn parse_header(masked: &str) -> Header {
    let mut pragmas = Vec::new();
    let mut imports = Vec::new();
    let mut pos = 0;

    loop {
        let rest = &masked[pos..];
        let trimmed = rest.trim_start();
        let start = pos + (rest.len() - trimmed.len());

        let is_import = starts_with_keyword(trimmed, "import");
        if !is_import && !starts_with_keyword(trimmed, "pragma") {
            return Header {
                pragmas,
                imports,
                content_start: start,
            };
        }

        let end = trimmed.find(['\n', ';']).unwrap_or(trimmed.len());
        let statement = trimmed[..end].trim_end();
        if is_import {
            if let Some(import) = ImportDeclaration::parse(statement) {
                imports.push(import);
            }
        } else {
            pragmas.push(statement.to_string());
        }

        pos = start + end;
        if pos < masked.len() {
            pos += 1;
        }
    }
}

fn detect_style(imports: &[ImportDeclaration]) -> Option<&'static str> {
    imports.iter().filter(|i| !i.is_path).find_map(|import| {
        STYLE_MODULES
            .iter()
            .find(|(module, _)| *module == import.module)
            .map(|(_, style)| *style)
    })
}

fn starts_with_keyword(text: &str, keyword: &str) -> bool {
    text.strip_prefix(keyword)
        .is_some_and(|rest| rest.starts_with(char::is_whitespace))
}

fn unqualified(type_name: &str) -> &str {
    type_name.rsplit('.').next().unwrap_or(type_name)
}
