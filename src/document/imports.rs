//! Import statement parsing

use std::fmt;

/// One `import` statement from a document header
///
/// Module imports look like `import QtQuick.Controls 2.15 as QQC`; directory and
/// script imports use a quoted path (`import "components"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportDeclaration {
    /// Dotted module name, or the unquoted path for directory/script imports
    pub module: String,
    /// Version if present (`2.15`)
    pub version: Option<String>,
    /// Namespace qualifier from `as X`
    pub qualifier: Option<String>,
    /// Whether the import target was a quoted path
    pub is_path: bool,
    /// The statement as written, without trailing comments or `;`
    pub raw: String,
}

impl ImportDeclaration {
    /// Parse a single statement starting with `import`
    ///
    /// Returns `None` when the statement has no target.
    pub fn parse(statement: &str) -> Option<Self> {
        let raw = statement.trim().trim_end_matches(';').trim_end();
        let rest = raw.strip_prefix("import")?;
        if !rest.starts_with(char::is_whitespace) {
            return None;
        }
        let rest = rest.trim_start();

        let (module, is_path, tail) = if let Some(quoted) = rest.strip_prefix('"') {
            let end = quoted.find('"')?;
            (quoted[..end].to_string(), true, &quoted[end + 1..])
        } else {
            let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
            (rest[..end].to_string(), false, &rest[end..])
        };
        if module.is_empty() {
            return None;
        }

        let mut version = None;
        let mut qualifier = None;
        let mut tokens = tail.split_whitespace().peekable();
        while let Some(token) = tokens.next() {
            if token == "as" {
                qualifier = tokens.next().map(str::to_string);
            } else if version.is_none() && is_version(token) {
                version = Some(token.to_string());
            }
        }

        Some(Self {
            module,
            version,
            qualifier,
            is_path,
            raw: raw.to_string(),
        })
    }

    /// An unqualified module import of exactly `module`
    pub fn provides_unqualified(&self, module: &str) -> bool {
        !self.is_path && self.qualifier.is_none() && self.module == module
    }
}

impl fmt::Display for ImportDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn is_version(token: &str) -> bool {
    !token.is_empty()
        && token.chars().all(|c| c.is_ascii_digit() || c == '.')
        && token.starts_with(|c: char| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_module() {
        let import = ImportDeclaration::parse("import QtQuick").unwrap();
        assert_eq!(import.module, "QtQuick");
        assert_eq!(import.version, None);
        assert_eq!(import.qualifier, None);
        assert!(!import.is_path);
        assert_eq!(import.raw, "import QtQuick");
    }

    #[test]
    fn test_parse_versioned_qualified_module() {
        let import = ImportDeclaration::parse("import QtQuick.Controls 2.15 as QQC2;").unwrap();
        assert_eq!(import.module, "QtQuick.Controls");
        assert_eq!(import.version.as_deref(), Some("2.15"));
        assert_eq!(import.qualifier.as_deref(), Some("QQC2"));
        assert_eq!(import.raw, "import QtQuick.Controls 2.15 as QQC2");
    }

    #[test]
    fn test_parse_path_import() {
        let import = ImportDeclaration::parse(r#"import "components" as Ui"#).unwrap();
        assert_eq!(import.module, "components");
        assert!(import.is_path);
        assert_eq!(import.qualifier.as_deref(), Some("Ui"));
    }

    #[test]
    fn test_parse_rejects_non_imports() {
        assert!(ImportDeclaration::parse("imports QtQuick").is_none());
        assert!(ImportDeclaration::parse("import").is_none());
        assert!(ImportDeclaration::parse("pragma Singleton").is_none());
    }

    #[test]
    fn test_provides_unqualified() {
        let plain = ImportDeclaration::parse("import QtQuick 2.15").unwrap();
        let qualified = ImportDeclaration::parse("import QtQuick as Q").unwrap();
        assert!(plain.provides_unqualified("QtQuick"));
        assert!(!qualified.provides_unqualified("QtQuick"));
        assert!(!plain.provides_unqualified("QtQuick.Window"));
    }
}
