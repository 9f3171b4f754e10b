//! QML documents: authored sources and generated, loadable text
//!
//! A `SourceDocument` is an immutable snapshot of a file on disk. Wrappers turn it
//! into a `GeneratedDocument` whose locator points at the source's directory so
//! that relative imports inside the original content keep resolving.

pub mod imports;
pub mod lexer;
pub mod scanner;

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::QmlError;

pub use imports::ImportDeclaration;
pub use scanner::{decompose, scan, Decomposed, StructuralFacts};

/// Snapshot of an authored QML file
#[derive(Debug, Clone)]
pub struct SourceDocument {
    path: PathBuf,
    text: String,
    modified: SystemTime,
}

impl SourceDocument {
    /// Read a document from disk, resolving the path to an absolute one
    pub fn read(path: &Path) -> Result<Self, QmlError> {
        let path = absolute(path)?;
        let metadata = std::fs::metadata(&path).map_err(|e| not_found_or_io(&path, e))?;
        let text = std::fs::read_to_string(&path).map_err(|e| not_found_or_io(&path, e))?;
        let modified = metadata.modified()?;
        Ok(Self {
            path,
            text,
            modified,
        })
    }

    /// Build a document from in-memory text
    pub fn from_text(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
            modified: SystemTime::UNIX_EPOCH,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn modified(&self) -> SystemTime {
        self.modified
    }

    /// Directory containing the source
    pub fn directory(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("/"))
    }

    /// File name for window titles
    pub fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// Locator of the file itself
    pub fn locator(&self) -> Locator {
        Locator::file(&self.path)
    }
}

/// URL-like location handed to the rendering engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    path: PathBuf,
    is_dir: bool,
}

impl Locator {
    /// Locator of a concrete file
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            is_dir: false,
        }
    }

    /// Base-directory locator used for in-memory documents
    pub fn directory(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            is_dir: true,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_dir(&self) -> bool {
        self.is_dir
    }

    /// Directory that relative imports resolve against
    pub fn base_dir(&self) -> &Path {
        if self.is_dir {
            &self.path
        } else {
            self.path.parent().unwrap_or_else(|| Path::new("/"))
        }
    }

    /// `file://` URL form, with a trailing slash for directories
    pub fn to_url(&self) -> String {
        let mut path = self.path.to_string_lossy().replace('\\', "/");
        if !path.starts_with('/') {
            path.insert(0, '/');
        }
        if self.is_dir && !path.ends_with('/') {
            path.push('/');
        }
        format!("file://{}", path)
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_url())
    }
}

/// How a generated document was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapKind {
    /// Synthetic window around rootless content
    Parent,
    /// Phone device silhouette
    Frame,
}

/// Synthesized document text plus the locator it should be loaded under
#[derive(Debug, Clone)]
pub struct GeneratedDocument {
    pub text: String,
    pub locator: Locator,
    pub kind: WrapKind,
    /// Path of the source this was derived from
    pub source: PathBuf,
}

fn absolute(path: &Path) -> Result<PathBuf, QmlError> {
    match std::fs::canonicalize(path) {
        Ok(p) => Ok(p),
        Err(e) => Err(not_found_or_io(path, e)),
    }
}

fn not_found_or_io(path: &Path, e: std::io::Error) -> QmlError {
    if e.kind() == std::io::ErrorKind::NotFound {
        QmlError::SourceNotFound {
            path: path.to_path_buf(),
        }
    } else {
        QmlError::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let err = SourceDocument::read(&temp_dir.path().join("nope.qml")).unwrap_err();
        assert!(matches!(err, QmlError::SourceNotFound { .. }));
    }

    #[test]
    fn test_read_resolves_absolute_path() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("main.qml");
        std::fs::write(&file, "import QtQuick\nItem {}").unwrap();

        let doc = SourceDocument::read(&file).unwrap();
        assert!(doc.path().is_absolute());
        assert_eq!(doc.text(), "import QtQuick\nItem {}");
        assert_eq!(doc.display_name(), "main.qml");
        assert_eq!(
            doc.directory(),
            std::fs::canonicalize(temp_dir.path()).unwrap()
        );
    }

    #[test]
    fn test_locator_urls() {
        assert_eq!(
            Locator::directory("/home/me/ui").to_url(),
            "file:///home/me/ui/"
        );
        assert_eq!(
            Locator::file("/home/me/ui/main.qml").to_url(),
            "file:///home/me/ui/main.qml"
        );
    }

    #[test]
    fn test_locator_base_dir() {
        let file = Locator::file("/a/b/c.qml");
        let dir = Locator::directory("/a/b");
        assert_eq!(file.base_dir(), Path::new("/a/b"));
        assert_eq!(dir.base_dir(), Path::new("/a/b"));
    }
}
