//! Error types for source transformation and live reload

use std::path::PathBuf;

use thiserror::Error;

/// Exit code used when the engine could not instantiate a root object
pub const EXIT_ENGINE_LOAD_FAILED: i32 = 1;
/// Exit code used when the source file does not exist
pub const EXIT_SOURCE_NOT_FOUND: i32 = 2;
/// Exit code used when the command line is invalid
pub const EXIT_INVALID_PARAMETER: i32 = 3;
/// Exit code used when the source cannot be decomposed into header and content
pub const EXIT_MALFORMED_SOURCE: i32 = 4;
/// Exit code used when a wrapper produced a document without a usable root
pub const EXIT_WRAP_FAILED: i32 = 5;

/// Errors raised while scanning, wrapping, loading or watching a QML document
#[derive(Debug, Error)]
pub enum QmlError {
    /// The source path does not exist
    #[error("file not found: {path}")]
    SourceNotFound { path: PathBuf },

    /// The text does not split into an import block followed by element content
    #[error("malformed source {path}: {reason}")]
    MalformedSource { path: PathBuf, reason: String },

    /// A wrapper was asked to do something its contract does not allow
    #[error("cannot wrap {path}: {reason}")]
    WrapFailed { path: PathBuf, reason: String },

    /// The rendering engine returned no root objects
    #[error("qml root object could not be created from {locator}")]
    EngineLoadFailed { locator: String },

    /// Writing or removing a generated side file failed
    #[error("side file {path}: {source}")]
    SideFileIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Any other I/O failure
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl QmlError {
    /// Build a `MalformedSource` error
    pub fn malformed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        QmlError::MalformedSource {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Whether retrying on the next poll tick may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, QmlError::SideFileIo { .. } | QmlError::Io(_))
    }

    /// Process exit code for this error when it is fatal
    pub fn exit_code(&self) -> i32 {
        match self {
            QmlError::SourceNotFound { .. } => EXIT_SOURCE_NOT_FOUND,
            QmlError::MalformedSource { .. } => EXIT_MALFORMED_SOURCE,
            QmlError::WrapFailed { .. } => EXIT_WRAP_FAILED,
            QmlError::EngineLoadFailed { .. } => EXIT_ENGINE_LOAD_FAILED,
            QmlError::SideFileIo { .. } | QmlError::Io(_) => 1,
        }
    }
}
