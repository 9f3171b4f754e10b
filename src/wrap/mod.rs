//! Turning authored QML into documents the engine can load standalone
//!
//! `decide_and_wrap` is the only entry point the orchestrator needs: it looks at
//! the scanned facts and the requested layout and either passes the source
//! through or produces a generated document.

pub mod frame;
pub mod parent;
pub mod writer;

use crate::document::{scan, GeneratedDocument, Locator, SourceDocument, StructuralFacts};
use crate::error::QmlError;

pub use frame::{DeviceFrame, PHONE};

/// Root property holding the authored file's path
pub const SOURCE_PROPERTY: &str = "filename";

/// Id of the fill item that hosts rootless content
pub const HOST_ID: &str = "qmlviewHost";

/// Modules every generated document needs
pub const REQUIRED_IMPORTS: &[&str] = &["QtQuick"];

/// Options for synthesized windows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WrapOptions {
    pub window_width: u32,
    pub window_height: u32,
}

impl Default for WrapOptions {
    fn default() -> Self {
        Self {
            window_width: 640,
            window_height: 480,
        }
    }
}

/// How the document should be presented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Layout {
    /// As-is, wrapped only when it has no usable root
    #[default]
    Plain,
    /// Inside the phone device frame
    Phone,
}

/// A document ready to hand to the engine
#[derive(Debug, Clone)]
pub enum Loadable {
    /// The source needs no rewriting
    Source(SourceDocument),
    /// A synthesized document
    Generated(GeneratedDocument),
}

impl Loadable {
    /// Text to load
    pub fn text(&self) -> &str {
        match self {
            Loadable::Source(doc) => doc.text(),
            Loadable::Generated(generated) => &generated.text,
        }
    }

    /// Locator to load under
    pub fn locator(&self) -> Locator {
        match self {
            Loadable::Source(doc) => doc.locator(),
            Loadable::Generated(generated) => generated.locator.clone(),
        }
    }

    pub fn is_generated(&self) -> bool {
        matches!(self, Loadable::Generated(_))
    }
}

/// Pick the wrapper for a document, or pass it through
///
/// Wrapped output is re-scanned; a generated document without a usable root
/// means a wrapper broke its contract and is reported as `WrapFailed`.
pub fn decide_and_wrap(
    doc: SourceDocument,
    facts: &StructuralFacts,
    layout: Layout,
    options: &WrapOptions,
) -> Result<Loadable, QmlError> {
    let generated = match layout {
        Layout::Plain if facts.has_usable_root => return Ok(Loadable::Source(doc)),
        Layout::Plain => parent::wrap(&doc, options)?,
        Layout::Phone => frame::frame(&doc, facts.has_usable_root)?,
    };

    let rescanned = SourceDocument::from_text(doc.path(), generated.text.as_str());
    if !scan(&rescanned).has_usable_root {
        return Err(QmlError::WrapFailed {
            path: doc.path().to_path_buf(),
            reason: "generated document has no usable root".to_string(),
        });
    }

    tracing::debug!(
        source = %doc.path().display(),
        kind = ?generated.kind,
        bytes = generated.text.len(),
        "Wrapped document"
    );
    Ok(Loadable::Generated(generated))
}
