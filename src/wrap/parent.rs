//! Synthetic window around content that cannot be loaded standalone

use super::writer::{quoted, QmlWriter};
use super::{WrapOptions, HOST_ID, REQUIRED_IMPORTS, SOURCE_PROPERTY};
use crate::document::{decompose, GeneratedDocument, Locator, SourceDocument, WrapKind};
use crate::error::QmlError;

/// Wrap a document's element content in a `Window` root
///
/// The caller decides whether wrapping is needed; this does not look at
/// whether the document already has a usable root.
pub fn wrap(doc: &SourceDocument, options: &WrapOptions) -> Result<GeneratedDocument, QmlError> {
    let parts = decompose(doc)?;

    let mut w = QmlWriter::new();
    w.header(&parts, REQUIRED_IMPORTS);
    w.open("Window");
    w.prop("id", "qmlviewWindow");
    w.line(&format!(
        "property string {}: {}",
        SOURCE_PROPERTY,
        quoted(&doc.path().to_string_lossy())
    ));
    w.prop("width", options.window_width);
    w.prop("height", options.window_height);
    w.prop("visible", true);
    w.prop("title", quoted(&doc.display_name()));
    w.blank();
    emit_host(&mut w, parts.content);
    w.close();

    Ok(GeneratedDocument {
        text: w.finish(),
        locator: Locator::directory(doc.directory()),
        kind: WrapKind::Parent,
        source: doc.path().to_path_buf(),
    })
}

/// Fill item that carries the original content
pub(crate) fn emit_host(w: &mut QmlWriter, content: &str) {
    w.open("Item");
    w.prop("id", HOST_ID);
    w.prop("anchors.fill", "parent");
    w.blank();
    w.block(content);
    w.close();
}
