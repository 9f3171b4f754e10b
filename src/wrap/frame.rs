//! Phone-shaped device frame around a document
//!
//! ```text
//! ┌──────────── width ────────────┐
//! │ bezel                         │
//! │  ┌─────── status bar ──────┐  │
//! │  ├─────────────────────────┤  │
//! │  │                         │  │
//! │  │         screen          │  │
//! │  │   (original content)    │  │
//! │  │                         │  │
//! │  ├─────────────────────────┤  │
//! │  │     home indicator      │  │
//! │  └─────────────────────────┘  │
//! └───────────────────────────────┘
//! ```

use super::parent::emit_host;
use super::writer::{quoted, QmlWriter};
use super::{REQUIRED_IMPORTS, SOURCE_PROPERTY};
use crate::document::lexer::{Lexer, Region};
use crate::document::{decompose, Decomposed, GeneratedDocument, Locator, SourceDocument, WrapKind};
use crate::error::QmlError;

/// Fixed device silhouette geometry, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceFrame {
    pub width: u32,
    pub height: u32,
    pub bezel: u32,
    pub corner_radius: u32,
    pub status_bar_height: u32,
    pub home_bar_height: u32,
    pub indicator_width: u32,
    pub indicator_height: u32,
}

/// The only device the previewer draws
pub const PHONE: DeviceFrame = DeviceFrame {
    width: 380,
    height: 780,
    bezel: 16,
    corner_radius: 44,
    status_bar_height: 28,
    home_bar_height: 28,
    indicator_width: 120,
    indicator_height: 5,
};

/// Axis-aligned rectangle relative to the device's top-left corner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl DeviceFrame {
    pub fn status_bar(&self) -> Rect {
        Rect {
            x: self.bezel,
            y: self.bezel,
            width: self.width - 2 * self.bezel,
            height: self.status_bar_height,
        }
    }

    /// Interior rectangle left for the content
    pub fn screen(&self) -> Rect {
        Rect {
            x: self.bezel,
            y: self.bezel + self.status_bar_height,
            width: self.width - 2 * self.bezel,
            height: self.height
                - 2 * self.bezel
                - self.status_bar_height
                - self.home_bar_height,
        }
    }

    pub fn home_bar(&self) -> Rect {
        Rect {
            x: self.bezel,
            y: self.height - self.bezel - self.home_bar_height,
            width: self.width - 2 * self.bezel,
            height: self.home_bar_height,
        }
    }

    /// Indicator pill, centered in the home bar
    pub fn home_indicator(&self) -> Rect {
        let bar = self.home_bar();
        Rect {
            x: bar.x + (bar.width - self.indicator_width) / 2,
            y: bar.y + (bar.height - self.indicator_height) / 2,
            width: self.indicator_width,
            height: self.indicator_height,
        }
    }
}

/// Window-only properties that visual items do not have
const WINDOW_ONLY: &[&str] = &[
    "visible",
    "x",
    "y",
    "width",
    "height",
    "minimumWidth",
    "minimumHeight",
    "maximumWidth",
    "maximumHeight",
    "flags",
    "visibility",
    "modality",
    "screen",
    "transientParent",
];

/// Replacement type for each container kind, plus extra properties to drop
const REHOST: &[(&str, &str, &[&str])] = &[
    ("ApplicationWindow", "Page", &["color", "menuBar"]),
    ("Window", "Rectangle", &["title"]),
];

/// Place a document inside the phone frame
///
/// Rootless content goes into a fill item. A document that already has a
/// window root is re-hosted: the root becomes a visual item that fills the
/// screen rectangle.
pub fn frame(doc: &SourceDocument, already_has_root: bool) -> Result<GeneratedDocument, QmlError> {
    let parts = decompose(doc)?;
    let device = PHONE;

    let mut w = QmlWriter::new();
    w.header(&parts, REQUIRED_IMPORTS);
    w.open("Window");
    w.prop("id", "qmlviewDevice");
    w.line(&format!(
        "property string {}: {}",
        SOURCE_PROPERTY,
        quoted(&doc.path().to_string_lossy())
    ));
    w.prop("width", device.width);
    w.prop("height", device.height);
    w.prop("minimumWidth", device.width);
    w.prop("minimumHeight", device.height);
    w.prop("maximumWidth", device.width);
    w.prop("maximumHeight", device.height);
    w.prop("visible", true);
    w.prop("title", quoted(&format!("{} - phone", doc.display_name())));
    w.prop("color", quoted("#202124"));
    w.blank();

    w.open("Rectangle");
    w.prop("id", "qmlviewBezel");
    w.prop("anchors.fill", "parent");
    w.prop("radius", device.corner_radius);
    w.prop("color", quoted("#111111"));
    w.blank();

    let status = device.status_bar();
    w.open("Rectangle");
    w.prop("id", "qmlviewStatusBar");
    geometry(&mut w, status);
    w.prop("color", quoted("#000000"));
    w.open("Text");
    w.prop("anchors.centerIn", "parent");
    w.prop("text", "Qt.formatTime(new Date(), \"hh:mm\")");
    w.prop("color", quoted("#ffffff"));
    w.prop("font.pixelSize", 12);
    w.close();
    w.close();
    w.blank();

    let screen = device.screen();
    w.open("Item");
    w.prop("id", "qmlviewScreen");
    geometry(&mut w, screen);
    w.prop("clip", true);
    w.blank();
    if already_has_root {
        w.block(&rehost_root(doc, &parts)?);
    } else {
        emit_host(&mut w, parts.content);
    }
    w.close();
    w.blank();

    let indicator = device.home_indicator();
    w.open("Rectangle");
    w.prop("id", "qmlviewHomeIndicator");
    geometry(&mut w, indicator);
    w.prop("radius", indicator.height as f32 / 2.0);
    w.prop("color", quoted("#dddddd"));
    w.close();

    w.close();
    w.close();

    Ok(GeneratedDocument {
        text: w.finish(),
        locator: Locator::directory(doc.directory()),
        kind: WrapKind::Frame,
        source: doc.path().to_path_buf(),
    })
}

fn geometry(w: &mut QmlWriter, rect: Rect) {
    w.prop("x", rect.x);
    w.prop("y", rect.y);
    w.prop("width", rect.width);
    w.prop("height", rect.height);
}

/// Turn a window root into a visual item that fills its parent
fn rehost_root(doc: &SourceDocument, parts: &Decomposed<'_>) -> Result<String, QmlError> {
    let kind = parts.root_kind();
    let (replacement, extra) = REHOST
        .iter()
        .find(|(from, _, _)| *from == kind)
        .map(|(_, to, extra)| (*to, *extra))
        .ok_or_else(|| QmlError::WrapFailed {
            path: doc.path().to_path_buf(),
            reason: format!("no visual replacement for root type {}", parts.root_type),
        })?;

    // Keep any module qualifier: `QQC.ApplicationWindow` becomes `QQC.Page`
    let qualifier_len = parts.root_type.len() - kind.len();
    let qualified = format!("{}{}", &parts.root_type[..qualifier_len], replacement);

    let body = strip_root_properties(&parts.content[parts.root_open + 1..], |name| {
        WINDOW_ONLY.contains(&name) || extra.contains(&name)
    });

    Ok(format!(
        "{} {{\n    anchors.fill: parent\n{}",
        qualified,
        body.trim_start_matches([' ', '\t']).trim_start_matches('\n')
    ))
}

/// Remove top-level property assignments of the root element
///
/// `body` is the root's text after its opening brace. A removed assignment
/// runs from its line start to the first newline back at root depth, so
/// multi-line values such as `menuBar: MenuBar { ... }` go with it.
fn strip_root_properties(body: &str, remove: impl Fn(&str) -> bool) -> String {
    let mut out = String::with_capacity(body.len());
    let mut depth = 0i32;
    let mut line_start = true;
    let mut skipping = false;

    let mut chars = Lexer::new(body);
    while let Some((idx, ch, region)) = chars.next() {
        if line_start && depth == 0 && !skipping {
            let line = &body[idx..];
            let trimmed = line.trim_start_matches([' ', '\t']);
            if let Some(name) = assigned_property(trimmed) {
                if remove(name) {
                    skipping = true;
                }
            }
        }
        line_start = false;

        if region == Region::Code {
            match ch {
                '{' => depth += 1,
                '}' => {
                    // The root's own closing brace is always kept
                    if depth == 0 {
                        skipping = false;
                    }
                    depth -= 1;
                }
                _ => {}
            }
        }

        if !skipping {
            out.push(ch);
        }

        let ends_statement = match ch {
            '\n' => !matches!(region, Region::Str(_)),
            ';' => region == Region::Code,
            _ => false,
        };
        if ends_statement && depth == 0 {
            line_start = true;
            skipping = false;
        } else if ch == '\n' && !matches!(region, Region::Str(_)) {
            line_start = true;
        }
    }
    out
}

/// Property name if the line is `name: value` (not `name.sub:` or `on...:`)
fn assigned_property(line: &str) -> Option<&str> {
    let end = line.find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))?;
    let name = &line[..end];
    if name.is_empty() {
        return None;
    }
    line[end..].trim_start().starts_with(':').then_some(name)
}
