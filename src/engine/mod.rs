//! Rendering engine abstraction
//!
//! The previewer never renders QML itself. It hands documents to an engine that
//! reports the root objects it instantiated; an empty result means the document
//! failed to load.

pub mod process;

use std::io;

use crate::document::{Locator, StructuralFacts};
use crate::error::QmlError;

pub use process::{runtime_version, EngineOptions, ProcessEngine, SceneBackend, DEFAULT_SETTLE};

/// Handle to an instantiated top-level object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootObject {
    /// Engine-specific identifier (process id for the external runtime)
    pub id: u32,
}

/// Consumed rendering engine
pub trait RenderEngine {
    /// Load a document from a file locator
    fn load(&mut self, locator: &Locator) -> io::Result<Vec<RootObject>>;

    /// Load in-memory text; relative imports resolve against `base`
    fn load_data(&mut self, text: &str, base: &Locator) -> io::Result<Vec<RootObject>>;

    /// Replace the current document with `locator`
    ///
    /// `facts` describe the new document; engines that launch differently per
    /// document (style, application type) use them. When the new document fails
    /// to instantiate, the engine keeps showing the previous one and returns
    /// `EngineLoadFailed`.
    fn reload(&mut self, locator: &Locator, facts: &StructuralFacts) -> Result<(), QmlError>;

    /// Exit code once the engine has shut down (window closed)
    fn exit_code(&mut self) -> io::Result<Option<i32>>;
}

/// Map an empty root-object list to `EngineLoadFailed`
pub fn ensure_instantiated(
    objects: Vec<RootObject>,
    locator: &Locator,
) -> Result<Vec<RootObject>, QmlError> {
    if objects.is_empty() {
        Err(QmlError::EngineLoadFailed {
            locator: locator.to_url(),
        })
    } else {
        Ok(objects)
    }
}
