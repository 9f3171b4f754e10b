//! qmlview - preview QML files standalone, in a phone frame, or with live reload
//!
//! This library provides the source transformations and the reload loop behind
//! the `qmlview` binary.

pub mod app;
pub mod cli;
pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod live;
pub mod logging;
pub mod wrap;
