//! Live reload
//!
//! Regenerates the wrapped document whenever the source changes and keeps the
//! engine pointed at the newest generation.

pub mod side_file;
pub mod watcher;

pub use side_file::{is_side_file_name, side_file_name, sweep_stale};
pub use watcher::{
    Generation, PollOutcome, ReloadWatcher, WatchOptions, WatchPhase, WatchState,
    DEFAULT_MAX_CONSECUTIVE_FAILURES,
};
