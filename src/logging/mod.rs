//! Logging system for qmlview
//!
//! Provides file-based logging with retention and stderr output for warnings.

mod file_writer;
mod retention;

pub use file_writer::{init_file_logging, LogFileInfo, LoggingGuard};
pub use retention::{cleanup_old_logs, cleanup_old_logs_with_retention};
