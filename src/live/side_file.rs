//! Generated side files: naming and stale-file sweeping
//!
//! Side files are disposable copies written next to the source so the engine
//! can load them with the source's relative imports intact. They are named
//! `Live<counter>_<token>.qml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::Result;
use regex::Regex;

static SIDE_FILE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Live\d+_[0-9a-f]{8}\.qml$").expect("Invalid side file regex"));

/// Name for generation `counter` with a fresh random token
pub fn side_file_name(counter: u64) -> String {
    let token = uuid::Uuid::new_v4().simple().to_string();
    format!("Live{}_{}.qml", counter, &token[..8])
}

/// Whether a file name follows the side-file pattern
pub fn is_side_file_name(name: &str) -> bool {
    SIDE_FILE_NAME.is_match(name)
}

/// Path of generation `counter` inside `dir`
pub fn side_file_path(dir: &Path, counter: u64) -> PathBuf {
    dir.join(side_file_name(counter))
}

/// Delete every side file in `dir` except those in `keep`
///
/// Returns the number of files deleted.
pub fn sweep_stale(dir: &Path, keep: &[PathBuf]) -> Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }

    let mut deleted_count = 0;

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        // Only process side files
        match path.file_name().and_then(|n| n.to_str()) {
            Some(name) if is_side_file_name(name) => {}
            _ => continue,
        }
        if keep.contains(&path) {
            continue;
        }

        if fs::remove_file(&path).is_ok() {
            deleted_count += 1;
        }
    }

    Ok(deleted_count)
}
