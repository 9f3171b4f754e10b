//! Polling reload watcher
//!
//! State machine: `Idle → Watching → Regenerating → Watching → … → Closed`.
//! Each `poll` is one synchronous step: stat the source, and if its modification
//! time moved, re-scan, re-wrap, write a new side file, ask the engine to reload
//! it and delete the previous generation. Cleanup runs from `Drop`, so side files
//! are removed on every exit path that unwinds.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::{debug, error, info, warn};

use super::side_file::{side_file_path, sweep_stale};
use crate::document::{scan, Locator, SourceDocument, StructuralFacts};
use crate::engine::RenderEngine;
use crate::error::QmlError;
use crate::wrap::{decide_and_wrap, Layout, WrapOptions};

/// Default number of consecutive transient failures before warning
pub const DEFAULT_MAX_CONSECUTIVE_FAILURES: u32 = 3;

/// Watcher configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchOptions {
    pub layout: Layout,
    pub wrap: WrapOptions,
    pub max_consecutive_failures: u32,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            layout: Layout::Plain,
            wrap: WrapOptions::default(),
            max_consecutive_failures: DEFAULT_MAX_CONSECUTIVE_FAILURES,
        }
    }
}

/// Lifecycle phase of a watcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchPhase {
    Idle,
    Watching,
    Regenerating,
    Closed,
}

/// Process-lifetime watch bookkeeping
#[derive(Debug)]
pub struct WatchState {
    /// Absolute path of the authored source
    pub target: PathBuf,
    /// Directory side files are written to (the source's directory)
    pub working_dir: PathBuf,
    /// Outstanding side files; the last one is current
    generations: Vec<PathBuf>,
    counter: u64,
    last_modified: Option<SystemTime>,
    consecutive_failures: u32,
    /// Times the failure count reached the warning threshold
    escalations: u32,
    phase: WatchPhase,
}

impl WatchState {
    fn new(target: PathBuf) -> Self {
        let working_dir = target
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            target,
            working_dir,
            generations: Vec::new(),
            counter: 0,
            last_modified: None,
            consecutive_failures: 0,
            escalations: 0,
            phase: WatchPhase::Idle,
        }
    }

    pub fn phase(&self) -> WatchPhase {
        self.phase
    }

    pub fn is_closed(&self) -> bool {
        self.phase == WatchPhase::Closed
    }

    /// Side file the engine is currently showing
    pub fn current(&self) -> Option<&Path> {
        self.generations.last().map(PathBuf::as_path)
    }

    /// Every side file this watcher still owns
    pub fn generations(&self) -> &[PathBuf] {
        &self.generations
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn escalations(&self) -> u32 {
        self.escalations
    }

    pub fn last_modified(&self) -> Option<SystemTime> {
        self.last_modified
    }
}

/// A side file written but not yet current
#[derive(Debug)]
pub struct Generation {
    pub path: PathBuf,
    /// Source modification time the side file was generated from
    pub modified: SystemTime,
    pub facts: StructuralFacts,
}

impl Generation {
    pub fn locator(&self) -> Locator {
        Locator::file(&self.path)
    }
}

/// Result of one poll step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Source unchanged since the last generation
    Unchanged,
    /// A new side file is current
    Reloaded(PathBuf),
    /// Transient failure; the step is retried on the next tick
    Retrying,
    /// The changed source is malformed or the engine refused it; the previous
    /// generation stays current
    Rejected,
}

/// Watches one source file and keeps a single current side file
#[derive(Debug)]
pub struct ReloadWatcher {
    state: WatchState,
    options: WatchOptions,
}

impl ReloadWatcher {
    /// Begin watching `path`
    ///
    /// Sweeps side files left behind by earlier runs and records the source's
    /// current modification time.
    pub fn start(path: &Path, options: WatchOptions) -> Result<Self, QmlError> {
        let target = fs::canonicalize(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => QmlError::SourceNotFound {
                path: path.to_path_buf(),
            },
            _ => QmlError::Io(e),
        })?;
        let mut state = WatchState::new(target);

        let keep = [state.target.clone()];
        match sweep_stale(&state.working_dir, &keep) {
            Ok(0) => {}
            Ok(count) => info!("Removed {} stale side files", count),
            Err(e) => warn!("Failed to sweep stale side files: {:#}", e),
        }

        state.last_modified = Some(fs::metadata(&state.target)?.modified()?);
        state.phase = WatchPhase::Watching;
        info!(source = %state.target.display(), "Watching for changes");

        Ok(Self { state, options })
    }

    /// Stop watching and delete every side file
    pub fn stop(mut self) {
        self.close();
    }

    pub fn state(&self) -> &WatchState {
        &self.state
    }

    pub fn options(&self) -> &WatchOptions {
        &self.options
    }

    /// Scan, wrap and write a side file for the source as it is now
    ///
    /// The new file is not current until passed to `commit`.
    pub fn generate(&mut self) -> Result<Generation, QmlError> {
        let doc = SourceDocument::read(&self.state.target)?;
        let facts = scan(&doc);
        let modified = doc.modified();
        let loadable = decide_and_wrap(doc, &facts, self.options.layout, &self.options.wrap)?;

        self.state.counter += 1;
        let path = side_file_path(&self.state.working_dir, self.state.counter);
        if let Err(source) = fs::write(&path, loadable.text()) {
            discard(&path);
            return Err(QmlError::SideFileIo { path, source });
        }
        debug!(path = %path.display(), "Wrote side file");

        Ok(Generation {
            path,
            modified,
            facts,
        })
    }

    /// Make `generation` current and delete every older side file
    pub fn commit(&mut self, generation: Generation) {
        let previous = std::mem::take(&mut self.state.generations);
        for old in previous {
            match fs::remove_file(&old) {
                Ok(()) => debug!(path = %old.display(), "Removed previous side file"),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    // Retried on close
                    warn!("Failed to remove side file {}: {}", old.display(), e);
                    self.state.generations.push(old);
                }
            }
        }
        self.state.generations.push(generation.path);
        self.state.last_modified = Some(generation.modified);
        self.state.consecutive_failures = 0;
    }

    /// One watch step
    pub fn poll<E: RenderEngine>(&mut self, engine: &mut E) -> PollOutcome {
        if self.state.phase != WatchPhase::Watching {
            return PollOutcome::Unchanged;
        }

        let modified = match fs::metadata(&self.state.target).and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(e) => {
                self.note_failure("read source metadata", &e);
                return PollOutcome::Retrying;
            }
        };
        if self.state.last_modified == Some(modified) {
            return PollOutcome::Unchanged;
        }

        self.state.phase = WatchPhase::Regenerating;
        let outcome = self.regenerate(engine, modified);
        self.state.phase = WatchPhase::Watching;
        outcome
    }

    fn regenerate<E: RenderEngine>(&mut self, engine: &mut E, modified: SystemTime) -> PollOutcome {
        let generation = match self.generate() {
            Ok(generation) => generation,
            Err(e) if e.is_transient() || matches!(e, QmlError::SourceNotFound { .. }) => {
                self.note_failure("regenerate", &e);
                return PollOutcome::Retrying;
            }
            Err(e) => return self.reject(modified, &e),
        };

        match engine.reload(&generation.locator(), &generation.facts) {
            Ok(()) => {}
            Err(e) if e.is_transient() => {
                discard(&generation.path);
                self.note_failure("reload engine", &e);
                return PollOutcome::Retrying;
            }
            Err(e) => {
                discard(&generation.path);
                return self.reject(modified, &e);
            }
        }

        let path = generation.path.clone();
        self.commit(generation);
        info!(path = %path.display(), "Reloaded");
        PollOutcome::Reloaded(path)
    }

    /// Keep the previous generation current and wait for the next edit
    fn reject(&mut self, modified: SystemTime, err: &QmlError) -> PollOutcome {
        error!("Keeping previous document: {}", err);
        // Same content would fail again
        self.state.last_modified = Some(modified);
        self.state.consecutive_failures = 0;
        PollOutcome::Rejected
    }

    fn note_failure(&mut self, action: &str, err: &dyn std::fmt::Display) {
        self.state.consecutive_failures += 1;
        let failures = self.state.consecutive_failures;
        if failures == self.options.max_consecutive_failures {
            self.state.escalations += 1;
            warn!("Failed to {} {} times in a row: {}", action, failures, err);
        } else {
            debug!(failures, "Failed to {}: {}", action, err);
        }
    }

    /// Delete owned side files and any leftovers in the working directory
    ///
    /// Idempotent.
    pub fn close(&mut self) {
        if self.state.phase == WatchPhase::Closed {
            return;
        }

        for path in self.state.generations.drain(..) {
            discard(&path);
        }
        let keep = [self.state.target.clone()];
        if let Err(e) = sweep_stale(&self.state.working_dir, &keep) {
            warn!("Failed to sweep side files: {:#}", e);
        }
        self.state.phase = WatchPhase::Closed;
        info!(source = %self.state.target.display(), "Stopped watching");
    }
}

impl Drop for ReloadWatcher {
    fn drop(&mut self) {
        self.close();
    }
}

fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != io::ErrorKind::NotFound {
            warn!("Failed to remove side file {}: {}", path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::RecordingEngine;
    use crate::live::side_file::is_side_file_name;
    use std::time::Duration;
    use tempfile::TempDir;

    const ROOTLESS: &str = "import QtQuick\nRectangle { width: 10 }";

    /// Write `text` and force a distinct modification time
    fn edit(path: &Path, text: &str, step: u64) {
        fs::write(path, text).unwrap();
        let when = SystemTime::now() + Duration::from_secs(10 * step);
        fs::File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(when)
            .unwrap();
    }

    /// Names of side files present in `dir`
    fn side_files(dir: &Path) -> Vec<String> {
        fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| is_side_file_name(name))
            .collect()
    }

    fn name(path: &Path) -> String {
        path.file_name().unwrap().to_string_lossy().into_owned()
    }

    fn setup(text: &str) -> (TempDir, PathBuf, ReloadWatcher) {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("main.qml");
        fs::write(&source, text).unwrap();
        let mut watcher = ReloadWatcher::start(&source, WatchOptions::default()).unwrap();
        let generation = watcher.generate().unwrap();
        watcher.commit(generation);
        (temp_dir, source, watcher)
    }

    #[test]
    fn test_start_missing_source() {
        let temp_dir = TempDir::new().unwrap();
        let err = ReloadWatcher::start(&temp_dir.path().join("gone.qml"), WatchOptions::default())
            .unwrap_err();
        assert!(matches!(err, QmlError::SourceNotFound { .. }));
    }

    #[test]
    fn test_start_sweeps_leftovers_from_previous_run() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("main.qml");
        fs::write(&source, ROOTLESS).unwrap();
        fs::write(temp_dir.path().join("Live9_0123abcd.qml"), "stale").unwrap();

        let watcher = ReloadWatcher::start(&source, WatchOptions::default()).unwrap();
        assert_eq!(watcher.state().phase(), WatchPhase::Watching);
        assert!(watcher.state().last_modified().is_some());
        assert!(side_files(temp_dir.path()).is_empty());
        assert!(source.exists());
    }

    #[test]
    fn test_initial_generation_is_wrapped() {
        let (temp_dir, _source, watcher) = setup(ROOTLESS);
        let files = side_files(temp_dir.path());
        assert_eq!(files.len(), 1);
        let current = watcher.state().current().unwrap();
        assert_eq!(name(current), files[0]);

        let text = fs::read_to_string(current).unwrap();
        assert!(text.starts_with("import QtQuick\n"));
        assert!(text.contains("Window {"));
        assert!(text.contains("Rectangle { width: 10 }"));
    }

    #[test]
    fn test_unchanged_source_does_nothing() {
        let (_temp_dir, _source, mut watcher) = setup(ROOTLESS);
        let mut engine = RecordingEngine::new();
        assert_eq!(watcher.poll(&mut engine), PollOutcome::Unchanged);
        assert!(engine.reloads.is_empty());
    }

    #[test]
    fn test_each_change_leaves_exactly_one_side_file() {
        let (temp_dir, source, mut watcher) = setup(ROOTLESS);
        let mut engine = RecordingEngine::new();

        for step in 1..=5 {
            edit(
                &source,
                &format!("import QtQuick\nRectangle {{ width: {} }}", step * 100),
                step,
            );
            let path = match watcher.poll(&mut engine) {
                PollOutcome::Reloaded(path) => path,
                other => panic!("expected reload, got {other:?}"),
            };

            assert_eq!(side_files(temp_dir.path()), vec![name(&path)]);
            assert_eq!(watcher.state().current(), Some(path.as_path()));
            assert_eq!(watcher.state().generations().len(), 1);
        }

        assert_eq!(engine.reloads.len(), 5);
        assert!(engine.reloaded_text[4].contains("width: 500"));
    }

    #[test]
    fn test_malformed_change_keeps_previous_generation() {
        let (temp_dir, source, mut watcher) = setup(ROOTLESS);
        let mut engine = RecordingEngine::new();
        let before = watcher.state().current().unwrap().to_path_buf();

        edit(&source, "import QtQuick\nRectangle {", 1);
        assert_eq!(watcher.poll(&mut engine), PollOutcome::Rejected);
        assert_eq!(watcher.state().phase(), WatchPhase::Watching);
        assert_eq!(watcher.state().current(), Some(before.as_path()));
        assert_eq!(side_files(temp_dir.path()), vec![name(&before)]);
        assert!(engine.reloads.is_empty());

        // Same bad content is not retried every tick
        assert_eq!(watcher.poll(&mut engine), PollOutcome::Unchanged);

        edit(&source, ROOTLESS, 2);
        assert!(matches!(watcher.poll(&mut engine), PollOutcome::Reloaded(_)));
        assert!(!before.exists());
    }

    #[test]
    fn test_missing_source_is_retried() {
        let (_temp_dir, source, mut watcher) = setup(ROOTLESS);
        let mut engine = RecordingEngine::new();

        fs::remove_file(&source).unwrap();
        for expected in 1..=4 {
            assert_eq!(watcher.poll(&mut engine), PollOutcome::Retrying);
            assert_eq!(watcher.state().consecutive_failures(), expected);
        }
        assert!(watcher.state().current().unwrap().exists());

        edit(&source, ROOTLESS, 1);
        assert!(matches!(watcher.poll(&mut engine), PollOutcome::Reloaded(_)));
        assert_eq!(watcher.state().consecutive_failures(), 0);
    }

    #[test]
    fn test_engine_failure_discards_new_side_file() {
        let (temp_dir, source, mut watcher) = setup(ROOTLESS);
        let mut engine = RecordingEngine::new();
        let before = watcher.state().current().unwrap().to_path_buf();

        edit(&source, "import QtQuick\nItem {}", 1);
        engine.fail_next_reload = true;
        assert_eq!(watcher.poll(&mut engine), PollOutcome::Retrying);
        assert_eq!(side_files(temp_dir.path()), vec![name(&before)]);

        // Modification time was not recorded, so the next tick tries again
        assert!(matches!(watcher.poll(&mut engine), PollOutcome::Reloaded(_)));
        assert_eq!(side_files(temp_dir.path()).len(), 1);
    }

    #[test]
    fn test_engine_rejection_keeps_previous_generation() {
        let (temp_dir, source, mut watcher) = setup(ROOTLESS);
        let mut engine = RecordingEngine {
            reject_text: Some("BROKEN"),
            ..RecordingEngine::default()
        };
        let before = watcher.state().current().unwrap().to_path_buf();

        edit(&source, "import QtQuick
Rectangle { widht: BROKEN }", 1);
        assert_eq!(watcher.poll(&mut engine), PollOutcome::Rejected);
        assert_eq!(watcher.state().current(), Some(before.as_path()));
        assert_eq!(side_files(temp_dir.path()), vec![name(&before)]);
        assert_eq!(watcher.state().consecutive_failures(), 0);

        // Not retried until the next edit
        assert_eq!(watcher.poll(&mut engine), PollOutcome::Unchanged);
        assert_eq!(engine.exit_code().unwrap(), None);

        edit(&source, "import QtQuick
Rectangle { width: 20 }", 2);
        assert!(matches!(watcher.poll(&mut engine), PollOutcome::Reloaded(_)));
        assert!(!before.exists());
    }

    #[test]
    fn test_reload_carries_facts_of_new_generation() {
        let (_temp_dir, source, mut watcher) = setup(ROOTLESS);
        let mut engine = RecordingEngine::new();

        edit(
            &source,
            "import QtQuick
import QtQuick.Controls.Material
import QtCharts
Item {}",
            1,
        );
        assert!(matches!(watcher.poll(&mut engine), PollOutcome::Reloaded(_)));
        assert_eq!(engine.reloaded_facts[0].style_name, Some("Material"));
        assert!(engine.reloaded_facts[0].uses_chart_module);
    }

    #[test]
    fn test_side_file_write_failure_is_retried() {
        let (temp_dir, source, mut watcher) = setup(ROOTLESS);
        let mut engine = RecordingEngine::new();
        let before = watcher.state().current().unwrap().to_path_buf();
        let working_dir = watcher.state.working_dir.clone();

        watcher.state.working_dir = temp_dir.path().join("missing-dir");
        edit(&source, "import QtQuick
Item {}", 1);
        for expected in 1..=2 {
            assert_eq!(watcher.poll(&mut engine), PollOutcome::Retrying);
            assert_eq!(watcher.state().consecutive_failures(), expected);
        }
        assert_eq!(watcher.state().current(), Some(before.as_path()));
        assert!(before.exists());
        assert!(engine.reloads.is_empty());

        watcher.state.working_dir = working_dir;
        assert!(matches!(watcher.poll(&mut engine), PollOutcome::Reloaded(_)));
        assert_eq!(watcher.state().consecutive_failures(), 0);
        assert_eq!(side_files(temp_dir.path()).len(), 1);
    }

    #[test]
    fn test_warning_fires_once_at_threshold() {
        let (_temp_dir, source, mut watcher) = setup(ROOTLESS);
        let mut engine = RecordingEngine::new();
        assert_eq!(watcher.options().max_consecutive_failures, 3);

        fs::remove_file(&source).unwrap();
        for (poll, expected) in [(1, 0), (2, 0), (3, 1), (4, 1), (5, 1), (6, 1)] {
            assert_eq!(watcher.poll(&mut engine), PollOutcome::Retrying);
            assert_eq!(watcher.state().escalations(), expected, "after poll {poll}");
        }

        edit(&source, ROOTLESS, 1);
        assert!(matches!(watcher.poll(&mut engine), PollOutcome::Reloaded(_)));

        // A fresh run of failures escalates again
        fs::remove_file(&source).unwrap();
        for _ in 0..3 {
            watcher.poll(&mut engine);
        }
        assert_eq!(watcher.state().escalations(), 2);
    }

    #[test]
    fn test_source_named_like_side_file_is_never_swept() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("Live1_deadbeef.qml");
        fs::write(&source, ROOTLESS).unwrap();

        let mut watcher = ReloadWatcher::start(&source, WatchOptions::default()).unwrap();
        assert!(source.exists());

        let generation = watcher.generate().unwrap();
        watcher.commit(generation);
        watcher.stop();
        assert!(source.exists());
        assert_eq!(side_files(temp_dir.path()), vec!["Live1_deadbeef.qml".to_string()]);
    }

    #[test]
    fn test_rooted_source_is_copied_verbatim() {
        let text = "import QtQuick\nWindow { visible: true }";
        let (_temp_dir, _source, watcher) = setup(text);
        let current = watcher.state().current().unwrap();
        assert_eq!(fs::read_to_string(current).unwrap(), text);
    }

    #[test]
    fn test_close_removes_all_side_files() {
        let (temp_dir, source, mut watcher) = setup(ROOTLESS);
        let mut engine = RecordingEngine::new();
        edit(&source, "import QtQuick\nItem {}", 1);
        watcher.poll(&mut engine);
        fs::write(temp_dir.path().join("Live77_abcdef01.qml"), "lost track").unwrap();

        watcher.close();
        assert!(watcher.state().is_closed());
        assert!(side_files(temp_dir.path()).is_empty());
        assert!(source.exists());

        // Closed watchers ignore further changes
        edit(&source, ROOTLESS, 2);
        assert_eq!(watcher.poll(&mut engine), PollOutcome::Unchanged);
        assert!(side_files(temp_dir.path()).is_empty());
    }

    #[test]
    fn test_drop_cleans_up() {
        let (temp_dir, _source, watcher) = setup(ROOTLESS);
        assert_eq!(side_files(temp_dir.path()).len(), 1);
        drop(watcher);
        assert!(side_files(temp_dir.path()).is_empty());
    }

    #[test]
    fn test_phone_layout_frames_side_files() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("main.qml");
        fs::write(&source, ROOTLESS).unwrap();
        let options = WatchOptions {
            layout: Layout::Phone,
            ..WatchOptions::default()
        };
        let mut watcher = ReloadWatcher::start(&source, options).unwrap();
        let generation = watcher.generate().unwrap();
        let text = fs::read_to_string(&generation.path).unwrap();
        assert!(text.contains("id: qmlviewDevice"));
        watcher.commit(generation);
        watcher.stop();
        assert!(side_files(temp_dir.path()).is_empty());
    }
}
