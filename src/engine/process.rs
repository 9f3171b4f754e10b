//! Engine backed by Qt's external `qml` runtime

use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::{RenderEngine, RootObject};
use crate::document::{Locator, StructuralFacts};
use crate::error::QmlError;

/// Default time a new runtime must stay up to count as loaded
pub const DEFAULT_SETTLE: Duration = Duration::from_millis(400);

const SETTLE_STEP: Duration = Duration::from_millis(20);

/// Scene graph backend requested on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneBackend {
    Software,
    OpenVg,
    Rhi,
    Gtk,
}

impl SceneBackend {
    /// Value for `QT_QUICK_BACKEND`
    pub fn as_env_value(&self) -> &'static str {
        match self {
            SceneBackend::Software => "software",
            SceneBackend::OpenVg => "openvg",
            SceneBackend::Rhi => "rhi",
            SceneBackend::Gtk => "gtk",
        }
    }
}

/// How the runtime process is launched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// Runtime executable
    pub command: String,
    /// Value for `QT_QUICK_CONTROLS_STYLE`
    pub style: Option<String>,
    /// Start a widget application (needed by the charts module)
    pub widget_app: bool,
    pub backend: Option<SceneBackend>,
    /// A runtime that fails within this window did not load its document
    pub settle: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            command: "qml".to_string(),
            style: None,
            widget_app: false,
            backend: None,
            settle: DEFAULT_SETTLE,
        }
    }
}

impl EngineOptions {
    /// Adopt the per-document launch settings for `facts`
    pub fn follow(&mut self, facts: &StructuralFacts) {
        self.style = facts.style_name.map(str::to_string);
        self.widget_app = facts.uses_chart_module;
    }
}

/// Runs each loaded document in a child `qml` process
///
/// The runtime has no reload channel, so a reload starts a second process on
/// the new file. The running one is only stopped once the new one has survived
/// the settle window; a document the runtime rejects leaves the previous window
/// in place. In-memory documents are staged as hidden files next to the source
/// so relative imports still resolve.
pub struct ProcessEngine {
    options: EngineOptions,
    child: Option<Child>,
    staged: Option<PathBuf>,
}

impl ProcessEngine {
    pub fn new(options: EngineOptions) -> Self {
        Self {
            options,
            child: None,
            staged: None,
        }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    fn command_for(&self, file: &Path) -> Command {
        let mut cmd = Command::new(&self.options.command);
        if self.options.widget_app {
            cmd.args(["--apptype", "widget"]);
        }
        cmd.arg(file);
        if let Some(style) = &self.options.style {
            cmd.env("QT_QUICK_CONTROLS_STYLE", style);
        }
        if let Some(backend) = self.options.backend {
            cmd.env("QT_QUICK_BACKEND", backend.as_env_value());
        }
        if let Some(dir) = file.parent() {
            cmd.current_dir(dir);
        }
        cmd.stdin(Stdio::null());
        cmd
    }

    /// Start the runtime on `file` and wait out the settle window
    ///
    /// Returns `None` when the runtime exits with a failure status inside the
    /// window.
    fn launch(&self, file: &Path) -> io::Result<Option<Child>> {
        let mut child = self.command_for(file).spawn()?;
        info!(pid = child.id(), file = %file.display(), "Started {}", self.options.command);

        let deadline = Instant::now() + self.options.settle;
        loop {
            if let Some(status) = child.try_wait()? {
                if status.success() {
                    return Ok(Some(child));
                }
                warn!(?status, file = %file.display(), "Runtime exited during load");
                return Ok(None);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(Some(child));
            }
            std::thread::sleep((deadline - now).min(SETTLE_STEP));
        }
    }

    fn start(&mut self, file: &Path) -> io::Result<Vec<RootObject>> {
        match self.launch(file)? {
            Some(child) => {
                let id = child.id();
                self.child = Some(child);
                Ok(vec![RootObject { id }])
            }
            None => Ok(Vec::new()),
        }
    }

    fn stop(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Ok(None) = child.try_wait() {
                debug!(pid = child.id(), "Stopping runtime");
                if let Err(e) = child.kill() {
                    warn!("Failed to stop runtime {}: {}", child.id(), e);
                }
            }
            let _ = child.wait();
        }
    }

    fn remove_staged(&mut self) {
        if let Some(path) = self.staged.take() {
            if let Err(e) = std::fs::remove_file(&path) {
                if e.kind() != io::ErrorKind::NotFound {
                    warn!("Failed to remove staged document {}: {}", path.display(), e);
                }
            }
        }
    }
}

impl RenderEngine for ProcessEngine {
    fn load(&mut self, locator: &Locator) -> io::Result<Vec<RootObject>> {
        self.stop();
        self.remove_staged();
        self.start(locator.path())
    }

    fn load_data(&mut self, text: &str, base: &Locator) -> io::Result<Vec<RootObject>> {
        self.stop();
        self.remove_staged();
        let staged = base
            .base_dir()
            .join(format!(".qmlview-{}.qml", uuid::Uuid::new_v4().simple()));
        std::fs::write(&staged, text)?;
        self.staged = Some(staged.clone());
        self.start(&staged)
    }

    fn reload(&mut self, locator: &Locator, facts: &StructuralFacts) -> Result<(), QmlError> {
        self.options.follow(facts);

        let Some(child) = self.launch(locator.path())? else {
            return Err(QmlError::EngineLoadFailed {
                locator: locator.to_url(),
            });
        };

        self.stop();
        self.remove_staged();
        info!(pid = child.id(), "Runtime replaced");
        self.child = Some(child);
        Ok(())
    }

    /// `Some(0)` before anything was loaded
    fn exit_code(&mut self) -> io::Result<Option<i32>> {
        match self.child.as_mut() {
            None => Ok(Some(0)),
            Some(child) => Ok(child.try_wait()?.map(|status| status.code().unwrap_or(1))),
        }
    }
}

impl Drop for ProcessEngine {
    fn drop(&mut self) {
        self.stop();
        self.remove_staged();
    }
}

/// First line the runtime prints for `--version`
pub fn runtime_version(command: &str) -> Option<String> {
    let output = Command::new(command)
        .arg("--version")
        .stdin(Stdio::null())
        .output()
        .ok()?;
    let text = if output.stdout.is_empty() {
        output.stderr
    } else {
        output.stdout
    };
    String::from_utf8_lossy(&text)
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}
