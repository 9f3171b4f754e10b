//! Command-line arguments

use std::path::PathBuf;

use clap::error::ErrorKind;
use clap::{Parser, ValueEnum};

use crate::engine::{runtime_version, SceneBackend};
use crate::error::EXIT_INVALID_PARAMETER;
use crate::wrap::Layout;

#[derive(Debug, Parser)]
#[command(
    name = "qmlview",
    version,
    about = "Preview a QML file standalone, in a phone frame, or with live reload",
    after_help = "Examples:\n    qmlview ~/ui/main.qml\n    qmlview ~/ui/Card.qml --phone --live"
)]
pub struct Cli {
    /// The .qml file to run
    #[arg(value_name = "SOURCE")]
    pub source: PathBuf,

    /// Run the source inside a phone frame
    #[arg(short, long)]
    pub phone: bool,

    /// Reload automatically whenever the source changes
    #[arg(short, long)]
    pub live: bool,

    /// Scene graph backend for the runtime
    #[arg(long, value_enum, value_name = "BACKEND")]
    pub backend: Option<BackendArg>,

    /// QML runtime executable (overrides the config file)
    #[arg(long, value_name = "CMD")]
    pub engine: Option<String>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendArg {
    Software,
    Openvg,
    Rhi,
    Gtk,
}

impl From<BackendArg> for SceneBackend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Software => SceneBackend::Software,
            BackendArg::Openvg => SceneBackend::OpenVg,
            BackendArg::Rhi => SceneBackend::Rhi,
            BackendArg::Gtk => SceneBackend::Gtk,
        }
    }
}

/// What the previewer has been asked to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Load once and show until the window closes
    Preview(Layout),
    /// Regenerate and reload on every change
    Live(Layout),
}

impl Operation {
    pub fn layout(&self) -> Layout {
        match self {
            Operation::Preview(layout) | Operation::Live(layout) => *layout,
        }
    }
}

impl Cli {
    pub fn operation(&self) -> Operation {
        let layout = if self.phone {
            Layout::Phone
        } else {
            Layout::Plain
        };
        if self.live {
            Operation::Live(layout)
        } else {
            Operation::Preview(layout)
        }
    }
}

/// Exit code for a command line clap refused to parse
///
/// Help and version requests succeed; everything else is an invalid parameter.
pub fn usage_exit_code(err: &clap::Error) -> i32 {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
        _ => EXIT_INVALID_PARAMETER,
    }
}

/// Line reporting which QML runtime `command` resolves to
pub fn runtime_version_line(command: &str) -> String {
    match runtime_version(command) {
        Some(version) => format!("runtime: {}", version),
        None => format!("runtime: {} (not found)", command),
    }
}
