//! Orchestration: decide how to load the source, load it, and keep it live
//!
//! Everything here runs against an explicit `AppContext` built once at startup;
//! there is no process-wide state.

use std::path::{Path, PathBuf};

use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::cli::{Cli, Operation};
use crate::config::{friendly_io_error_message, Config};
use crate::document::{scan, SourceDocument, StructuralFacts};
use crate::engine::{ensure_instantiated, EngineOptions, RenderEngine, RootObject};
use crate::error::QmlError;
use crate::live::ReloadWatcher;
use crate::wrap::{decide_and_wrap, Layout, Loadable};

/// Startup context threaded through every component
#[derive(Debug, Clone)]
pub struct AppContext {
    pub config: Config,
    pub source: PathBuf,
    pub operation: Operation,
    pub backend: Option<crate::engine::SceneBackend>,
}

impl AppContext {
    pub fn new(cli: &Cli, mut config: Config) -> Self {
        if let Some(engine) = &cli.engine {
            config.engine_command = engine.clone();
        }
        config.engine_command = shellexpand::tilde(&config.engine_command).into_owned();
        Self {
            config,
            source: expand_user_path(&cli.source),
            operation: cli.operation(),
            backend: cli.backend.map(Into::into),
        }
    }

    /// How to launch the engine for a document with these facts
    pub fn engine_options(&self, facts: &StructuralFacts) -> EngineOptions {
        EngineOptions {
            command: self.config.engine_command.clone(),
            style: facts.style_name.map(str::to_string),
            widget_app: facts.uses_chart_module,
            backend: self.backend,
            settle: self.config.reload_settle(),
        }
    }
}

/// Expand a leading `~` the invoking shell left in place
pub fn expand_user_path(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(&path_str).into_owned())
}

/// Read and scan the source before the engine is created
pub fn inspect(ctx: &AppContext) -> Result<StructuralFacts, QmlError> {
    let doc = SourceDocument::read(&ctx.source)?;
    let facts = scan(&doc);
    info!(
        source = %doc.path().display(),
        usable_root = facts.has_usable_root,
        style = ?facts.style_name,
        charts = facts.uses_chart_module,
        "Scanned source"
    );
    Ok(facts)
}

/// Run the requested operation until the engine exits or the process is interrupted
///
/// Returns the exit code to report.
pub async fn run<E: RenderEngine>(ctx: &AppContext, engine: &mut E) -> Result<i32, QmlError> {
    match ctx.operation {
        Operation::Preview(layout) => {
            preview(ctx, engine, layout)?;
            wait_for_exit(ctx, engine, None).await
        }
        Operation::Live(layout) => {
            let mut watcher = start_live(ctx, engine, layout)?;
            let code = wait_for_exit(ctx, engine, Some(&mut watcher)).await;
            watcher.stop();
            code
        }
    }
}

/// Load the source once, wrapping it when needed
pub fn preview<E: RenderEngine>(
    ctx: &AppContext,
    engine: &mut E,
    layout: Layout,
) -> Result<Vec<RootObject>, QmlError> {
    let doc = SourceDocument::read(&ctx.source)?;
    let facts = scan(&doc);
    let loadable = decide_and_wrap(doc, &facts, layout, &ctx.config.wrap_options())?;

    let locator = loadable.locator();
    let objects = match &loadable {
        Loadable::Source(_) => engine.load(&locator)?,
        Loadable::Generated(generated) => engine.load_data(&generated.text, &locator)?,
    };
    ensure_instantiated(objects, &locator)
}

/// Start watching and load the first generation
///
/// Failures here are fatal; the watcher's cleanup still runs because it is
/// dropped on the error path.
pub fn start_live<E: RenderEngine>(
    ctx: &AppContext,
    engine: &mut E,
    layout: Layout,
) -> Result<ReloadWatcher, QmlError> {
    let mut watcher = ReloadWatcher::start(&ctx.source, ctx.config.watch_options(layout))?;
    let generation = watcher.generate()?;

    let locator = generation.locator();
    let objects = engine.load(&locator)?;
    ensure_instantiated(objects, &locator)?;

    watcher.commit(generation);
    Ok(watcher)
}

async fn wait_for_exit<E: RenderEngine>(
    ctx: &AppContext,
    engine: &mut E,
    mut watcher: Option<&mut ReloadWatcher>,
) -> Result<i32, QmlError> {
    let mut ticker = tokio::time::interval(ctx.config.poll_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Some(watcher) = watcher.as_deref_mut() {
                    watcher.poll(engine);
                }
                if let Some(code) = engine.exit_code()? {
                    info!(code, "Engine exited");
                    return Ok(code);
                }
            }
            _ = &mut shutdown => {
                info!("Interrupted, shutting down");
                return Ok(0);
            }
        }
    }
}

/// User-facing description of a fatal error
pub fn describe(err: &QmlError) -> String {
    match err {
        QmlError::SourceNotFound { path } => format!(
            "qmlview error: File Not Found [{}]\nPlease write the file path in full, or run qmlview --help",
            path.display()
        ),
        QmlError::SideFileIo { path, source } => friendly_io_error_message(
            source,
            &format!("qmlview error: cannot write {}", path.display()),
        ),
        QmlError::Io(source) => friendly_io_error_message(source, "qmlview error"),
        other => format!("qmlview error: {}", other),
    }
}

/// Log and describe a fatal error, returning its exit code
pub fn report(err: &QmlError) -> i32 {
    error!("{}", err);
    eprintln!("{}", describe(err));
    err.exit_code()
}
