use anyhow::Result;
use clap::error::ErrorKind;
use clap::Parser;

use qmlview::app::{self, AppContext};
use qmlview::cli::{self, Cli};
use qmlview::config::{self, Config};
use qmlview::engine::ProcessEngine;
use qmlview::logging;

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = cli::usage_exit_code(&e);
            let _ = e.print();
            if e.kind() == ErrorKind::DisplayVersion {
                let command = Config::load().unwrap_or_default().engine_command;
                println!("{}", cli::runtime_version_line(&shellexpand::tilde(&command)));
            }
            std::process::exit(code);
        }
    };

    let code = match launch(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("qmlview error: {:#}", e);
            1
        }
    };

    // Locals in `launch` are dropped by now: engine stopped, logs flushed
    std::process::exit(code);
}

async fn launch(cli: Cli) -> Result<i32> {
    // Ensure config directory exists (creates logs dir too)
    config::ensure_directories()?;

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("qmlview: ignoring config file: {:#}", e);
            Config::default()
        }
    };

    // Initialize file logging BEFORE any tracing calls
    let (log_file_info, _guard) = logging::init_file_logging(config::logs_dir(), cli.verbose)?;

    if let Ok(count) =
        logging::cleanup_old_logs_with_retention(&config::logs_dir(), config.log_retention_days)
    {
        if count > 0 {
            tracing::info!("Cleaned up {} old log files", count);
        }
    }

    tracing::info!("Logging to: {}", log_file_info.path.display());

    let ctx = AppContext::new(&cli, config);
    let facts = match app::inspect(&ctx) {
        Ok(facts) => facts,
        Err(e) => return Ok(app::report(&e)),
    };

    let mut engine = ProcessEngine::new(ctx.engine_options(&facts));
    let code = match app::run(&ctx, &mut engine).await {
        Ok(code) => code,
        Err(e) => app::report(&e),
    };

    tracing::info!(code, "qmlview exiting");
    Ok(code)
}
