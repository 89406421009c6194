use std::path::{Path, PathBuf};

use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

pub mod app;
pub mod cli;
pub mod config;
pub mod identity;
pub mod usage;

pub use app::agent::{Collector, CycleOutcome};
pub use cli::{Cli, Command};
pub use config::{CollectorConfig, load_config, resolve_config_path};

const LOG_FILE_PREFIX: &str = "collector.log";

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no child identity configured at {path}: {reason}")]
    NoIdentityConfigured { path: String, reason: String },
    #[error("usage source error: {0}")]
    Usage(String),
}

/// Console logging, or daily log files when `log_dir` is set. Keep the
/// returned guard alive so buffered file output gets flushed.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false)
                .compact()
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .compact()
                .init();
            None
        }
    }
}

pub async fn run(cli: Cli) -> Result<(), AppError> {
    if let Some(Command::InitConfig { force }) = &cli.command {
        return init_config(cli.config.clone(), *force);
    }

    let (cfg_path, cfg) = CollectorConfig::find_and_load(cli.config)?;
    let _guard = init_tracing(cfg.log_dir.as_deref());
    info!(path=?cfg_path, "loaded config");

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => app::agent::run(cfg).await,
        Command::Once => {
            let collector = Collector::from_config(&cfg)?;
            let outcome = collector.run_cycle().await;
            info!(?outcome, "single cycle finished");
            Ok(())
        }
        Command::ShowIdentity => {
            let path = cfg.identity_path()?;
            match identity::load_identity(&path) {
                Ok(id) => println!("{} (family key {})", id.child_email, id.family_key),
                Err(e) => println!("{e}"),
            }
            Ok(())
        }
        Command::InitConfig { .. } => Ok(()),
    }
}

fn init_config(path: Option<PathBuf>, force: bool) -> Result<(), AppError> {
    let path = resolve_config_path(path)?;
    if path.exists() && !force {
        return Err(AppError::Config(format!(
            "{} already exists; pass --force to overwrite",
            path.display()
        )));
    }
    config::save_config(&path, &CollectorConfig::default())?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}
