use std::path::PathBuf;

use clap::{Parser, Subcommand};

const HELP_EPILOG: &str = r#"Config resolution order:
  1) --config/-c PATH
  2) $SCREENWATCH_CONFIG
  3) platform default, e.g. ~/.config/screenwatch/collector.yaml
     (built-in defaults when that file does not exist)

$SCREENWATCH_STORE overrides the store location when the config leaves it unset.
"#;

#[derive(Debug, Parser)]
#[command(
    name = "screenwatch-collector",
    version,
    about = "Background usage collector for ScreenWatch",
    long_about = None,
    after_long_help = HELP_EPILOG,
)]
pub struct Cli {
    /// Path to YAML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Optional subcommand. Without one, runs the collector loop.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Report every interval until SIGINT/SIGTERM (default)
    Run,
    /// Run a single collection cycle and exit
    Once,
    /// Print the child identity the collector reports for
    ShowIdentity,
    /// Write a config file with default values
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
