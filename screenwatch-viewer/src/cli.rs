use std::path::PathBuf;

use clap::{Parser, Subcommand};

const HELP_EPILOG: &str = r#"Viewer options can also be provided via environment variables:
  SCREENWATCH_VIEWER_CONFIG (default: platform config dir, viewer.yaml)
  SCREENWATCH_STORE         (default: platform data dir, screenwatch.json)

Passwords are prompted for when not given on the command line.
"#;

#[derive(Debug, Parser)]
#[command(
    name = "screenwatch-viewer",
    version,
    about = "ScreenWatch parent and child console",
    long_about = None,
    after_long_help = HELP_EPILOG,
)]
pub struct Cli {
    /// Path to YAML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log in as a parent, registering on first use; prints the family key
    Parent {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: Option<String>,
    },
    /// Log in as a child (registering on first use) and hand the identity to the collector
    Child {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: Option<String>,
        /// Family key received from the parent
        #[arg(long)]
        family_key: String,
    },
    /// Show the latest usage of every child in the parent's family
    Usage {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: Option<String>,
        /// Print raw JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Print the liveness of one child
    Status {
        #[arg(long)]
        child: String,
    },
}
