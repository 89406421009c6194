use clap::Parser;
use screenwatch_viewer::{Cli, run};

#[tokio::main]
async fn main() {
    if let Err(e) = run(Cli::parse()).await {
        eprintln!("{e}");
        std::process::exit(e.exit_code());
    }
}
