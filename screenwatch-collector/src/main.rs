use clap::Parser;
use screenwatch_collector::{Cli, run};

#[tokio::main]
async fn main() -> Result<(), screenwatch_collector::AppError> {
    run(Cli::parse()).await
}
