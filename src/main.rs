use clap::Parser;
use std::process::ExitCode;
use tangible_reminder::presentation::cli::{self, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    cli::run(Cli::parse()).await
}
